// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-pipeline: runs the load → preprocess → recognise → aggregate →
// correct sequence on a worker and reports it as a stream of events.

pub mod diagnostics;
pub mod lexicon;
pub mod logging;
pub mod postprocess;
pub mod runner;

pub use diagnostics::{DiagnosticEntry, DiagnosticLevel, DiagnosticLog};
pub use lexicon::{Lexicon, WordListLexicon};
pub use logging::init_logging;
pub use postprocess::{SpellCorrector, post_process};
pub use runner::{PipelineEvent, PipelineRunner, PipelineState, RunHandle};
