// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-engine: Recognition for the Lesewerk OCR pipeline.
//
// Translates run settings into an engine configuration descriptor, drives an
// external OCR engine (Tesseract via its command-line interface) for both
// plain text and per-token confidence data, and reduces token confidences
// to a single score.

pub mod confidence;
pub mod config;
pub mod engine;
pub mod tesseract;
pub mod tsv;

pub use confidence::{aggregate, aggregate_entries};
pub use config::EngineConfig;
pub use engine::{EngineInvoker, OcrEngine, Recognition};
pub use tesseract::TesseractEngine;
pub use tsv::{TokenConfidence, TokenEntry, TokenTable};
