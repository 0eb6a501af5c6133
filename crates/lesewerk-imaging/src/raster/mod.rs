// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module: bounded decoding and grayscale normalisation.

pub mod loader;
pub mod preprocess;

pub use loader::{ImageLoader, RawImage};
pub use preprocess::{PreprocessedImage, Preprocessor};
