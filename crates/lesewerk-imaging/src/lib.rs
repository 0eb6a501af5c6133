// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-imaging: Image preparation for the Lesewerk OCR pipeline.
//
// Provides bounded image loading (the size guard runs before pixel data is
// decoded), single-channel preprocessing, and optional scan enhancement
// (denoising, deskewing, adaptive or Otsu binarization).

pub mod raster;
pub mod scan;

pub use raster::loader::{ImageLoader, RawImage};
pub use raster::preprocess::{PreprocessedImage, Preprocessor};
pub use scan::enhance::ScanEnhancer;
