// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement: denoising, skew correction, and binarization.

pub mod enhance;

pub use enhance::ScanEnhancer;
