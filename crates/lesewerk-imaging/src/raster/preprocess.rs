// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessor: reduces a decoded image to a single luminance channel for
// preview and recognition, optionally followed by scan enhancement.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::Settings;
use tracing::{debug, info, instrument};

use crate::raster::loader::RawImage;
use crate::scan::enhance::ScanEnhancer;

/// Single-channel 8-bit raster used both as preview and as engine input.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedImage {
    image: GrayImage,
}

impl PreprocessedImage {
    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Always 1.
    pub fn channels(&self) -> u8 {
        1
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    /// Row-major luminance bytes, one per pixel.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Encode as PNG, the interchange format handed to the engine and to
    /// preview consumers.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|err| LesewerkError::Engine(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

/// Converts raw images into [`PreprocessedImage`]s.
///
/// With `apply_enhancements` off (the default) the output is the plain
/// luminance of the input. With it on, the run's `denoise`, `deskew` and
/// `threshold_method` settings are applied afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor {
    apply_enhancements: bool,
}

impl Preprocessor {
    pub fn new(apply_enhancements: bool) -> Self {
        Self { apply_enhancements }
    }

    /// Consume the raw image and produce the single-channel raster. The raw
    /// buffer is dropped before any enhancement work starts.
    #[instrument(skip_all, fields(width = raw.width(), height = raw.height(), channels = raw.channels()))]
    pub fn process(&self, raw: RawImage, settings: &Settings) -> PreprocessedImage {
        let gray = to_single_channel(raw);
        info!(width = gray.width(), height = gray.height(), "Grayscale image ready");

        if !self.apply_enhancements {
            return PreprocessedImage::from_gray(gray);
        }

        let mut enhancer = ScanEnhancer::from_gray(gray);
        if settings.denoise {
            enhancer = enhancer.denoise();
        }
        if settings.deskew {
            enhancer = enhancer.deskew();
        }
        let enhanced = enhancer.threshold(settings.threshold_method);
        debug!(method = ?settings.threshold_method, "Scan enhancement applied");

        PreprocessedImage::from_gray(enhanced.into_gray())
    }
}

/// Reduce to one 8-bit luminance channel. An 8-bit grayscale input is moved
/// through untouched, so its bytes are preserved exactly.
pub fn to_single_channel(raw: RawImage) -> GrayImage {
    match raw.into_dynamic() {
        DynamicImage::ImageLuma8(gray) => gray,
        other => {
            let gray = other.to_luma8();
            drop(other);
            gray
        }
    }
}
