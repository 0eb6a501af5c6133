// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image loader with a memory guard.
//
// The header is read first so the sample count (width x height x channels)
// can be checked against the configured bound before any pixel data is
// decoded.

use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

use image::{DynamicImage, ImageDecoder, ImageReader};
use lesewerk_core::config::DEFAULT_MAX_SAMPLES;
use lesewerk_core::error::{LesewerkError, Result};
use tracing::{debug, info, instrument, warn};

/// A decoded image, exclusively owned by the run that loaded it.
pub struct RawImage {
    image: DynamicImage,
}

impl RawImage {
    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of interleaved channels per pixel.
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Total number of samples held by the buffer.
    pub fn samples(&self) -> u64 {
        sample_count(self.width(), self.height(), self.channels())
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }
}

/// Decodes images from disk or memory, refusing anything whose sample count
/// reaches `max_samples`.
#[derive(Debug, Clone, Copy)]
pub struct ImageLoader {
    max_samples: u64,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

impl ImageLoader {
    pub fn new(max_samples: u64) -> Self {
        Self { max_samples }
    }

    pub fn max_samples(&self) -> u64 {
        self.max_samples
    }

    /// Load an image from a file path (PNG, JPEG, BMP, TIFF, ...).
    ///
    /// # Errors
    ///
    /// [`LesewerkError::Load`] if the file is missing, unreadable or not a
    /// decodable image; [`LesewerkError::ResourceLimit`] if the header
    /// announces more samples than allowed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(&self, path: impl AsRef<Path>) -> Result<RawImage> {
        let path = path.as_ref();
        let reader = ImageReader::open(path).map_err(|err| {
            LesewerkError::Load(format!("failed to open {}: {}", path.display(), err))
        })?;
        let image = self.decode(reader).map_err(|err| match err {
            LesewerkError::Load(detail) => {
                LesewerkError::Load(format!("{}: {}", path.display(), detail))
            }
            other => other,
        })?;
        info!(
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            "Image loaded"
        );
        Ok(image)
    }

    /// Load an image from encoded bytes.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn load_bytes(&self, data: &[u8]) -> Result<RawImage> {
        let image = self.decode(ImageReader::new(Cursor::new(data)))?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded from bytes"
        );
        Ok(image)
    }

    /// Enforce the sample bound for an image of the given geometry.
    pub fn check_bounds(&self, width: u32, height: u32, channels: u8) -> Result<()> {
        let samples = sample_count(width, height, channels);
        if samples >= self.max_samples {
            warn!(samples, limit = self.max_samples, "Image exceeds sample limit");
            return Err(LesewerkError::ResourceLimit {
                samples,
                limit: self.max_samples,
            });
        }
        Ok(())
    }

    fn decode<R: BufRead + Seek>(&self, reader: ImageReader<R>) -> Result<RawImage> {
        let reader = reader
            .with_guessed_format()
            .map_err(|err| LesewerkError::Load(format!("failed to read header: {err}")))?;
        let decoder = reader
            .into_decoder()
            .map_err(|err| LesewerkError::Load(format!("unrecognised image data: {err}")))?;

        let (width, height) = decoder.dimensions();
        let channels = decoder.color_type().channel_count();
        self.check_bounds(width, height, channels)?;

        if width == 0 || height == 0 {
            return Err(LesewerkError::Load(format!(
                "image has no pixels ({width}x{height})"
            )));
        }

        let image = DynamicImage::from_decoder(decoder)
            .map_err(|err| LesewerkError::Load(format!("failed to decode image: {err}")))?;
        Ok(RawImage { image })
    }
}

fn sample_count(width: u32, height: u32, channels: u8) -> u64 {
    (width as u64)
        .saturating_mul(height as u64)
        .saturating_mul(channels as u64)
}
