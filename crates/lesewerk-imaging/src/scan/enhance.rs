// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement: median-filter denoising, Hough-based skew correction,
// and adaptive or Otsu binarization of grayscale rasters.

use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use lesewerk_core::types::ThresholdMethod;
use tracing::{debug, info, instrument, warn};

/// Largest skew (degrees) the deskew step will try to correct.
const MAX_SKEW_DEGREES: i32 = 15;

/// Skews below this are left alone; rotating costs sharpness.
const MIN_CORRECTION_DEGREES: f32 = 0.5;

/// Default adaptive threshold neighbourhood radius and offset.
const ADAPTIVE_BLOCK_RADIUS: u32 = 15;
const ADAPTIVE_OFFSET: i32 = 10;

/// Enhances grayscale rasters ahead of recognition.
///
/// Each method consumes `self` and returns the transformed enhancer, so
/// steps chain:
///
/// ```ignore
/// let clean = ScanEnhancer::from_gray(gray)
///     .denoise()
///     .deskew()
///     .threshold(ThresholdMethod::Otsu)
///     .into_gray();
/// ```
pub struct ScanEnhancer {
    image: GrayImage,
}

impl ScanEnhancer {
    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    // -- Denoising ------------------------------------------------------------

    /// Remove salt-and-pepper noise with a 3x3 median filter.
    #[instrument(skip(self))]
    pub fn denoise(self) -> Self {
        info!("Applying median denoise");
        Self {
            image: median_filter(&self.image, 1, 1),
        }
    }

    // -- Skew correction ------------------------------------------------------

    /// Rotate the page so detected text baselines run horizontally.
    ///
    /// Returns the image unchanged when no dominant near-horizontal lines are
    /// found or the estimated skew is negligible.
    #[instrument(skip(self))]
    pub fn deskew(self) -> Self {
        let Some(skew) = estimate_skew(&self.image) else {
            warn!("No baseline detected; skipping deskew");
            return self;
        };

        if skew.abs() < MIN_CORRECTION_DEGREES {
            debug!(skew, "Skew negligible; leaving image unrotated");
            return self;
        }

        info!(skew, "Correcting skew");
        let rotated = rotate_about_center(
            &self.image,
            (-skew).to_radians(),
            Interpolation::Bilinear,
            Luma([255u8]),
        );
        Self { image: rotated }
    }

    // -- Binarization ---------------------------------------------------------

    /// Binarize with the given method using default parameters.
    pub fn threshold(self, method: ThresholdMethod) -> Self {
        match method {
            ThresholdMethod::Adaptive => self.binarize(ADAPTIVE_BLOCK_RADIUS, ADAPTIVE_OFFSET),
            ThresholdMethod::Otsu => self.binarize_otsu(),
        }
    }

    /// Apply adaptive thresholding.
    ///
    /// For each pixel the threshold is the mean intensity within a
    /// `block_radius` neighbourhood, minus a constant `c`. Pixels darker than
    /// the local threshold become black; others become white.
    #[instrument(skip(self))]
    pub fn binarize(self, block_radius: u32, c: i32) -> Self {
        info!(block_radius, c, "Applying adaptive binarization");

        let gray = &self.image;
        let (width, height) = gray.dimensions();
        let integral = compute_integral_image(gray);

        let output = GrayImage::from_fn(width, height, |x, y| {
            let local_mean = region_mean(&integral, width, height, x, y, block_radius);
            let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
            let value = gray.get_pixel(x, y).0[0];
            Luma([if value < threshold { 0u8 } else { 255u8 }])
        });

        debug!("Adaptive binarization complete");
        Self { image: output }
    }

    /// Global binarization with the threshold chosen by Otsu's method.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let threshold = otsu_threshold(&self.image);
        info!(threshold, "Applying Otsu binarization");

        let gray = &self.image;
        let output = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let value = gray.get_pixel(x, y).0[0];
            Luma([if value <= threshold { 0u8 } else { 255u8 }])
        });

        Self { image: output }
    }
}

// -- Skew estimation ----------------------------------------------------------

/// Estimate page skew in degrees from near-horizontal Hough lines.
///
/// imageproc reports a horizontal line as `angle_in_degrees == 90`, so the
/// skew of a line is its angle minus 90. The median over all candidate lines
/// is returned; `None` if there are no candidates.
fn estimate_skew(gray: &GrayImage) -> Option<f32> {
    let (width, height) = gray.dimensions();
    if width < 8 || height < 8 {
        return None;
    }

    let edges = canny(gray, 50.0, 150.0);
    let vote_threshold = ((width as f64) * 0.3).max(40.0) as u32;
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold,
            suppression_radius: 8,
        },
    );
    debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");

    let mut skews = baseline_skews(&lines);
    if skews.is_empty() {
        return None;
    }
    skews.sort_unstable();
    let median = skews[skews.len() / 2];
    Some(median as f32)
}

/// Signed deviation from horizontal for every line within the correctable
/// range.
fn baseline_skews(lines: &[PolarLine]) -> Vec<i32> {
    lines
        .iter()
        .map(|line| line.angle_in_degrees as i32 - 90)
        .filter(|skew| skew.abs() <= MAX_SKEW_DEGREES)
        .collect()
}

// -- Integral image helpers ---------------------------------------------------

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y). The table has dimensions
/// `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value within a square region centred on (cx, cy), clamped to
/// the image bounds.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx.saturating_add(radius).saturating_add(1) as usize).min(img_width as usize);
    let y2 = (cy.saturating_add(radius).saturating_add(1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Otsu threshold: the level maximising between-class variance of the
/// dark and light pixel groups.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

// -- Tests --------------------------------------------------------------------
