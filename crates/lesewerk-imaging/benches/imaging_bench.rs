// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the preprocessing path of lesewerk-imaging:
// plain grayscale conversion versus the full enhancement chain.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use lesewerk_core::types::{Settings, ThresholdMethod};
use lesewerk_imaging::{Preprocessor, RawImage};

/// Synthetic 400x300 page: light background with dark horizontal bars
/// standing in for text lines.
fn synthetic_page() -> DynamicImage {
    let (width, height) = (400u32, 300u32);
    let img = RgbImage::from_fn(width, height, |x, y| {
        if y % 20 < 4 && (20..380).contains(&x) {
            Rgb([30, 30, 30])
        } else {
            Rgb([235, 232, 228])
        }
    });
    DynamicImage::ImageRgb8(img)
}

fn bench_grayscale(c: &mut Criterion) {
    let page = synthetic_page();
    let settings = Settings::default();

    c.bench_function("preprocess grayscale (400x300)", |b| {
        b.iter(|| {
            let raw = RawImage::from_dynamic(black_box(page.clone()));
            black_box(Preprocessor::new(false).process(raw, &settings));
        });
    });
}

fn bench_enhanced(c: &mut Criterion) {
    let page = synthetic_page();
    let settings = Settings {
        denoise: true,
        deskew: true,
        threshold_method: ThresholdMethod::Adaptive,
        ..Settings::default()
    };

    c.bench_function("preprocess enhanced (400x300)", |b| {
        b.iter(|| {
            let raw = RawImage::from_dynamic(black_box(page.clone()));
            black_box(Preprocessor::new(true).process(raw, &settings));
        });
    });
}

criterion_group!(benches, bench_grayscale, bench_enhanced);
criterion_main!(benches);
