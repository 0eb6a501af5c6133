// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine trait and the invoker that binds one configuration to both
// recognition calls of a run.

use lesewerk_core::error::Result;
use lesewerk_core::types::Settings;
use lesewerk_imaging::PreprocessedImage;
use tracing::{debug, info, instrument};

use crate::confidence::aggregate;
use crate::config::EngineConfig;
use crate::tsv::TokenTable;

/// An external optical character recognition engine.
///
/// Implementations must be usable from a worker thread; they are shared
/// read-only across runs.
pub trait OcrEngine: Send + Sync {
    /// Recognise the image and return its text, lines separated by `\n`.
    fn image_to_string(&self, image: &PreprocessedImage, config: &EngineConfig) -> Result<String>;

    /// Recognise the image and return the per-token table.
    fn image_to_data(&self, image: &PreprocessedImage, config: &EngineConfig) -> Result<TokenTable>;
}

/// Text and token table produced under the same [`EngineConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub tokens: TokenTable,
}

impl Recognition {
    /// Mean confidence over scored tokens.
    pub fn confidence(&self) -> f64 {
        aggregate(&self.tokens.confidences())
    }
}

/// Calls an engine with a configuration fixed at construction, so the text
/// and the token table of a run cannot disagree on settings.
pub struct EngineInvoker<'a> {
    engine: &'a dyn OcrEngine,
    config: EngineConfig,
}

impl<'a> EngineInvoker<'a> {
    pub fn new(engine: &'a dyn OcrEngine, settings: &Settings, legacy_available: bool) -> Self {
        let config = EngineConfig::from_settings(settings, legacy_available);
        debug!(%config, "Engine configuration built");
        Self { engine, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(skip_all, fields(config = %self.config))]
    pub fn extract_text(&self, image: &PreprocessedImage) -> Result<String> {
        let text = self.engine.image_to_string(image, &self.config)?;
        info!(lines = text.lines().count(), chars = text.len(), "Text extracted");
        Ok(text)
    }

    #[instrument(skip_all, fields(config = %self.config))]
    pub fn extract_tokens(&self, image: &PreprocessedImage) -> Result<TokenTable> {
        let tokens = self.engine.image_to_data(image, &self.config)?;
        info!(rows = tokens.len(), "Token table extracted");
        Ok(tokens)
    }

    /// Both calls back to back.
    pub fn recognize(&self, image: &PreprocessedImage) -> Result<Recognition> {
        let text = self.extract_text(image)?;
        let tokens = self.extract_tokens(image)?;
        Ok(Recognition { text, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use image::{GrayImage, Luma};
    use lesewerk_core::error::LesewerkError;
    use lesewerk_core::types::{EngineMode, Segmentation};

    use crate::tsv::{TokenConfidence, TokenEntry};

    /// Records every configuration it is called with.
    #[derive(Default)]
    struct RecordingEngine {
        seen: Mutex<Vec<String>>,
        fail_data: bool,
    }

    impl OcrEngine for RecordingEngine {
        fn image_to_string(&self, _: &PreprocessedImage, config: &EngineConfig) -> Result<String> {
            self.seen.lock().unwrap().push(config.to_string());
            Ok("Hello world\n".into())
        }

        fn image_to_data(&self, _: &PreprocessedImage, config: &EngineConfig) -> Result<TokenTable> {
            self.seen.lock().unwrap().push(config.to_string());
            if self.fail_data {
                return Err(LesewerkError::Engine("boom".into()));
            }
            Ok(TokenTable::new(vec![
                TokenEntry {
                    level: 4,
                    text: String::new(),
                    confidence: TokenConfidence::NoText,
                },
                TokenEntry {
                    level: 5,
                    text: "Hello".into(),
                    confidence: TokenConfidence::Score(90),
                },
                TokenEntry {
                    level: 5,
                    text: "world".into(),
                    confidence: TokenConfidence::Score(70),
                },
            ]))
        }
    }

    fn image() -> PreprocessedImage {
        PreprocessedImage::from_gray(GrayImage::from_pixel(10, 10, Luma([255])))
    }

    #[test]
    fn both_calls_share_one_configuration() {
        let engine = RecordingEngine::default();
        let settings = Settings {
            engine_mode: EngineMode::LegacyPlusLstm,
            segmentation: Segmentation::SingleWord,
            ..Settings::default()
        };
        let invoker = EngineInvoker::new(&engine, &settings, false);
        let recognition = invoker.recognize(&image()).unwrap();

        assert_eq!(recognition.text, "Hello world\n");
        assert_eq!(recognition.confidence(), 80.0);
        let seen = engine.seen.lock().unwrap();
        assert_eq!(*seen, vec!["--oem 3 --psm 4", "--oem 3 --psm 4"]);
    }

    #[test]
    fn engine_failure_propagates() {
        let engine = RecordingEngine {
            fail_data: true,
            ..RecordingEngine::default()
        };
        let invoker = EngineInvoker::new(&engine, &Settings::default(), false);
        assert!(matches!(
            invoker.recognize(&image()),
            Err(LesewerkError::Engine(_))
        ));
    }
}
