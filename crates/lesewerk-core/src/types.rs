// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lesewerk OCR pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LesewerkError, Result};

/// Unique identifier for a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recognition algorithm family requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineMode {
    LegacyOnly,
    LstmOnly,
    LegacyPlusLstm,
}

impl EngineMode {
    pub const ALL: [Self; 3] = [Self::LegacyOnly, Self::LstmOnly, Self::LegacyPlusLstm];

    /// Position of this mode in the presentation layer's selection list.
    pub fn index(&self) -> usize {
        match self {
            Self::LegacyOnly => 0,
            Self::LstmOnly => 1,
            Self::LegacyPlusLstm => 2,
        }
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            LesewerkError::Config(format!(
                "engine mode index {index} out of range (expected 0..{})",
                Self::ALL.len()
            ))
        })
    }
}

/// How the engine partitions the page into text regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segmentation {
    Auto,
    SingleBlock,
    SingleLine,
    SingleWord,
    SingleChar,
    SparseText,
}

impl Segmentation {
    pub const ALL: [Self; 6] = [
        Self::Auto,
        Self::SingleBlock,
        Self::SingleLine,
        Self::SingleWord,
        Self::SingleChar,
        Self::SparseText,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Auto => 0,
            Self::SingleBlock => 1,
            Self::SingleLine => 2,
            Self::SingleWord => 3,
            Self::SingleChar => 4,
            Self::SparseText => 5,
        }
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            LesewerkError::Config(format!(
                "page segmentation index {index} out of range (expected 0..{})",
                Self::ALL.len()
            ))
        })
    }
}

/// Binarization strategy used when scan enhancement is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    Adaptive,
    Otsu,
}

impl ThresholdMethod {
    pub const ALL: [Self; 2] = [Self::Adaptive, Self::Otsu];

    pub fn index(&self) -> usize {
        match self {
            Self::Adaptive => 0,
            Self::Otsu => 1,
        }
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            LesewerkError::Config(format!(
                "threshold method index {index} out of range (expected 0..{})",
                Self::ALL.len()
            ))
        })
    }
}

impl std::str::FromStr for ThresholdMethod {
    type Err = LesewerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adaptive" => Ok(Self::Adaptive),
            "otsu" => Ok(Self::Otsu),
            other => Err(LesewerkError::Config(format!(
                "unknown threshold method '{other}' (expected 'adaptive' or 'otsu')"
            ))),
        }
    }
}

/// Immutable snapshot of the user's recognition settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub engine_mode: EngineMode,
    pub segmentation: Segmentation,
    pub denoise: bool,
    pub deskew: bool,
    pub threshold_method: ThresholdMethod,
    pub spellcheck_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_mode: EngineMode::LstmOnly,
            segmentation: Segmentation::Auto,
            denoise: false,
            deskew: false,
            threshold_method: ThresholdMethod::Adaptive,
            spellcheck_enabled: false,
        }
    }
}

impl Settings {
    /// Build settings from raw selection indices, as handed over by a
    /// presentation layer. Out-of-range indices are rejected.
    pub fn from_indices(
        engine_mode: usize,
        segmentation: usize,
        denoise: bool,
        deskew: bool,
        threshold_method: usize,
        spellcheck_enabled: bool,
    ) -> Result<Self> {
        Ok(Self {
            engine_mode: EngineMode::from_index(engine_mode)?,
            segmentation: Segmentation::from_index(segmentation)?,
            denoise,
            deskew,
            threshold_method: ThresholdMethod::from_index(threshold_method)?,
            spellcheck_enabled,
        })
    }
}

/// The pipeline's sole output artifact.
///
/// Fields are private so a result cannot be altered after the pipeline has
/// produced it; use the accessors or serialise it with [`to_json`](Self::to_json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OcrResultRecord")]
pub struct OcrResult {
    text: String,
    confidence: f64,
    timestamp: DateTime<Utc>,
    settings: Settings,
}

/// Wire form of [`OcrResult`]; converted through the clamping constructor so
/// a decoded result obeys the same bounds as a freshly built one.
#[derive(Deserialize)]
struct OcrResultRecord {
    text: String,
    confidence: f64,
    timestamp: DateTime<Utc>,
    settings: Settings,
}

impl From<OcrResultRecord> for OcrResult {
    fn from(record: OcrResultRecord) -> Self {
        Self::with_timestamp(
            record.text,
            record.confidence,
            record.settings,
            record.timestamp,
        )
    }
}

impl OcrResult {
    /// Stamp a new result with the current time. `confidence` is clamped to
    /// `0.0..=100.0`.
    pub fn new(text: String, confidence: f64, settings: Settings) -> Self {
        Self::with_timestamp(text, confidence, settings, Utc::now())
    }

    pub fn with_timestamp(
        text: String,
        confidence: f64,
        settings: Settings,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            text,
            confidence,
            timestamp,
            settings,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Serialise to the JSON record handed to the presentation layer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Plain-text report of the result, as shown in a results pane.
    pub fn summary(&self) -> String {
        format!(
            "OCR Results:\n\
             ============\n\n\
             Confidence Score: {:.2}%\n\
             Timestamp: {}\n\n\
             Extracted Text:\n\
             -------------\n\
             {}\n",
            self.confidence,
            self.timestamp.to_rfc3339(),
            self.text
        )
    }
}
