// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration descriptor: the native `--oem` / `--psm` pair
// derived from a run's settings.

use lesewerk_core::types::{EngineMode, Segmentation, Settings};

/// Native engine mode value for the legacy recogniser.
const OEM_LEGACY: u8 = 0;
/// Native engine mode value for the LSTM recogniser.
const OEM_LSTM: u8 = 1;
/// Native engine mode value for "whatever the language data supports".
const OEM_DEFAULT: u8 = 3;

/// One engine configuration, shared by every engine call of a run so that
/// the text and the token table describe the same recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    oem: u8,
    psm: u8,
}

impl EngineConfig {
    /// Derive the descriptor from run settings.
    ///
    /// `legacy_available` states whether the installed language data ships
    /// the legacy model. Without it `LegacyOnly` is served by the LSTM
    /// recogniser, because Tesseract refuses `--oem 0` on LSTM-only data.
    pub fn from_settings(settings: &Settings, legacy_available: bool) -> Self {
        Self {
            oem: native_engine_mode(settings.engine_mode, legacy_available),
            psm: native_segmentation(settings.segmentation),
        }
    }

    pub fn oem(&self) -> u8 {
        self.oem
    }

    pub fn psm(&self) -> u8 {
        self.psm
    }

    /// Command-line arguments in the order Tesseract expects them.
    pub fn args(&self) -> [String; 4] {
        [
            "--oem".to_string(),
            self.oem.to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
        ]
    }
}

impl std::fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--oem {} --psm {}", self.oem, self.psm)
    }
}

/// `LegacyOnly` and `LstmOnly` → 1, `LegacyPlusLstm` → 3; `LegacyOnly` → 0
/// when legacy data is installed.
pub fn native_engine_mode(mode: EngineMode, legacy_available: bool) -> u8 {
    match mode {
        EngineMode::LegacyOnly if legacy_available => OEM_LEGACY,
        EngineMode::LegacyOnly | EngineMode::LstmOnly => OEM_LSTM,
        EngineMode::LegacyPlusLstm => OEM_DEFAULT,
    }
}

/// Selection index + 1.
pub fn native_segmentation(segmentation: Segmentation) -> u8 {
    segmentation.index() as u8 + 1
}
