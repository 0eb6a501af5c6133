// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Resolution order: built-in defaults, then the JSON config file in the
// user's config directory, then environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{LesewerkError, Result};

/// Default upper bound on width x height x channels for a single image.
pub const DEFAULT_MAX_SAMPLES: u64 = 100_000_000;

const CONFIG_FILE: &str = "config.json";

/// Persistent pipeline settings that are not part of a per-run [`Settings`](crate::Settings)
/// snapshot: engine location, resource bounds, dictionary, diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine executable. `None` means `tesseract` resolved via `PATH`.
    pub tesseract_cmd: Option<PathBuf>,
    /// Directory holding `*.traineddata`, exported as `TESSDATA_PREFIX`.
    pub tessdata_dir: Option<PathBuf>,
    /// Engine language pack, e.g. `eng` or `eng+deu`.
    pub language: String,
    /// Loader/Guard bound on decoded samples.
    pub max_samples: u64,
    /// Word list (one word per line) backing the spell corrector.
    pub dictionary_path: Option<PathBuf>,
    /// Whether the installed language data supports the legacy engine.
    pub legacy_engine_available: bool,
    /// Apply the denoise / deskew / threshold settings during preprocessing.
    pub apply_enhancements: bool,
    /// Append-only diagnostic log location.
    pub diagnostic_log: Option<PathBuf>,
    /// Maximum number of suggestions requested per misspelt token.
    pub max_suggestions: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: None,
            tessdata_dir: None,
            language: "eng".into(),
            max_samples: DEFAULT_MAX_SAMPLES,
            dictionary_path: None,
            legacy_engine_available: false,
            apply_enhancements: false,
            diagnostic_log: None,
            max_suggestions: 5,
        }
    }
}

impl AppConfig {
    /// Load the config file from the user's config directory (if any) and
    /// overlay environment variables.
    pub fn discover() -> Result<Self> {
        let path = config_dir().join(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing keys take their default values.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data).map_err(|e| {
            LesewerkError::Config(format!(
                "malformed config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        info!("config loaded");
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Overlay values from the environment. `lookup` abstracts
    /// `std::env::var` so the overlay can be exercised without touching the
    /// process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(cmd) = lookup("LESEWERK_TESSERACT_CMD") {
            self.tesseract_cmd = Some(PathBuf::from(cmd));
        }
        if let Some(dir) = lookup("TESSDATA_PREFIX") {
            self.tessdata_dir = Some(PathBuf::from(dir));
        }
        if let Some(lang) = lookup("LESEWERK_LANGUAGE") {
            self.language = lang;
        }
        if let Some(raw) = lookup("LESEWERK_MAX_SAMPLES") {
            self.max_samples = raw.trim().parse().map_err(|e| {
                LesewerkError::Config(format!("LESEWERK_MAX_SAMPLES='{raw}': {e}"))
            })?;
        }
        if let Some(dict) = lookup("LESEWERK_DICTIONARY") {
            self.dictionary_path = Some(PathBuf::from(dict));
        }
        if let Some(log) = lookup("LESEWERK_DIAGNOSTIC_LOG") {
            self.diagnostic_log = Some(PathBuf::from(log));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_samples == 0 {
            return Err(LesewerkError::Config("max_samples must be positive".into()));
        }
        if self.language.trim().is_empty() {
            return Err(LesewerkError::Config("language must not be empty".into()));
        }
        Ok(())
    }
}

/// Per-user configuration directory (`$XDG_CONFIG_HOME/lesewerk`).
pub fn config_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        PathBuf::from(".")
    };
    base.join("lesewerk")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert_eq!(config.max_samples, DEFAULT_MAX_SAMPLES);
        assert_eq!(config.language, "eng");
        assert!(config.tesseract_cmd.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn env_overlay_overrides_fields() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LESEWERK_TESSERACT_CMD", "/opt/tess/bin/tesseract"),
            ("LESEWERK_MAX_SAMPLES", "5000"),
            ("LESEWERK_LANGUAGE", "deu"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.tesseract_cmd,
            Some(PathBuf::from("/opt/tess/bin/tesseract"))
        );
        assert_eq!(config.max_samples, 5000);
        assert_eq!(config.language, "deu");
        assert!(config.dictionary_path.is_none());
    }

    #[test]
    fn bad_env_number_is_config_error() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|k| {
            (k == "LESEWERK_MAX_SAMPLES").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(LesewerkError::Config(_))));
    }

    #[test]
    fn save_and_load_preserve_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = AppConfig {
            max_samples: 42,
            apply_enhancements: true,
            dictionary_path: Some(PathBuf::from("/usr/share/dict/words")),
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "language": "fra" }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.language, "fra");
        assert_eq!(config.max_samples, DEFAULT_MAX_SAMPLES);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(LesewerkError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let config = AppConfig {
            max_samples: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
