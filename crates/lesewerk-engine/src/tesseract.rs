// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract OCR engine, driven through its command-line interface.
//
// The raster is written to a temporary PNG and passed to
// `tesseract <input> stdout -l <lang> --oem <N> --psm <M> [tsv]`.
// The executable path is injected through `AppConfig` or the environment;
// nothing is hard-coded beyond the `tesseract` name resolved via `PATH`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

use lesewerk_core::config::AppConfig;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_imaging::PreprocessedImage;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::engine::OcrEngine;
use crate::tsv::TokenTable;

const DEFAULT_COMMAND: &str = "tesseract";

/// Tesseract engine wrapper.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
    tessdata_dir: Option<PathBuf>,
    language: String,
}

/// Which renderer Tesseract writes to stdout.
#[derive(Debug, Clone, Copy)]
enum OutputKind {
    Text,
    Tsv,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND, "eng")
    }
}

impl TesseractEngine {
    pub fn new(command: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            tessdata_dir: None,
            language: language.into(),
        }
    }

    /// Build from configuration: explicit command or `tesseract` on `PATH`.
    pub fn from_config(config: &AppConfig) -> Self {
        let command = config
            .tesseract_cmd
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COMMAND));
        Self {
            command,
            tessdata_dir: config.tessdata_dir.clone(),
            language: config.language.clone(),
        }
    }

    pub fn with_tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// First line of `tesseract --version`, e.g. `tesseract 5.3.4`.
    pub fn version(&self) -> Result<String> {
        let output = self.spawn(Command::new(&self.command).arg("--version"))?;
        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        banner
            .lines()
            .next()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| LesewerkError::Engine("empty --version output".into()))
    }

    /// Full argument list for one recognition call.
    fn build_args(&self, input: &Path, config: &EngineConfig, kind: OutputKind) -> Vec<String> {
        let mut args = vec![
            input.to_string_lossy().into_owned(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
        ];
        args.extend(config.args());
        if let OutputKind::Tsv = kind {
            args.push("tsv".to_string());
        }
        args
    }

    #[instrument(skip_all, fields(command = %self.command.display(), config = %config, kind = ?kind))]
    fn run(&self, image: &PreprocessedImage, config: &EngineConfig, kind: OutputKind) -> Result<String> {
        let start = Instant::now();

        let png = image.to_png_bytes()?;
        let mut input = tempfile::Builder::new()
            .prefix("lesewerk-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| LesewerkError::Engine(format!("failed to create temporary input: {e}")))?;
        input
            .write_all(&png)
            .and_then(|_| input.flush())
            .map_err(|e| LesewerkError::Engine(format!("failed to write temporary input: {e}")))?;

        let mut cmd = Command::new(&self.command);
        cmd.args(self.build_args(input.path(), config, kind));
        if let Some(dir) = &self.tessdata_dir {
            cmd.env("TESSDATA_PREFIX", dir);
        }

        debug!(input = %input.path().display(), "Invoking tesseract");
        let output = self.spawn(&mut cmd)?;

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Tesseract finished");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn(&self, cmd: &mut Command) -> Result<Output> {
        let output = cmd.output().map_err(|e| {
            LesewerkError::Engine(format!(
                "failed to start {}: {}",
                self.command.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "Tesseract exited with failure");
            return Err(LesewerkError::Engine(format!(
                "{} exited with {}: {}",
                self.command.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl OcrEngine for TesseractEngine {
    fn image_to_string(&self, image: &PreprocessedImage, config: &EngineConfig) -> Result<String> {
        self.run(image, config, OutputKind::Text)
    }

    fn image_to_data(&self, image: &PreprocessedImage, config: &EngineConfig) -> Result<TokenTable> {
        let tsv = self.run(image, config, OutputKind::Tsv)?;
        TokenTable::from_tsv(&tsv)
    }
}
