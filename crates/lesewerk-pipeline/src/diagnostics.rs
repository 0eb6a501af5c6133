// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic log: append-only JSON lines, one entry per finished run.
//
// Entry layout:
//   {
//     "timestamp":     RFC 3339,
//     "run_id":        UUID,
//     "level":         "info" | "error",
//     "source":        image path as given,
//     "source_sha256": hex digest of the image file, if readable,
//     "confidence":    aggregate confidence (success only),
//     "code":          error code (failure only),
//     "message":       error message (failure only)
//   }

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lesewerk_core::error::{ErrorCode, LesewerkError, Result};
use lesewerk_core::types::{OcrResult, RunId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// Severity of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Error,
}

/// One line of the diagnostic log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Utc>,
    pub run_id: RunId,
    pub level: DiagnosticLevel,
    pub source: String,
    pub source_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only diagnostic log file.
///
/// Writers are serialised through an internal lock so concurrent pipeline
/// instances sharing one log never interleave partial lines.
#[derive(Debug)]
pub struct DiagnosticLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DiagnosticLog {
    /// Open (or create) the log at `path`, creating parent directories.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;

        debug!("diagnostic log opened");
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single JSON line.
    pub fn record(&self, entry: &DiagnosticEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Record a completed run at `info` level.
    pub fn record_success(
        &self,
        run_id: RunId,
        source: &Path,
        result: &OcrResult,
    ) -> Result<()> {
        self.record(&DiagnosticEntry {
            timestamp: Utc::now(),
            run_id,
            level: DiagnosticLevel::Info,
            source: source.display().to_string(),
            source_sha256: fingerprint(source),
            confidence: Some(result.confidence()),
            code: None,
            message: None,
        })
    }

    /// Record a failed run at `error` level.
    pub fn record_failure(&self, run_id: RunId, source: &Path, err: &LesewerkError) -> Result<()> {
        self.record(&DiagnosticEntry {
            timestamp: Utc::now(),
            run_id,
            level: DiagnosticLevel::Error,
            source: source.display().to_string(),
            source_sha256: fingerprint(source),
            confidence: None,
            code: Some(err.code()),
            message: Some(err.to_string()),
        })
    }

    /// Every entry in file order. Malformed lines are a `Serialization` error.
    pub fn entries(&self) -> Result<Vec<DiagnosticEntry>> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let reader = BufReader::new(File::open(&self.path)?);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Entries belonging to one run.
    pub fn entries_for_run(&self, run_id: RunId) -> Result<Vec<DiagnosticEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.run_id == run_id)
            .collect())
    }
}

/// SHA-256 of `data` as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 of the file at `path`, streamed so large images are not held in
/// memory twice.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// `None` when the source cannot be read (e.g. the run failed to load it).
fn fingerprint(path: &Path) -> Option<String> {
    hash_file(path).ok()
}
