// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lesewerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Lesewerk operations.
#[derive(Debug, Error)]
pub enum LesewerkError {
    // -- Pipeline stage errors --
    #[error("failed to load image: {0}")]
    Load(String),

    #[error("image too large to process: {samples} samples exceeds the limit of {limit}")]
    ResourceLimit { samples: u64, limit: u64 },

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("post-processing failed: {0}")]
    PostProcess(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Run control --
    #[error("a pipeline run is already in progress")]
    RunInProgress,

    #[error("no async runtime available: {0}")]
    Runtime(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-readable error code carried alongside the human-readable message
/// in failure events and diagnostic log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    LoadError,
    ResourceLimit,
    EngineError,
    PostProcessError,
    ConfigError,
    RunInProgress,
    RuntimeError,
    IoError,
    SerializationError,
}

impl ErrorCode {
    /// Stable string form, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadError => "load_error",
            Self::ResourceLimit => "resource_limit",
            Self::EngineError => "engine_error",
            Self::PostProcessError => "post_process_error",
            Self::ConfigError => "config_error",
            Self::RunInProgress => "run_in_progress",
            Self::RuntimeError => "runtime_error",
            Self::IoError => "io_error",
            Self::SerializationError => "serialization_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LesewerkError {
    /// Classify this error into its [`ErrorCode`].
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Load(_) => ErrorCode::LoadError,
            Self::ResourceLimit { .. } => ErrorCode::ResourceLimit,
            Self::Engine(_) => ErrorCode::EngineError,
            Self::PostProcess(_) => ErrorCode::PostProcessError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::RunInProgress => ErrorCode::RunInProgress,
            Self::Runtime(_) => ErrorCode::RuntimeError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Serialization(_) => ErrorCode::SerializationError,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LesewerkError>;
