// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the presentation layer.
//
// Every pipeline error is mapped to plain English with a suggestion. The
// core never retries on its own; `retriable` only tells the caller whether
// re-running with the same input could plausibly succeed.

use crate::error::LesewerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary condition: running again may succeed.
    Transient,
    /// User must do something (pick another file, install the engine).
    ActionRequired,
    /// Retrying with the same input will fail the same way.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the same run could succeed if started again.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `LesewerkError` into a `HumanError`.
pub fn humanize_error(err: &LesewerkError) -> HumanError {
    match err {
        LesewerkError::Load(_) => HumanError {
            message: "The image couldn't be opened.".into(),
            suggestion: "The file may be missing, damaged, or not an image. Choose a PNG, JPEG, BMP or TIFF file.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LesewerkError::ResourceLimit { .. } => HumanError {
            message: "This image is too large to process.".into(),
            suggestion: "Scale the image down or crop it to the area containing text, then try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        LesewerkError::Engine(detail) => humanize_engine_error(detail),

        LesewerkError::PostProcess(_) => HumanError {
            message: "Spell correction failed.".into(),
            suggestion: "Turn off spell checking, or check that the dictionary file is readable.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LesewerkError::Config(detail) => HumanError {
            message: "The recognition settings are invalid.".into(),
            suggestion: format!("Review the selected options and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LesewerkError::RunInProgress => HumanError {
            message: "Text recognition is already running.".into(),
            suggestion: "Wait for the current image to finish, then start the next one.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LesewerkError::Runtime(_) => HumanError {
            message: "The recognition worker couldn't be started.".into(),
            suggestion: "Restart the application and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LesewerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The application doesn't have permission to read that file.".into(),
                    suggestion: "Check the file permissions, or copy the file to a different location first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        LesewerkError::Serialization(_) => HumanError {
            message: "The result couldn't be encoded.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

fn humanize_engine_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("not found") || lower.contains("failed to start") {
        HumanError {
            message: "The OCR engine isn't installed or couldn't be started.".into(),
            suggestion: "Install Tesseract, or point LESEWERK_TESSERACT_CMD at the tesseract executable.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("traineddata") || lower.contains("language") {
        HumanError {
            message: "The OCR engine is missing language data.".into(),
            suggestion: "Install the language pack for the configured language, or set TESSDATA_PREFIX.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "Text recognition didn't work on this image.".into(),
            suggestion: format!("Try a different page segmentation mode or a clearer image. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
