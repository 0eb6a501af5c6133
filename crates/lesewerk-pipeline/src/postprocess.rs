// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spell correction of recognised text.
//
// Line boundaries are preserved; whitespace inside a line collapses to a
// single space. Tokens of two characters or fewer are never looked up.

use lesewerk_core::error::{LesewerkError, Result};
use tracing::{debug, info, instrument};

use crate::lexicon::Lexicon;

/// Tokens must be longer than this (in characters) to be checked.
const MIN_CHECKED_LEN: usize = 2;

/// Rewrites unrecognised tokens with the lexicon's top suggestion.
pub struct SpellCorrector<'a> {
    lexicon: &'a dyn Lexicon,
}

impl<'a> SpellCorrector<'a> {
    pub fn new(lexicon: &'a dyn Lexicon) -> Self {
        Self { lexicon }
    }

    /// Correct every line of `text`.
    ///
    /// # Errors
    ///
    /// [`LesewerkError::PostProcess`] if the lexicon fails. The text is
    /// never returned partially corrected.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn correct(&self, text: &str) -> Result<String> {
        let mut replaced = 0usize;
        let lines = text
            .split('\n')
            .map(|line| {
                let tokens = line
                    .split_whitespace()
                    .map(|token| {
                        let corrected = self.correct_token(token)?;
                        if corrected != token {
                            replaced += 1;
                        }
                        Ok(corrected)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(tokens.join(" "))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(replaced, "Spell correction finished");
        Ok(lines.join("\n"))
    }

    fn correct_token(&self, token: &str) -> Result<String> {
        if token.chars().count() <= MIN_CHECKED_LEN {
            return Ok(token.to_string());
        }
        if self.lexicon.check(token).map_err(lexicon_failure)? {
            return Ok(token.to_string());
        }

        let suggestions = self.lexicon.suggest(token).map_err(lexicon_failure)?;
        match suggestions.into_iter().next() {
            Some(best) => {
                debug!(%token, %best, "Token replaced");
                Ok(best)
            }
            None => Ok(token.to_string()),
        }
    }
}

fn lexicon_failure(err: LesewerkError) -> LesewerkError {
    match err {
        LesewerkError::PostProcess(_) => err,
        other => LesewerkError::PostProcess(other.to_string()),
    }
}

/// Pass `text` through unchanged when `enabled` is false, otherwise correct
/// it against `lexicon`.
pub fn post_process(text: &str, enabled: bool, lexicon: &dyn Lexicon) -> Result<String> {
    if !enabled {
        return Ok(text.to_string());
    }
    SpellCorrector::new(lexicon).correct(text)
}
