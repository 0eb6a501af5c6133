// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lexical dictionary service: word membership and ranked suggestions.
//
// The spell corrector only asks two questions of a lexicon, so any word
// source (a plain word list, a system dictionary, a remote service) can sit
// behind the `Lexicon` trait.

use std::collections::BTreeSet;
use std::path::Path;

use lesewerk_core::error::{LesewerkError, Result};
use strsim::{damerau_levenshtein, normalized_levenshtein};
use tracing::{debug, info, instrument};

/// Edits beyond this distance are not offered as suggestions.
const MAX_EDIT_DISTANCE: usize = 2;

/// Word-validity and suggestion provider.
///
/// Implementations are shared read-only across runs and must be callable
/// from the pipeline worker thread.
pub trait Lexicon: Send + Sync {
    /// Whether `word` is a recognised word.
    fn check(&self, word: &str) -> Result<bool>;

    /// Candidate replacements for `word`, best first. Empty when the
    /// lexicon has nothing close enough.
    fn suggest(&self, word: &str) -> Result<Vec<String>>;
}

/// In-memory lexicon built from a word list, one word per line.
///
/// Lookups are case-insensitive and ignore leading/trailing punctuation.
/// Suggestions are ranked by Damerau-Levenshtein distance, then by
/// normalised Levenshtein similarity, then alphabetically.
#[derive(Debug, Clone)]
pub struct WordListLexicon {
    words: BTreeSet<String>,
    max_suggestions: usize,
}

impl WordListLexicon {
    pub fn new<I, S>(words: I, max_suggestions: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            words,
            max_suggestions,
        }
    }

    /// Read a word list from disk. Blank lines and lines starting with `#`
    /// are skipped.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, max_suggestions: usize) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LesewerkError::Config(format!("cannot read dictionary {}: {e}", path.display()))
        })?;

        let lexicon = Self::new(
            content.lines().filter(|l| !l.trim_start().starts_with('#')),
            max_suggestions,
        );
        info!(words = lexicon.len(), "Dictionary loaded");
        Ok(lexicon)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn max_suggestions(&self) -> usize {
        self.max_suggestions
    }
}

/// Lowercase and strip surrounding punctuation: `"Hello,"` → `"hello"`.
fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Carry a token's surrounding punctuation and capitalisation over to a
/// dictionary word: `("Helo,", "hello")` → `"Hello,"`.
fn restyle(token: &str, word: &str) -> String {
    let is_edge = |c: char| !c.is_alphanumeric();
    let start = token.len() - token.trim_start_matches(is_edge).len();
    let core = token.trim_matches(is_edge);
    let prefix = &token[..start];
    let suffix = &token[start + core.len()..];

    let letters: Vec<char> = core.chars().filter(|c| c.is_alphabetic()).collect();
    let styled = if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        word.to_uppercase()
    } else if letters.first().is_some_and(|c| c.is_uppercase()) {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        word.to_string()
    };
    format!("{prefix}{styled}{suffix}")
}

impl Lexicon for WordListLexicon {
    fn check(&self, word: &str) -> Result<bool> {
        let key = normalize(word);
        // Pure punctuation or digits-only tokens have nothing to correct.
        if key.is_empty() || key.chars().all(|c| c.is_numeric()) {
            return Ok(true);
        }
        Ok(self.words.contains(&key))
    }

    fn suggest(&self, word: &str) -> Result<Vec<String>> {
        let key = normalize(word);
        if key.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(usize, f64, &String)> = self
            .words
            .iter()
            .filter_map(|candidate| {
                let distance = damerau_levenshtein(&key, candidate);
                (distance <= MAX_EDIT_DISTANCE)
                    .then(|| (distance, normalized_levenshtein(&key, candidate), candidate))
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.total_cmp(&a.1))
                .then_with(|| a.2.cmp(b.2))
        });

        let suggestions: Vec<String> = ranked
            .into_iter()
            .take(self.max_suggestions)
            .map(|(_, _, w)| restyle(word, w))
            .collect();
        debug!(%word, count = suggestions.len(), "Suggestions ranked");
        Ok(suggestions)
    }
}
