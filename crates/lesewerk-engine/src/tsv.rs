// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-token recognition table, parsed from Tesseract's TSV output.
//
// TSV format (one header row, tab-separated):
// level  page_num  block_num  par_num  line_num  word_num  left  top  width  height  conf  text
//
// Page/block/paragraph/line rows carry `conf == -1` and an empty text column.

use std::str::FromStr;

use lesewerk_core::error::{LesewerkError, Result};

const CONF_COLUMN: usize = 10;
const TEXT_COLUMN: usize = 11;

/// Confidence reported for one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenConfidence {
    /// A recognised token's score in `0..=100`.
    Score(u8),
    /// The `-1` sentinel: the row is not a text region.
    NoText,
}

impl TokenConfidence {
    pub const SENTINEL: &'static str = "-1";

    /// The score, or `None` for the sentinel.
    pub fn score(&self) -> Option<u8> {
        match self {
            Self::Score(v) => Some(*v),
            Self::NoText => None,
        }
    }
}

impl FromStr for TokenConfidence {
    type Err = LesewerkError;

    /// Parses `-1` as the sentinel and any other value as a score.
    /// Fractional scores (Tesseract 4+ prints e.g. `96.063751`) are
    /// truncated to whole numbers.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed == Self::SENTINEL {
            return Ok(Self::NoText);
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| LesewerkError::Engine(format!("malformed confidence value '{s}'")))?;
        if value == -1.0 {
            return Ok(Self::NoText);
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(LesewerkError::Engine(format!(
                "confidence value {value} outside 0..=100"
            )));
        }
        Ok(Self::Score(value.trunc() as u8))
    }
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    /// Layout level: 1 page, 2 block, 3 paragraph, 4 line, 5 word.
    pub level: u8,
    pub text: String,
    pub confidence: TokenConfidence,
}

/// All rows returned by one structured recognition call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    entries: Vec<TokenEntry>,
}

impl TokenTable {
    pub fn new(entries: Vec<TokenEntry>) -> Self {
        Self { entries }
    }

    /// Parse Tesseract TSV output. Blank lines are skipped; rows with too
    /// few columns or an unparsable confidence are an `Engine` error.
    pub fn from_tsv(tsv: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (line_no, line) in tsv.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with("level") {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() <= CONF_COLUMN {
                return Err(LesewerkError::Engine(format!(
                    "TSV row {} has {} columns, expected at least {}",
                    line_no + 1,
                    cols.len(),
                    CONF_COLUMN + 1
                )));
            }

            let level = cols[0].trim().parse().map_err(|_| {
                LesewerkError::Engine(format!("TSV row {}: bad level '{}'", line_no + 1, cols[0]))
            })?;
            let confidence = cols[CONF_COLUMN].parse()?;
            let text = cols.get(TEXT_COLUMN).map(|t| t.trim()).unwrap_or_default();

            entries.push(TokenEntry {
                level,
                text: text.to_string(),
                confidence,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TokenEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The confidence column, sentinels included.
    pub fn confidences(&self) -> Vec<TokenConfidence> {
        self.entries.iter().map(|e| e.confidence).collect()
    }

    /// Tokens that carry a score.
    pub fn words(&self) -> impl Iterator<Item = &TokenEntry> {
        self.entries
            .iter()
            .filter(|e| e.confidence != TokenConfidence::NoText)
    }
}
