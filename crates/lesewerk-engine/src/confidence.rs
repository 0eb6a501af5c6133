// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Confidence aggregation: arithmetic mean over scored tokens, sentinels
// excluded. No scored tokens yields 0, not an error.

use lesewerk_core::error::Result;

use crate::tsv::TokenConfidence;

/// Mean of all scores in `confidences`, ignoring [`TokenConfidence::NoText`].
pub fn aggregate(confidences: &[TokenConfidence]) -> f64 {
    let (sum, count) = confidences
        .iter()
        .filter_map(TokenConfidence::score)
        .fold((0u64, 0u64), |(sum, count), v| (sum + v as u64, count + 1));

    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Aggregate raw confidence column values, e.g. `["90", "-1", "70"]`.
///
/// # Errors
///
/// [`LesewerkError::Engine`](lesewerk_core::LesewerkError::Engine) if an
/// entry is neither the sentinel nor a score.
pub fn aggregate_entries<I, S>(entries: I) -> Result<f64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed = entries
        .into_iter()
        .map(|entry| entry.as_ref().parse::<TokenConfidence>())
        .collect::<Result<Vec<_>>>()?;
    Ok(aggregate(&parsed))
}
