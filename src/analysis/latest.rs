//! Selection of AI analysis entries.
//!
//! The analysis job writes one entry per plot, language and cadence each
//! time it runs, so the history for a plot usually holds several entries
//! that differ only in date. The dashboard shows the most recent matching
//! one; the history list shows all of them, newest first.

use crate::model::{AnalysisEntry, Cadence};

fn matches(entry: &AnalysisEntry, language: &str, cadence: Cadence) -> bool {
    entry.language.eq_ignore_ascii_case(language)
        && entry.analysis_type == cadence
        && entry.summary.is_some()
}

/// Returns the most recent entry for `language` (case-insensitive) and
/// `cadence` that carries a summary.
///
/// When several matching entries share the latest `analysis_date`, the one
/// that appears first in `entries` wins.
///
/// Returns `None` when nothing matches; callers render an explicit
/// "no analysis" state.
pub fn select_latest<'a>(
    entries: &'a [AnalysisEntry],
    language: &str,
    cadence: Cadence,
) -> Option<&'a AnalysisEntry> {
    entries
        .iter()
        .filter(|e| matches(e, language, cadence))
        .fold(None, |best: Option<&AnalysisEntry>, e| match best {
            Some(b) if e.analysis_date <= b.analysis_date => Some(b),
            _ => Some(e),
        })
}

/// All entries for `language` and `cadence` that carry a summary, newest
/// first. Entries with equal dates keep their input order.
pub fn analysis_history<'a>(
    entries: &'a [AnalysisEntry],
    language: &str,
    cadence: Cadence,
) -> Vec<&'a AnalysisEntry> {
    let mut history: Vec<&AnalysisEntry> = entries
        .iter()
        .filter(|e| matches(e, language, cadence))
        .collect();
    history.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));
    history
}
