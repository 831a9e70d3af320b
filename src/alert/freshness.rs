/// Analysis freshness.
///
/// The analysis job runs once a day. When it fails or has not run yet, the
/// newest entry in the history is from a previous day, and showing it as
/// "today's analysis" would be misleading. This module decides whether an
/// entry is current so the dashboard can show a "no analysis generated"
/// message instead.
///
/// # Clock injection
/// All functions accept a `now: &DateTime<Tz>` rather than reading the
/// clock. `Tz` is the viewer's timezone, and "today" is the calendar date of
/// `now` in that zone.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::model::AnalysisEntry;

/// Returns `true` if `entry` was produced on the same calendar day as `now`,
/// comparing year, month and day in `now`'s timezone.
pub fn is_today<Tz: TimeZone>(entry: &AnalysisEntry, now: &DateTime<Tz>) -> bool {
    entry
        .analysis_date
        .with_timezone(&now.timezone())
        .date_naive()
        == now.date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisFreshness {
    /// The entry is from today.
    Current,
    /// An entry exists but was produced on an earlier (or later) day.
    Outdated,
    /// No matching entry at all.
    Missing,
}

pub fn classify<Tz: TimeZone>(
    entry: Option<&AnalysisEntry>,
    now: &DateTime<Tz>,
) -> AnalysisFreshness {
    match entry {
        None => AnalysisFreshness::Missing,
        Some(e) if is_today(e, now) => AnalysisFreshness::Current,
        Some(_) => AnalysisFreshness::Outdated,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cadence, Warnings};
    use chrono::{FixedOffset, Utc};

    fn entry_at(datetime: &str) -> AnalysisEntry {
        AnalysisEntry {
            analysis_date: DateTime::parse_from_rfc3339(datetime)
                .unwrap()
                .with_timezone(&Utc),
            analysis_type: Cadence::Daily,
            language: "en".to_string(),
            status: "completed".to_string(),
            headline: "Stable moisture".to_string(),
            short_summary: "No action needed.".to_string(),
            summary: None,
            warnings: Warnings {
                drought_risks: "No drought risks".to_string(),
                nutrient_imbalances: "No nutrient imbalance".to_string(),
            },
        }
    }

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn plus8() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_same_day_is_today() {
        let entry = entry_at("2024-05-01T00:00:00Z");
        assert!(is_today(&entry, &fixed_now()));
    }

    #[test]
    fn test_previous_day_is_not_today() {
        let entry = entry_at("2024-04-30T23:59:59Z");
        assert!(!is_today(&entry, &fixed_now()));
    }

    #[test]
    fn test_day_boundary_follows_viewer_timezone() {
        // 2024-05-01T13:00Z is 21:00 on May 1 at +08:00.
        // 2024-04-30T17:00Z is 01:00 on May 1 at +08:00: today locally,
        // yesterday in UTC.
        let entry = entry_at("2024-04-30T17:00:00Z");
        let now_utc = fixed_now();
        let now_local = now_utc.with_timezone(&plus8());
        assert!(!is_today(&entry, &now_utc));
        assert!(is_today(&entry, &now_local));
    }

    #[test]
    fn test_classify() {
        let today = entry_at("2024-05-01T06:00:00Z");
        let old = entry_at("2024-04-28T06:00:00Z");
        assert_eq!(classify(Some(&today), &fixed_now()), AnalysisFreshness::Current);
        assert_eq!(classify(Some(&old), &fixed_now()), AnalysisFreshness::Outdated);
        assert_eq!(classify(None, &fixed_now()), AnalysisFreshness::Missing);
    }
}
