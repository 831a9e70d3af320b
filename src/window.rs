/// Time windows over reading series.
///
/// A chart shows either a trailing window (`1D`, `1W`, `1M`, `3M`, ending at
/// the reference "now") or a custom pair of instants picked by the viewer.
/// Filtering is pure: the reference time is always passed in, never read
/// from the clock, so identical inputs produce identical chart data.
///
/// # Timezones
/// Trailing windows are plain durations and need no timezone. A custom range
/// without an end runs to the end of the start's calendar day, which is
/// computed in the start's own timezone (the viewer's, see `Config`).

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::model::{PlotError, Reading};

// ---------------------------------------------------------------------------
// Range tokens
// ---------------------------------------------------------------------------

/// The range buttons offered above every detailed chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RangeToken {
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    Custom,
}

impl RangeToken {
    /// Window length in days, or `None` for `Custom`.
    pub fn days(self) -> Option<i64> {
        match self {
            RangeToken::OneDay => Some(1),
            RangeToken::OneWeek => Some(7),
            RangeToken::OneMonth => Some(30),
            RangeToken::ThreeMonths => Some(90),
            RangeToken::Custom => None,
        }
    }
}

impl FromStr for RangeToken {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1D" => Ok(RangeToken::OneDay),
            "1W" => Ok(RangeToken::OneWeek),
            "1M" => Ok(RangeToken::OneMonth),
            "3M" => Ok(RangeToken::ThreeMonths),
            "custom" => Ok(RangeToken::Custom),
            other => Err(PlotError::InvalidRange(other.to_string())),
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            RangeToken::OneDay => "1D",
            RangeToken::OneWeek => "1W",
            RangeToken::OneMonth => "1M",
            RangeToken::ThreeMonths => "3M",
            RangeToken::Custom => "custom",
        };
        write!(f, "{}", token)
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// An inclusive `[start, end]` interval. Always satisfies `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, PlotError> {
        if start > end {
            return Err(PlotError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The trailing window of `days` days ending at `now`.
    pub fn trailing(days: i64, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Readings inside the window with a non-null value, ascending by
    /// `read_time`. Readings sharing a timestamp keep their input order.
    pub fn filter(&self, readings: &[Reading]) -> Vec<Reading> {
        let mut inside: Vec<Reading> = readings
            .iter()
            .filter(|r| r.value.is_some() && self.contains(r.read_time))
            .cloned()
            .collect();
        // sort_by_key is stable
        inside.sort_by_key(|r| r.read_time);
        inside
    }
}

/// The last representable millisecond of `t`'s calendar day, in `t`'s
/// timezone.
pub fn end_of_day<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Utc> {
    t.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .and_then(|eod| t.timezone().from_local_datetime(&eod).latest())
        .map(|eod| eod.with_timezone(&Utc))
        .unwrap_or_else(|| t.with_timezone(&Utc))
}

/// What the viewer asked to see: a trailing range or a custom pair.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeSelection<Tz: TimeZone> {
    Last(RangeToken),
    Custom {
        start: DateTime<Tz>,
        /// Defaults to the end of `start`'s calendar day.
        end: Option<DateTime<Tz>>,
    },
}

impl<Tz: TimeZone> RangeSelection<Tz> {
    pub fn token(&self) -> RangeToken {
        match self {
            RangeSelection::Last(token) => *token,
            RangeSelection::Custom { .. } => RangeToken::Custom,
        }
    }

    /// Resolves the selection against the reference time.
    ///
    /// `Last(Custom)` carries no bounds and is rejected; use the `Custom`
    /// variant instead.
    pub fn window(&self, now: DateTime<Utc>) -> Result<TimeWindow, PlotError> {
        match self {
            RangeSelection::Last(token) => token
                .days()
                .map(|days| TimeWindow::trailing(days, now))
                .ok_or_else(|| PlotError::InvalidRange(token.to_string())),
            RangeSelection::Custom { start, end } => {
                let end = match end {
                    Some(end) => end.with_timezone(&Utc),
                    None => end_of_day(start),
                };
                TimeWindow::new(start.with_timezone(&Utc), end)
            }
        }
    }
}

/// Narrows `readings` to the selected window.
///
/// Returns an empty sequence when nothing falls inside the window or when
/// the selection does not resolve to a valid window.
pub fn filter_by_range<Tz: TimeZone>(
    readings: &[Reading],
    selection: &RangeSelection<Tz>,
    now: DateTime<Utc>,
) -> Vec<Reading> {
    match selection.window(now) {
        Ok(window) => window.filter(readings),
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn reading(datetime: &str, value: Option<f64>) -> Reading {
        Reading {
            read_time: DateTime::parse_from_rfc3339(datetime)
                .unwrap()
                .with_timezone(&Utc),
            value,
            sensor_id: "m-1".to_string(),
        }
    }

    /// A fixed "now" used across all tests: 2024-01-06 00:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap()
    }

    fn utc(datetime: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(datetime).unwrap().with_timezone(&Utc)
    }

    // --- Tokens -------------------------------------------------------------

    #[test]
    fn test_tokens_parse_and_map_to_day_counts() {
        let cases = [("1D", 1), ("1W", 7), ("1M", 30), ("3M", 90)];
        for (token, days) in cases {
            let parsed: RangeToken = token.parse().expect("known token should parse");
            assert_eq!(parsed.days(), Some(days), "token {}", token);
            assert_eq!(parsed.to_string(), token);
        }
        assert_eq!("custom".parse::<RangeToken>(), Ok(RangeToken::Custom));
        assert_eq!(RangeToken::Custom.days(), None);
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        assert_eq!(
            "2W".parse::<RangeToken>(),
            Err(PlotError::InvalidRange("2W".to_string()))
        );
    }

    // --- Trailing windows ---------------------------------------------------

    #[test]
    fn test_trailing_window_length_matches_token() {
        for token in [
            RangeToken::OneDay,
            RangeToken::OneWeek,
            RangeToken::OneMonth,
            RangeToken::ThreeMonths,
        ] {
            let window = RangeSelection::<Utc>::Last(token)
                .window(fixed_now())
                .expect("preset tokens always resolve");
            assert_eq!(window.end(), fixed_now());
            assert_eq!(
                window.end() - window.start(),
                Duration::days(token.days().unwrap())
            );
        }
    }

    #[test]
    fn test_last_custom_without_bounds_is_an_error() {
        let result = RangeSelection::<Utc>::Last(RangeToken::Custom).window(fixed_now());
        assert!(result.is_err());
    }

    #[test]
    fn test_week_window_keeps_both_readings_in_ascending_order() {
        // Input deliberately out of order.
        let readings = vec![
            reading("2024-01-05T00:00:00Z", Some(20.0)),
            reading("2024-01-01T00:00:00Z", Some(10.0)),
        ];
        let filtered = filter_by_range(
            &readings,
            &RangeSelection::<Utc>::Last(RangeToken::OneWeek),
            fixed_now(),
        );
        let values: Vec<_> = filtered.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(10.0), Some(20.0)]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let readings = vec![
            reading("2024-01-05T00:00:00Z", Some(1.0)), // exactly now - 1 day
            reading("2024-01-06T00:00:00Z", Some(2.0)), // exactly now
            reading("2024-01-04T23:59:59Z", Some(3.0)), // one second early
            reading("2024-01-06T00:00:01Z", Some(4.0)), // one second late
        ];
        let filtered = filter_by_range(
            &readings,
            &RangeSelection::<Utc>::Last(RangeToken::OneDay),
            fixed_now(),
        );
        let values: Vec<_> = filtered.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_null_values_are_dropped() {
        let readings = vec![
            reading("2024-01-05T10:00:00Z", None),
            reading("2024-01-05T11:00:00Z", Some(5.0)),
        ];
        let filtered = filter_by_range(
            &readings,
            &RangeSelection::<Utc>::Last(RangeToken::OneDay),
            fixed_now(),
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].value, Some(5.0));
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let mut a = reading("2024-01-05T10:00:00Z", Some(1.0));
        a.sensor_id = "a".to_string();
        let mut b = reading("2024-01-05T10:00:00Z", Some(2.0));
        b.sensor_id = "b".to_string();
        let early = reading("2024-01-05T09:00:00Z", Some(0.5));

        let filtered = filter_by_range(
            &[a, b, early],
            &RangeSelection::<Utc>::Last(RangeToken::OneDay),
            fixed_now(),
        );
        let ids: Vec<_> = filtered.iter().map(|r| r.sensor_id.as_str()).collect();
        assert_eq!(ids, vec!["m-1", "a", "b"]);
    }

    #[test]
    fn test_empty_input_and_empty_window_return_empty() {
        let selection = RangeSelection::<Utc>::Last(RangeToken::OneMonth);
        assert!(filter_by_range(&[], &selection, fixed_now()).is_empty());

        let old = vec![reading("2023-01-01T00:00:00Z", Some(1.0))];
        assert!(filter_by_range(&old, &selection, fixed_now()).is_empty());
    }

    #[test]
    fn test_filter_is_repeatable() {
        let readings = vec![
            reading("2024-01-03T00:00:00Z", Some(3.0)),
            reading("2024-01-02T00:00:00Z", Some(2.0)),
        ];
        let selection = RangeSelection::<Utc>::Last(RangeToken::OneWeek);
        assert_eq!(
            filter_by_range(&readings, &selection, fixed_now()),
            filter_by_range(&readings, &selection, fixed_now())
        );
    }

    // --- Custom windows -----------------------------------------------------

    #[test]
    fn test_custom_without_end_equals_end_of_start_day() {
        let start = utc("2024-01-02T06:00:00Z");
        let readings = vec![
            reading("2024-01-02T05:00:00Z", Some(1.0)),
            reading("2024-01-02T12:00:00Z", Some(2.0)),
            reading("2024-01-02T23:59:59Z", Some(3.0)),
            reading("2024-01-03T00:00:00Z", Some(4.0)),
        ];

        let open = filter_by_range(
            &readings,
            &RangeSelection::Custom { start, end: None },
            fixed_now(),
        );
        let closed = filter_by_range(
            &readings,
            &RangeSelection::Custom {
                start,
                end: Some(end_of_day(&start).with_timezone(&Utc)),
            },
            fixed_now(),
        );
        assert_eq!(open, closed);
        let values: Vec<_> = open.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_custom_window_ignores_reference_now() {
        let start = utc("2023-06-01T00:00:00Z");
        let end = utc("2023-06-30T00:00:00Z");
        let readings = vec![reading("2023-06-15T00:00:00Z", Some(7.0))];
        let filtered = filter_by_range(
            &readings,
            &RangeSelection::Custom { start, end: Some(end) },
            fixed_now(),
        );
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_inverted_custom_window_is_rejected_and_filters_to_empty() {
        let start = utc("2024-01-05T00:00:00Z");
        let end = utc("2024-01-01T00:00:00Z");
        let selection = RangeSelection::Custom { start, end: Some(end) };
        assert!(matches!(
            selection.window(fixed_now()),
            Err(PlotError::InvalidWindow { .. })
        ));
        let readings = vec![reading("2024-01-03T00:00:00Z", Some(1.0))];
        assert!(filter_by_range(&readings, &selection, fixed_now()).is_empty());
    }

    #[test]
    fn test_end_of_day_uses_the_start_timezone() {
        // 2024-01-02 06:00 at +08:00 is still Jan 2 locally; the local day
        // ends at 2024-01-02T15:59:59.999Z.
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let start = tz.with_ymd_and_hms(2024, 1, 2, 6, 0, 0).unwrap();
        let eod = end_of_day(&start);
        assert_eq!(
            eod,
            utc("2024-01-02T15:59:59.999Z"),
            "end of day should be computed in the viewer's timezone"
        );
    }
}
