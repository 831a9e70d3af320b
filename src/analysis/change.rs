//! Latest value and percent change of a reading series.
//!
//! Two comparisons are in use on the dashboard and they are kept distinct:
//!
//! - `ChangeBasis::WindowTrend` compares the latest sample with the oldest
//!   sample in the filtered window. The detailed chart header uses it.
//! - `ChangeBasis::SampleOverSample` compares the latest sample with the one
//!   immediately before it. The sensor summary cards use it.

use serde::Serialize;

use crate::model::Reading;

/// Percent change from `previous` to `latest`; positive means an increase.
///
/// Returns `None` if either value is missing or `previous` is zero. The
/// result is not rounded; see `format_percent` for display.
pub fn percent_change(latest: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (latest, previous) = (latest?, previous?);
    if previous == 0.0 {
        return None;
    }
    Some(((latest - previous) / previous) * 100.0)
}

/// One-decimal display with an explicit `+` for non-negative changes,
/// e.g. `+10.0%`, `-2.5%`.
pub fn format_percent(percent: f64) -> String {
    let rounded = format!("{:.1}", percent);
    // "-0.0" reads as a decrease; show it as no change.
    if rounded == "-0.0" || percent >= 0.0 {
        format!("+{}%", rounded.trim_start_matches('-'))
    } else {
        format!("{}%", rounded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeBasis {
    WindowTrend,
    SampleOverSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeMetric {
    pub basis: ChangeBasis,
    pub latest: Option<f64>,
    pub previous: Option<f64>,
    pub percent: Option<f64>,
}

impl ChangeMetric {
    /// The formatted percent, or `None` when no change can be computed.
    pub fn display(&self) -> Option<String> {
        self.percent.map(format_percent)
    }
}

/// Computes the change metric for a series sorted ascending by time, as
/// produced by `window::filter_by_range`.
///
/// A single-sample series has a latest value but no previous one under
/// `SampleOverSample`; under `WindowTrend` the sample is compared with
/// itself and yields 0%.
pub fn change_metric(series: &[Reading], basis: ChangeBasis) -> ChangeMetric {
    let latest = series.last().and_then(|r| r.value);
    let previous = match basis {
        ChangeBasis::WindowTrend => series.first().and_then(|r| r.value),
        ChangeBasis::SampleOverSample => series
            .len()
            .checked_sub(2)
            .and_then(|i| series.get(i))
            .and_then(|r| r.value),
    };
    ChangeMetric {
        basis,
        latest,
        previous,
        percent: percent_change(latest, previous),
    }
}
