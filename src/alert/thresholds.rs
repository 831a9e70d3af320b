//! Crop range checking.
//!
//! Each crop defines an optimal min/max per metric. The sensor cards colour
//! the latest reading by where it falls against those bounds.

use serde::Serialize;

use crate::model::{Metric, UserCrop};

/// Position of a reading relative to the crop's optimal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangeStatus {
    Low,
    Optimal,
    High,
}

/// Classifies `value` against inclusive `(min, max)` bounds.
pub fn classify_reading(value: f64, (min, max): (f64, f64)) -> RangeStatus {
    if value < min {
        RangeStatus::Low
    } else if value > max {
        RangeStatus::High
    } else {
        RangeStatus::Optimal
    }
}

/// Classifies the latest value of `metric` against the plot's crop.
///
/// Returns `None` if there is no value, no crop, or the crop does not
/// define both bounds for the metric.
pub fn check_crop_range(
    value: Option<f64>,
    crop: Option<&UserCrop>,
    metric: Metric,
) -> Option<RangeStatus> {
    let bounds = crop?.bounds(metric)?;
    Some(classify_reading(value?, bounds))
}
