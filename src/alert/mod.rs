//! Status flags derived for display: whether the current analysis is from
//! today, and where the latest reading sits against the crop's bounds.

pub mod freshness;
pub mod thresholds;
