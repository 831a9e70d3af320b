/// Derived values shown on the plot dashboard.
///
/// Everything here is a pure function of already-fetched data. Heavier
/// analysis (the AI summaries themselves) is produced offline by the
/// analysis job and only read back through the query service.
///
/// Submodules:
/// - `latest`: picks the current AI analysis and lists analysis history.
/// - `change`: latest value and percent change of a reading series.
/// - `groupings`: irrigation logs per calendar day, plus list pagination.

pub mod change;
pub mod groupings;
pub mod latest;
