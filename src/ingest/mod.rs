//! Fetching and decoding plot data from the query service.
//!
//! - `decode` turns raw JSON bodies into the data model, failing closed per
//!   row or entry rather than per response.
//! - `query_service` is the blocking HTTP client for the service routes.

use crate::model::{AiSummary, AnalysisEntry, PlotAnalytics, PlotError};

pub mod decode;
pub mod query_service;

/// Anything that can produce a plot's data on request.
///
/// The store is written against this trait so it can be driven by the
/// HTTP client in production and by fixtures in tests.
pub trait PlotSource {
    fn fetch_analytics(&self, plot_id: &str) -> Result<PlotAnalytics, PlotError>;
    fn fetch_ai_history(&self, plot_id: &str) -> Result<Vec<AnalysisEntry>, PlotError>;
    fn fetch_ai_summary(&self, plot_id: &str) -> Result<AiSummary, PlotError>;
}
