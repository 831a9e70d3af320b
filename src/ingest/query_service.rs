/// Query Service API Client
///
/// Blocking client for the `/plots/*` routes of the plot query service.
/// Every route is a GET with its arguments in the query string and a JSON
/// body in the response. Decoding is delegated to `ingest::decode`.
///
/// # Routes
/// - `get-plots?user_id=`: the user's plots
/// - `get-plot?plot_id=`: one plot's metadata and crop
/// - `analytics?plot_id=`: plot metadata, readings and irrigation logs
/// - `ai-summary?plot_id=`: the summary card
/// - `ai-history?plot_id=`: every stored analysis for the plot
/// - `get-user-sensors?user_id=`: sensors, grouped by plot
/// - `sensor-count?plot_id=`: sensor count per category
/// - `user-device?user_id=`: the user's field controller
/// - `irrigation-history?user_id=`: irrigation runs across the user's plots

use reqwest::Url;
use std::time::Duration;

use crate::config::Config;
use crate::ingest::PlotSource;
use crate::ingest::decode;
use crate::logging::{self, Service};
use crate::model::{
    AiSummary, AnalysisEntry, Device, IrrigationHistoryEntry, Plot, PlotAnalytics, PlotError,
    PlotListing, Sensor, SensorCounts,
};

// ============================================================================
// Endpoints
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Plots,
    Plot,
    Analytics,
    AiSummary,
    AiHistory,
    UserSensors,
    SensorCount,
    UserDevice,
    IrrigationHistory,
}

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Plots,
        Endpoint::Plot,
        Endpoint::Analytics,
        Endpoint::AiSummary,
        Endpoint::AiHistory,
        Endpoint::UserSensors,
        Endpoint::SensorCount,
        Endpoint::UserDevice,
        Endpoint::IrrigationHistory,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Plots => "plots/get-plots",
            Endpoint::Plot => "plots/get-plot",
            Endpoint::Analytics => "plots/analytics",
            Endpoint::AiSummary => "plots/ai-summary",
            Endpoint::AiHistory => "plots/ai-history",
            Endpoint::UserSensors => "plots/get-user-sensors",
            Endpoint::SensorCount => "plots/sensor-count",
            Endpoint::UserDevice => "plots/user-device",
            Endpoint::IrrigationHistory => "plots/irrigation-history",
        }
    }

    /// The logging tag requests to this route are reported under.
    pub fn service(&self) -> Service {
        match self {
            Endpoint::Plot | Endpoint::Analytics => Service::Analytics,
            Endpoint::AiSummary => Service::AiSummary,
            Endpoint::AiHistory => Service::AiHistory,
            Endpoint::Plots
            | Endpoint::UserSensors
            | Endpoint::SensorCount
            | Endpoint::UserDevice
            | Endpoint::IrrigationHistory => Service::Inventory,
        }
    }

    /// Whether the route is keyed by user rather than by plot.
    pub fn is_user_scoped(&self) -> bool {
        matches!(
            self,
            Endpoint::Plots | Endpoint::UserSensors | Endpoint::UserDevice | Endpoint::IrrigationHistory
        )
    }
}

/// Builds the URL for `endpoint` under `base_url`.
///
/// `base_url` may or may not end in `/`; any path it carries is kept.
/// Parameter values are percent-encoded.
pub fn build_endpoint_url(
    base_url: &str,
    endpoint: Endpoint,
    params: &[(&str, &str)],
) -> Result<Url, PlotError> {
    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    let mut url = Url::parse(&base)
        .and_then(|b| b.join(endpoint.path()))
        .map_err(|e| PlotError::InvalidUrl(format!("{} ({})", base_url, e)))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

// ============================================================================
// Client
// ============================================================================

pub struct QueryServiceClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl QueryServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PlotError> {
        // Fail on a bad base URL here rather than on every request.
        build_endpoint_url(base_url, Endpoint::Plots, &[])?;
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PlotError::from)?;
        Ok(QueryServiceClient {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PlotError> {
        Self::new(
            &config.service.base_url,
            Duration::from_secs(config.service.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the raw body of `endpoint`. Non-2xx statuses are errors.
    pub fn get_body(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> Result<String, PlotError> {
        let url = build_endpoint_url(&self.base_url, endpoint, params)?;
        logging::debug(endpoint.service(), None, &format!("GET {}", url));

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlotError::HttpError(status.as_u16()));
        }
        Ok(response.text()?)
    }

    // --- Inventory routes --------------------------------------------------

    pub fn fetch_plots(&self, user_id: &str) -> Result<Vec<PlotListing>, PlotError> {
        let body = self.get_body(Endpoint::Plots, &[("user_id", user_id)])?;
        decode::decode_plot_list(&body)
    }

    pub fn fetch_plot(&self, plot_id: &str) -> Result<Plot, PlotError> {
        let body = self.get_body(Endpoint::Plot, &[("plot_id", plot_id)])?;
        decode::decode_plot(&body, plot_id)
    }

    pub fn fetch_irrigation_history(&self, user_id: &str) -> Result<Vec<IrrigationHistoryEntry>, PlotError> {
        let body = self.get_body(Endpoint::IrrigationHistory, &[("user_id", user_id)])?;
        decode::decode_irrigation_history(&body)
    }

    pub fn fetch_user_sensors(&self, user_id: &str) -> Result<Vec<Sensor>, PlotError> {
        let body = self.get_body(Endpoint::UserSensors, &[("user_id", user_id)])?;
        decode::decode_user_sensors(&body)
    }

    pub fn fetch_sensor_counts(&self, plot_id: &str) -> Result<SensorCounts, PlotError> {
        let body = self.get_body(Endpoint::SensorCount, &[("plot_id", plot_id)])?;
        decode::decode_sensor_counts(&body)
    }

    pub fn fetch_user_device(&self, user_id: &str) -> Result<Option<Device>, PlotError> {
        let body = self.get_body(Endpoint::UserDevice, &[("user_id", user_id)])?;
        decode::decode_user_device(&body)
    }
}

impl PlotSource for QueryServiceClient {
    fn fetch_analytics(&self, plot_id: &str) -> Result<PlotAnalytics, PlotError> {
        let body = self.get_body(Endpoint::Analytics, &[("plot_id", plot_id)])?;
        decode::decode_analytics(&body, plot_id)
    }

    fn fetch_ai_history(&self, plot_id: &str) -> Result<Vec<AnalysisEntry>, PlotError> {
        let body = self.get_body(Endpoint::AiHistory, &[("plot_id", plot_id)])?;
        decode::decode_ai_history(&body, Some(plot_id))
    }

    fn fetch_ai_summary(&self, plot_id: &str) -> Result<AiSummary, PlotError> {
        let body = self.get_body(Endpoint::AiSummary, &[("plot_id", plot_id)])?;
        decode::decode_ai_summary(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================
