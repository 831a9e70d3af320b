/// Core data types for the plot monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// sensor readings, irrigation logs, AI analysis entries and the plot
/// metadata they hang off. It contains no I/O. Payload decoding lives in
/// `ingest::decode`, which is the only place that builds these types from
/// untrusted JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// The soil measurements a plot reports, one per chartable series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    Moisture,
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Moisture,
        Metric::Nitrogen,
        Metric::Phosphorus,
        Metric::Potassium,
    ];
}

/// One timestamped sample for a single metric.
///
/// Several readings may share `read_time` when a plot carries more than one
/// sensor. `value` is `None` when the sensor reported a null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub read_time: DateTime<Utc>,
    pub value: Option<f64>,
    pub sensor_id: String,
}

/// A row of the moisture readings table.
#[derive(Debug, Clone, PartialEq)]
pub struct MoistureRow {
    pub read_time: DateTime<Utc>,
    pub soil_moisture: Option<f64>,
    pub sensor_id: String,
}

/// A row of the nutrient (NPK) readings table.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientRow {
    pub read_time: DateTime<Utc>,
    pub nitrogen: Option<f64>,
    pub phosphorus: Option<f64>,
    pub potassium: Option<f64>,
    pub sensor_id: String,
}

/// A single pump run. `time_stopped` is `None` while irrigation is running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationLogEntry {
    pub time_started: DateTime<Utc>,
    pub time_stopped: Option<DateTime<Utc>>,
    pub plot_id: String,
    pub mac_address: Option<String>,
}

/// An irrigation run from the user-wide history, labelled with its plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationHistoryEntry {
    pub plot_name: String,
    #[serde(flatten)]
    pub log: IrrigationLogEntry,
}

// ---------------------------------------------------------------------------
// Plot metadata
// ---------------------------------------------------------------------------

/// Crop assigned to a plot, with the optimal bounds for each metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserCrop {
    pub crop_name: String,
    pub category: String,
    pub moisture_min: Option<f64>,
    pub moisture_max: Option<f64>,
    pub nitrogen_min: Option<f64>,
    pub nitrogen_max: Option<f64>,
    pub phosphorus_min: Option<f64>,
    pub phosphorus_max: Option<f64>,
    pub potassium_min: Option<f64>,
    pub potassium_max: Option<f64>,
}

impl UserCrop {
    /// The `(min, max)` bounds configured for `metric`, if both are present.
    pub fn bounds(&self, metric: Metric) -> Option<(f64, f64)> {
        let (min, max) = match metric {
            Metric::Moisture => (self.moisture_min, self.moisture_max),
            Metric::Nitrogen => (self.nitrogen_min, self.nitrogen_max),
            Metric::Phosphorus => (self.phosphorus_min, self.phosphorus_max),
            Metric::Potassium => (self.potassium_min, self.potassium_max),
        };
        Some((min?, max?))
    }
}

/// A mapped land area with an assigned crop and soil type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plot {
    pub plot_id: String,
    pub plot_name: String,
    pub soil_type: Option<String>,
    pub is_valve_on: Option<bool>,
    pub polygons: Option<String>,
    pub user_crop: Option<UserCrop>,
}

/// Everything the analytics endpoint returns for one plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotAnalytics {
    pub plot: Plot,
    pub moisture_readings: Vec<MoistureRow>,
    pub nutrient_readings: Vec<NutrientRow>,
    pub irrigation_logs: Vec<IrrigationLogEntry>,
}

impl PlotAnalytics {
    /// Projects the table rows onto a single metric's reading series, in the
    /// order the service returned them.
    pub fn readings_for(&self, metric: Metric) -> Vec<Reading> {
        match metric {
            Metric::Moisture => self
                .moisture_readings
                .iter()
                .map(|row| Reading {
                    read_time: row.read_time,
                    value: row.soil_moisture,
                    sensor_id: row.sensor_id.clone(),
                })
                .collect(),
            _ => self
                .nutrient_readings
                .iter()
                .map(|row| Reading {
                    read_time: row.read_time,
                    value: match metric {
                        Metric::Nitrogen => row.nitrogen,
                        Metric::Phosphorus => row.phosphorus,
                        _ => row.potassium,
                    },
                    sensor_id: row.sensor_id.clone(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// AI analysis
// ---------------------------------------------------------------------------

/// Whether an analysis entry is a daily or a weekly summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cadence {
    Daily,
    Weekly,
}

impl FromStr for Cadence {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            other => Err(PlotError::ParseError(format!("unknown analysis type '{}'", other))),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Daily => write!(f, "Daily"),
            Cadence::Weekly => write!(f, "Weekly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub findings: String,
    pub predictions: String,
    pub recommendations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warnings {
    pub drought_risks: String,
    pub nutrient_imbalances: String,
}

/// One AI-generated analysis of a plot. Produced offline and read-only here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisEntry {
    pub analysis_date: DateTime<Utc>,
    pub analysis_type: Cadence,
    pub language: String,
    pub status: String,
    pub headline: String,
    pub short_summary: String,
    /// `None` when the payload carried no summary object at all.
    pub summary: Option<AnalysisSummary>,
    pub warnings: Warnings,
}

/// The condensed "latest analysis" card for a plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiSummary {
    pub headline: Option<String>,
    pub short_summary: Option<String>,
    pub analysis_date: Option<DateTime<Utc>>,
    pub language: String,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub sensor_id: String,
    #[serde(default)]
    pub sensor_name: String,
    #[serde(default)]
    pub sensor_category: String,
    #[serde(default)]
    pub plot_id: String,
}

/// Sensor category name → number of sensors on the plot.
pub type SensorCounts = BTreeMap<String, usize>;

/// The user's field controller (transmitter board).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub mac_address: Option<String>,
    pub device_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A row of the user's plot list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotListing {
    pub plot_id: String,
    pub plot_name: String,
    pub user_crop: Option<UserCrop>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching, decoding or deriving plot data.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotError {
    /// Non-2xx HTTP response from the query service.
    HttpError(u16),
    /// The request never produced a response (connect failure, timeout).
    Transport(String),
    /// The configured base URL cannot be turned into an endpoint URL.
    InvalidUrl(String),
    /// The response body could not be decoded into the data model.
    ParseError(String),
    /// An operation needed a plot id and none is selected.
    NoPlotSelected,
    /// A custom range whose end precedes its start.
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// A range token other than 1D, 1W, 1M, 3M or custom.
    InvalidRange(String),
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotError::HttpError(code) => write!(f, "HTTP error: {}", code),
            PlotError::Transport(msg) => write!(f, "Request failed: {}", msg),
            PlotError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            PlotError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PlotError::NoPlotSelected => write!(f, "No plot selected"),
            PlotError::InvalidWindow { start, end } => {
                write!(f, "Invalid window: end {} is before start {}", end, start)
            }
            PlotError::InvalidRange(token) => write!(f, "Invalid range token: {}", token),
        }
    }
}

impl std::error::Error for PlotError {}

impl From<reqwest::Error> for PlotError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => PlotError::HttpError(status.as_u16()),
            None if err.is_decode() => PlotError::ParseError(err.to_string()),
            None => PlotError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PlotError {
    fn from(err: serde_json::Error) -> Self {
        PlotError::ParseError(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
