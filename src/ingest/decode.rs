/// Query service payload decoding.
///
/// The service is a thin passthrough over the managed database, so payload
/// shapes drift: ids arrive as strings or numbers, joins arrive as an object
/// or a one-element array, and the AI analysis is stored either as a JSON
/// object or as a JSON-encoded string inside the row. Every shape is
/// normalized here so the rest of the crate only sees the data model.
///
/// # Failure policy
/// - A body that is not JSON, or lacks its top-level structure, is an error.
/// - A single malformed row or entry is skipped and logged; the rest of the
///   response still decodes.
/// - Missing text fields inside an otherwise valid entry get placeholder
///   text ("No findings", ...), matching what the service renders.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::logging::{self, Service};
use crate::model::{
    AiSummary, AnalysisEntry, AnalysisSummary, Cadence, Device, IrrigationHistoryEntry,
    IrrigationLogEntry, MoistureRow, NutrientRow, Plot, PlotAnalytics, PlotError, PlotListing,
    Sensor, SensorCounts, UserCrop, Warnings,
};

// ============================================================================
// Timestamps
// ============================================================================

/// Parses a timestamp as rendered by the service.
///
/// Accepts RFC 3339, the Postgres `timestamptz` text form
/// (`2024-05-01 12:00:00+00`), offset-less date-times (taken as UTC) and
/// bare dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, PlotError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| PlotError::ParseError(format!("unrecognized timestamp '{}'", s)))
}

// ============================================================================
// Lenient field helpers
// ============================================================================

/// Text from any JSON scalar or array of scalars; blank strings and objects
/// count as absent.
fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(text_of).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(text_of))
}

/// Numbers may arrive as JSON numbers or as numeric strings (Postgres
/// `numeric` columns).
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Some(true),
            "false" | "0" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Decodes each element of `rows` independently, dropping (and logging)
/// the ones that fail.
fn decode_rows<T, R>(
    rows: Vec<Value>,
    service: Service,
    plot_id: Option<&str>,
    what: &str,
    convert: impl Fn(R) -> Result<T, PlotError>,
) -> Vec<T>
where
    R: for<'de> Deserialize<'de>,
{
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| {
            serde_json::from_value::<R>(row)
                .map_err(PlotError::from)
                .and_then(&convert)
                .ok()
        })
        .collect();
    if decoded.len() < total {
        logging::warn(
            service,
            plot_id,
            &format!("skipped {} of {} malformed {}", total - decoded.len(), total, what),
        );
    }
    decoded
}

// ============================================================================
// Analytics (/plots/analytics)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawAnalytics {
    #[serde(alias = "plot_deets")]
    plot: Option<RawPlot>,
    #[serde(default)]
    moisture_readings: Option<Vec<Value>>,
    #[serde(default)]
    nutrient_readings: Option<Vec<Value>>,
    #[serde(default)]
    irrigation_logs: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawPlot {
    #[serde(default, deserialize_with = "lenient_id")]
    plot_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    plot_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    soil_type: Option<String>,
    #[serde(default, alias = "isValveOn", alias = "isValveOpen", deserialize_with = "lenient_bool")]
    is_valve_on: Option<bool>,
    #[serde(default)]
    polygons: Option<Value>,
    #[serde(default)]
    user_crops: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMoistureRow {
    read_time: String,
    #[serde(default, deserialize_with = "lenient_number")]
    soil_moisture: Option<f64>,
    #[serde(default, deserialize_with = "lenient_id")]
    sensor_id: String,
}

#[derive(Debug, Deserialize)]
struct RawNutrientRow {
    read_time: String,
    #[serde(default, alias = "nitrogen", deserialize_with = "lenient_number")]
    readed_nitrogen: Option<f64>,
    #[serde(default, alias = "phosphorus", deserialize_with = "lenient_number")]
    readed_phosphorus: Option<f64>,
    #[serde(default, alias = "potassium", deserialize_with = "lenient_number")]
    readed_potassium: Option<f64>,
    #[serde(default, deserialize_with = "lenient_id")]
    sensor_id: String,
}

#[derive(Debug, Deserialize)]
struct RawIrrigationLog {
    time_started: String,
    #[serde(default)]
    time_stopped: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    plot_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    mac_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUserCrop {
    #[serde(default, deserialize_with = "lenient_text")]
    crop_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    moisture_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    moisture_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    nitrogen_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    nitrogen_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    phosphorus_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    phosphorus_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    potassium_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    potassium_max: Option<f64>,
}

impl From<RawUserCrop> for UserCrop {
    fn from(raw: RawUserCrop) -> Self {
        UserCrop {
            crop_name: raw.crop_name.unwrap_or_default(),
            category: raw.category.unwrap_or_default(),
            moisture_min: raw.moisture_min,
            moisture_max: raw.moisture_max,
            nitrogen_min: raw.nitrogen_min,
            nitrogen_max: raw.nitrogen_max,
            phosphorus_min: raw.phosphorus_min,
            phosphorus_max: raw.phosphorus_max,
            potassium_min: raw.potassium_min,
            potassium_max: raw.potassium_max,
        }
    }
}

/// The joined crop. A malformed bound is dropped on its own; the rest of
/// the crop is kept.
fn user_crop(value: Option<Value>) -> Option<UserCrop> {
    first_joined::<RawUserCrop>(value).map(UserCrop::from)
}

/// A join that may come back as an object or a one-element array.
fn first_joined<T: for<'de> Deserialize<'de>>(value: Option<Value>) -> Option<T> {
    let value = match value? {
        Value::Array(items) => items.into_iter().next()?,
        Value::Null => return None,
        other => other,
    };
    serde_json::from_value(value).ok()
}

fn plot_from_raw(raw: RawPlot, requested_plot_id: &str) -> Plot {
    let polygons = match raw.polygons {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };
    Plot {
        plot_id: if raw.plot_id.is_empty() {
            requested_plot_id.to_string()
        } else {
            raw.plot_id
        },
        plot_name: raw.plot_name.unwrap_or_default(),
        soil_type: raw.soil_type,
        is_valve_on: raw.is_valve_on,
        polygons,
        user_crop: user_crop(raw.user_crops),
    }
}

fn irrigation_entry(row: RawIrrigationLog, plot_id: &str) -> Result<IrrigationLogEntry, PlotError> {
    Ok(IrrigationLogEntry {
        time_started: parse_timestamp(&row.time_started)?,
        // An unparsable stop time is treated as still running.
        time_stopped: row
            .time_stopped
            .as_deref()
            .and_then(|t| parse_timestamp(t).ok()),
        plot_id: if row.plot_id.is_empty() {
            plot_id.to_string()
        } else {
            row.plot_id
        },
        mac_address: row.mac_address,
    })
}

#[derive(Debug, Deserialize)]
struct RawPlotBody {
    #[serde(alias = "plot_deets")]
    plot: Option<RawPlot>,
}

/// Decodes the single-plot metadata response (`{"plot": {...}}`).
pub fn decode_plot(body: &str, plot_id: &str) -> Result<Plot, PlotError> {
    let raw: RawPlotBody = serde_json::from_str(body)?;
    raw.plot
        .map(|p| plot_from_raw(p, plot_id))
        .ok_or_else(|| PlotError::ParseError(format!("no plot {} in response", plot_id)))
}

/// Decodes the analytics response for `plot_id`.
///
/// Missing reading arrays decode as empty. Irrigation rows without a
/// `plot_id` are attributed to `plot_id`.
pub fn decode_analytics(body: &str, plot_id: &str) -> Result<PlotAnalytics, PlotError> {
    let raw: RawAnalytics = serde_json::from_str(body)?;
    let plot = raw
        .plot
        .map(|p| plot_from_raw(p, plot_id))
        .ok_or_else(|| PlotError::ParseError("analytics response has no plot".to_string()))?;

    let moisture_readings = decode_rows(
        raw.moisture_readings.unwrap_or_default(),
        Service::Analytics,
        Some(plot_id),
        "moisture readings",
        |row: RawMoistureRow| {
            Ok(MoistureRow {
                read_time: parse_timestamp(&row.read_time)?,
                soil_moisture: row.soil_moisture,
                sensor_id: row.sensor_id,
            })
        },
    );

    let nutrient_readings = decode_rows(
        raw.nutrient_readings.unwrap_or_default(),
        Service::Analytics,
        Some(plot_id),
        "nutrient readings",
        |row: RawNutrientRow| {
            Ok(NutrientRow {
                read_time: parse_timestamp(&row.read_time)?,
                nitrogen: row.readed_nitrogen,
                phosphorus: row.readed_phosphorus,
                potassium: row.readed_potassium,
                sensor_id: row.sensor_id,
            })
        },
    );

    let irrigation_logs = decode_rows(
        raw.irrigation_logs.unwrap_or_default(),
        Service::Analytics,
        Some(plot_id),
        "irrigation logs",
        |row: RawIrrigationLog| irrigation_entry(row, plot_id),
    );

    Ok(PlotAnalytics {
        plot,
        moisture_readings,
        nutrient_readings,
        irrigation_logs,
    })
}

#[derive(Debug, Deserialize)]
struct RawIrrigationHistory {
    logs: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawHistoryLog {
    #[serde(default, deserialize_with = "lenient_text")]
    plot_name: Option<String>,
    #[serde(flatten)]
    log: RawIrrigationLog,
}

/// Decodes the user-wide irrigation history (`{"logs": [...]}`). Rows
/// without a plot id cannot be attributed and are dropped.
pub fn decode_irrigation_history(body: &str) -> Result<Vec<IrrigationHistoryEntry>, PlotError> {
    let raw: RawIrrigationHistory = serde_json::from_str(body)?;
    Ok(decode_rows(
        raw.logs.unwrap_or_default(),
        Service::Inventory,
        None,
        "irrigation history rows",
        |row: RawHistoryLog| {
            if row.log.plot_id.is_empty() {
                return Err(PlotError::ParseError("irrigation row has no plot".to_string()));
            }
            Ok(IrrigationHistoryEntry {
                plot_name: row.plot_name.unwrap_or_default(),
                log: irrigation_entry(row.log, "")?,
            })
        },
    ))
}

// ============================================================================
// AI history (/plots/ai-history)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawHistoryBody {
    Wrapped { history: Option<Vec<Value>> },
    Bare(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct RawHistoryEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    language_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    analysis_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    analysis_date: Option<String>,
    #[serde(default)]
    analysis: Option<Value>,
}

/// The analysis column, as stored or as reshaped by the service.
#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default, deserialize_with = "lenient_text")]
    analysis_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    headline: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    short_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    language_type: Option<String>,
    #[serde(default, rename = "AI_Analysis")]
    ai_analysis: Option<RawAiAnalysis>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAiAnalysis {
    #[serde(default, deserialize_with = "lenient_text")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    headline: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    short_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    language_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    status: Option<String>,
    #[serde(default)]
    summary: Option<RawSummary>,
    #[serde(default)]
    warnings: Option<RawWarnings>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSummary {
    #[serde(default, deserialize_with = "lenient_text")]
    findings: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    predictions: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    recommendations: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWarnings {
    #[serde(default, deserialize_with = "lenient_text")]
    drought_risks: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    nutrient_imbalances: Option<String>,
}

/// Unwraps the analysis column. A JSON-encoded string is parsed; anything
/// unparsable yields an empty payload rather than an error.
fn payload_of(value: Option<Value>) -> RawPayload {
    let value = match value {
        Some(Value::String(encoded)) => serde_json::from_str::<Value>(&encoded).ok(),
        other => other,
    };
    value
        .and_then(|v| serde_json::from_value::<RawPayload>(v).ok())
        .unwrap_or_default()
}

fn history_entry(raw: RawHistoryEntry) -> Result<AnalysisEntry, PlotError> {
    let payload = payload_of(raw.analysis);
    let ai = payload.ai_analysis.unwrap_or_default();

    let date = raw
        .analysis_date
        .or(payload.analysis_date)
        .or(ai.date)
        .ok_or_else(|| PlotError::ParseError("analysis entry has no date".to_string()))?;
    let analysis_type: Cadence = raw
        .analysis_type
        .ok_or_else(|| PlotError::ParseError("analysis entry has no type".to_string()))?
        .parse()?;

    let warnings = ai.warnings.unwrap_or_default();
    Ok(AnalysisEntry {
        analysis_date: parse_timestamp(&date)?,
        analysis_type,
        language: raw
            .language_type
            .or(payload.language_type)
            .or(ai.language_type)
            .unwrap_or_else(|| "unknown".to_string()),
        status: ai.status.unwrap_or_else(|| "unknown".to_string()),
        headline: payload
            .headline
            .or(ai.headline)
            .unwrap_or_else(|| "No headline".to_string()),
        short_summary: payload
            .short_summary
            .or(ai.short_summary)
            .unwrap_or_else(|| "No summary".to_string()),
        summary: ai.summary.map(|s| AnalysisSummary {
            findings: s.findings.unwrap_or_else(|| "No findings".to_string()),
            predictions: s.predictions.unwrap_or_else(|| "No predictions".to_string()),
            recommendations: s
                .recommendations
                .unwrap_or_else(|| "No recommendations".to_string()),
        }),
        warnings: Warnings {
            drought_risks: warnings
                .drought_risks
                .unwrap_or_else(|| "No drought risks".to_string()),
            nutrient_imbalances: warnings
                .nutrient_imbalances
                .unwrap_or_else(|| "No nutrient imbalance".to_string()),
        },
    })
}

/// Decodes an AI history response. Accepts `{"history": [...]}` or a bare
/// array. Entries without a parsable date or a Daily/Weekly type are
/// dropped.
pub fn decode_ai_history(body: &str, plot_id: Option<&str>) -> Result<Vec<AnalysisEntry>, PlotError> {
    let rows = match serde_json::from_str::<RawHistoryBody>(body)? {
        RawHistoryBody::Wrapped { history } => history.unwrap_or_default(),
        RawHistoryBody::Bare(rows) => rows,
    };
    Ok(decode_rows(
        rows,
        Service::AiHistory,
        plot_id,
        "analysis entries",
        history_entry,
    ))
}

// ============================================================================
// AI summary (/plots/ai-summary)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawAiSummary {
    #[serde(default, deserialize_with = "lenient_text")]
    headline: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    short_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    analysis_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    language_type: Option<String>,
}

/// Decodes the summary card. `short_summary` and the older `summary` field
/// are treated as the same thing; an unparsable date is dropped.
pub fn decode_ai_summary(body: &str) -> Result<AiSummary, PlotError> {
    let raw: RawAiSummary = serde_json::from_str(body)?;
    Ok(AiSummary {
        headline: raw.headline,
        short_summary: raw.short_summary.or(raw.summary),
        analysis_date: raw.analysis_date.and_then(|d| parse_timestamp(&d).ok()),
        language: raw.language_type.unwrap_or_else(|| "unknown".to_string()),
    })
}

// ============================================================================
// Inventory (/plots/sensor-count, /plots/get-user-sensors, /plots/user-device,
// /plots/get-plots)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawSensorCounts {
    #[serde(rename = "sensorCounts", alias = "sensor_counts")]
    sensor_counts: BTreeMap<String, Value>,
}

/// Decodes `{"sensorCounts": {"NPK Sensor": 2, ...}}`. Non-numeric counts
/// are dropped.
pub fn decode_sensor_counts(body: &str) -> Result<SensorCounts, PlotError> {
    let raw: RawSensorCounts = serde_json::from_str(body)?;
    Ok(raw
        .sensor_counts
        .into_iter()
        .filter_map(|(category, count)| {
            count
                .as_u64()
                .and_then(|c| usize::try_from(c).ok())
                .map(|c| (category, c))
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RawSensor {
    #[serde(default, deserialize_with = "lenient_id")]
    sensor_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    sensor_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    sensor_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    plot_id: String,
}

fn sensor_from_raw(raw: RawSensor) -> Result<Sensor, PlotError> {
    if raw.sensor_id.is_empty() {
        return Err(PlotError::ParseError("sensor has no id".to_string()));
    }
    Ok(Sensor {
        sensor_id: raw.sensor_id,
        sensor_name: raw.sensor_name.unwrap_or_default(),
        sensor_category: raw.sensor_category.unwrap_or_else(|| "Unknown".to_string()),
        plot_id: raw.plot_id,
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSensorListing {
    ByPlot(BTreeMap<String, Vec<Value>>),
    Flat(Vec<Value>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSensorsBody {
    Wrapped { sensors: RawSensorListing },
    Bare(RawSensorListing),
}

/// Decodes the user's sensors, either grouped by plot id or as a flat list.
/// Grouped sensors without their own `plot_id` take the group's key.
pub fn decode_user_sensors(body: &str) -> Result<Vec<Sensor>, PlotError> {
    let listing = match serde_json::from_str::<RawSensorsBody>(body)? {
        RawSensorsBody::Wrapped { sensors } => sensors,
        RawSensorsBody::Bare(listing) => listing,
    };
    Ok(match listing {
        RawSensorListing::Flat(rows) => {
            decode_rows(rows, Service::Inventory, None, "sensors", sensor_from_raw)
        }
        RawSensorListing::ByPlot(groups) => groups
            .into_iter()
            .flat_map(|(plot_id, rows)| {
                decode_rows(rows, Service::Inventory, Some(plot_id.as_str()), "sensors", sensor_from_raw)
                    .into_iter()
                    .map(move |mut sensor| {
                        if sensor.plot_id.is_empty() {
                            sensor.plot_id = plot_id.clone();
                        }
                        sensor
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
    })
}

/// Decodes the user's controller device. `null`, `{}` and
/// `{"device": null}` all mean no device is registered.
pub fn decode_user_device(body: &str) -> Result<Option<Device>, PlotError> {
    let value: Value = serde_json::from_str(body)?;
    let device = match value {
        Value::Object(mut map) if map.contains_key("device") => map.remove("device"),
        Value::Object(map) if map.is_empty() => None,
        Value::Null => None,
        other => Some(other),
    };
    match device {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
    }
}

#[derive(Debug, Deserialize)]
struct RawPlotList {
    plots: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawPlotListing {
    #[serde(default, deserialize_with = "lenient_id")]
    plot_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    plot_name: Option<String>,
    #[serde(default)]
    user_crops: Option<Value>,
}

/// Decodes the user's plot list. A `null` list (the service's response for
/// a user with no plots) is empty.
pub fn decode_plot_list(body: &str) -> Result<Vec<PlotListing>, PlotError> {
    let raw: RawPlotList = serde_json::from_str(body)?;
    Ok(decode_rows(
        raw.plots.unwrap_or_default(),
        Service::Inventory,
        None,
        "plots",
        |row: RawPlotListing| {
            if row.plot_id.is_empty() {
                return Err(PlotError::ParseError("plot has no id".to_string()));
            }
            Ok(PlotListing {
                plot_id: row.plot_id,
                plot_name: row.plot_name.unwrap_or_default(),
                user_crop: user_crop(row.user_crops),
            })
        },
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metric;
    use chrono::TimeZone;

    // --- Timestamps ---------------------------------------------------------

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for s in [
            "2024-05-01T12:00:00Z",
            "2024-05-01T12:00:00.000+00:00",
            "2024-05-01T20:00:00+08:00",
            "2024-05-01 12:00:00+00",
            "2024-05-01T12:00:00",
            "2024-05-01 12:00:00.000",
        ] {
            assert_eq!(parse_timestamp(s), Ok(expected), "format {:?}", s);
        }
        assert_eq!(
            parse_timestamp("2024-05-01"),
            Ok(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-13-45T00:00:00Z").is_err());
    }

    // --- Analytics ----------------------------------------------------------

    const ANALYTICS: &str = r#"{
        "plot": {
            "plot_id": 7,
            "plot_name": "North Field",
            "soil_type": "Clay loam",
            "isValveOn": false,
            "polygons": [[14.6, 121.0], [14.7, 121.1]],
            "user_crops": [{"crop_name": "Rice", "category": "Cereal", "moisture_min": 40, "moisture_max": 80}]
        },
        "moisture_readings": [
            {"read_time": "2024-05-02T08:00:00+00:00", "soil_moisture": 55.5, "sensor_id": 11},
            {"read_time": "not a time", "soil_moisture": 50.0, "sensor_id": 11},
            {"read_time": "2024-05-01T08:00:00+00:00", "soil_moisture": null, "sensor_id": 11}
        ],
        "nutrient_readings": [
            {"read_time": "2024-05-02 08:00:00", "readed_nitrogen": "12.5", "readed_phosphorus": 8, "readed_potassium": 30, "sensor_id": "npk-1"}
        ],
        "irrigation_logs": [
            {"time_started": "2024-05-02T06:00:00Z", "time_stopped": null, "mac_address": "AA:BB"}
        ]
    }"#;

    #[test]
    fn test_decode_analytics_normalizes_shapes() {
        let a = decode_analytics(ANALYTICS, "7").expect("analytics should decode");
        assert_eq!(a.plot.plot_id, "7");
        assert_eq!(a.plot.is_valve_on, Some(false));
        assert!(a.plot.polygons.as_deref().unwrap().starts_with("[[14.6"));
        let crop = a.plot.user_crop.expect("joined crop should decode");
        assert_eq!(crop.crop_name, "Rice");
        assert_eq!(crop.bounds(crate::model::Metric::Moisture), Some((40.0, 80.0)));

        // The malformed timestamp row is skipped, the null value row is kept.
        assert_eq!(a.moisture_readings.len(), 2);
        assert_eq!(a.moisture_readings[0].sensor_id, "11");
        assert_eq!(a.moisture_readings[1].soil_moisture, None);

        assert_eq!(a.nutrient_readings[0].nitrogen, Some(12.5));
        assert_eq!(a.nutrient_readings[0].phosphorus, Some(8.0));

        let log = &a.irrigation_logs[0];
        assert_eq!(log.plot_id, "7", "missing plot_id defaults to the requested plot");
        assert_eq!(log.time_stopped, None);
    }

    #[test]
    fn test_decode_crop_bounds_field_by_field() {
        let body = r#"{
            "plot": {
                "plot_id": "7",
                "user_crops": {"crop_name": "Rice", "moisture_min": "40", "moisture_max": 80, "nitrogen_min": "lots", "nitrogen_max": 20}
            },
            "moisture_readings": [{"read_time": "2024-05-02T08:00:00Z", "soil_moisture": "55.5", "sensor_id": 11}]
        }"#;
        let a = decode_analytics(body, "7").unwrap();
        assert_eq!(a.moisture_readings[0].soil_moisture, Some(55.5));

        let crop = a.plot.user_crop.expect("crop kept despite string bounds");
        assert_eq!(crop.crop_name, "Rice");
        assert_eq!(crop.bounds(Metric::Moisture), Some((40.0, 80.0)));
        assert_eq!(crop.nitrogen_min, None);
        assert_eq!(crop.nitrogen_max, Some(20.0));
        assert_eq!(crop.bounds(Metric::Nitrogen), None);
    }

    #[test]
    fn test_decode_analytics_missing_arrays_are_empty() {
        let a = decode_analytics(r#"{"plot": {"plot_name": "South"}, "moisture_readings": null}"#, "p-2")
            .expect("should decode");
        assert_eq!(a.plot.plot_id, "p-2");
        assert!(a.moisture_readings.is_empty());
        assert!(a.nutrient_readings.is_empty());
        assert!(a.irrigation_logs.is_empty());
    }

    #[test]
    fn test_decode_analytics_requires_plot() {
        assert!(matches!(
            decode_analytics(r#"{"moisture_readings": []}"#, "p"),
            Err(PlotError::ParseError(_))
        ));
        assert!(decode_analytics("<html>502</html>", "p").is_err());
    }

    #[test]
    fn test_decode_single_plot() {
        let plot = decode_plot(
            r#"{"plot": {"plot_id": "p-3", "plot_name": "East", "isValveOpen": "true", "user_crops": null}}"#,
            "p-3",
        )
        .unwrap();
        assert_eq!(plot.plot_name, "East");
        assert_eq!(plot.is_valve_on, Some(true));
        assert_eq!(plot.user_crop, None);
        assert!(decode_plot(r#"{"plot": null}"#, "p-3").is_err());
    }

    #[test]
    fn test_decode_irrigation_history() {
        let body = r#"{"logs": [
            {"plot_id": 4, "plot_name": "West", "time_started": "2024-05-03T01:00:00Z", "time_stopped": "2024-05-03T01:20:00Z", "mac_address": "AA"},
            {"plot_name": "Orphan", "time_started": "2024-05-03T02:00:00Z"}
        ]}"#;
        let logs = decode_irrigation_history(body).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].plot_name, "West");
        assert_eq!(logs[0].log.plot_id, "4");
        assert!(logs[0].log.time_stopped.is_some());
    }

    // --- AI history ---------------------------------------------------------

    #[test]
    fn test_decode_history_reshaped_by_service() {
        let body = r#"{"history": [{
            "language_type": "en",
            "analysis_type": "Daily",
            "analysis": {
                "analysis_date": "2024-05-03T06:00:00+00:00",
                "headline": "Moisture dropping",
                "short_summary": "Irrigate soon.",
                "AI_Analysis": {
                    "date": "2024-05-03T06:00:00+00:00",
                    "status": "completed",
                    "summary": {"findings": "Down 12%", "predictions": "Stress", "recommendations": "Irrigate"},
                    "warnings": {"drought_risks": "High", "nutrient_imbalances": ""}
                }
            }
        }]}"#;
        let entries = decode_ai_history(body, Some("7")).expect("should decode");
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.analysis_type, Cadence::Daily);
        assert_eq!(e.language, "en");
        assert_eq!(e.headline, "Moisture dropping");
        assert_eq!(e.summary.as_ref().unwrap().findings, "Down 12%");
        assert_eq!(e.warnings.drought_risks, "High");
        assert_eq!(e.warnings.nutrient_imbalances, "No nutrient imbalance");
    }

    #[test]
    fn test_decode_history_raw_row_with_encoded_payload() {
        let payload = r#"{"AI_Analysis": {"headline": "Weekly wrap", "language_type": "tl", "summary": {"findings": ["N low", "K ok"]}}}"#;
        let body = serde_json::json!([{
            "analysis_date": "2024-05-05",
            "analysis_type": "weekly",
            "analysis": payload,
        }])
        .to_string();
        let entries = decode_ai_history(&body, None).expect("should decode");
        let e = &entries[0];
        assert_eq!(e.analysis_type, Cadence::Weekly);
        assert_eq!(e.language, "tl", "language falls back to the payload");
        assert_eq!(e.headline, "Weekly wrap");
        let summary = e.summary.as_ref().unwrap();
        assert_eq!(summary.findings, "N low\nK ok");
        assert_eq!(summary.predictions, "No predictions");
    }

    #[test]
    fn test_decode_history_fails_closed_per_entry() {
        let body = r#"{"history": [
            {"analysis_type": "Daily", "analysis": "{not json"},
            {"analysis_date": "2024-05-01", "analysis_type": "Monthly"},
            {"analysis_date": "2024-05-01", "analysis_type": "Daily", "analysis": "{not json"},
            42
        ]}"#;
        let entries = decode_ai_history(body, Some("7")).expect("envelope is valid");
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.summary, None, "unparsable payload has no summary");
        assert_eq!(e.headline, "No headline");
        assert_eq!(e.language, "unknown");
    }

    #[test]
    fn test_decode_history_null_history_is_empty() {
        assert!(decode_ai_history(r#"{"history": null}"#, None).unwrap().is_empty());
    }

    // --- AI summary ---------------------------------------------------------

    #[test]
    fn test_decode_summary_accepts_both_field_names() {
        let newer = decode_ai_summary(
            r#"{"headline": "Dry", "short_summary": "Water today", "language_type": "en"}"#,
        )
        .unwrap();
        let older = decode_ai_summary(
            r#"{"headline": "Dry", "summary": "Water today", "analysis_date": "2024-05-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(newer.short_summary.as_deref(), Some("Water today"));
        assert_eq!(older.short_summary.as_deref(), Some("Water today"));
        assert_eq!(older.language, "unknown");
        assert!(older.analysis_date.is_some());
    }

    // --- Inventory ----------------------------------------------------------

    #[test]
    fn test_decode_sensor_counts() {
        let counts =
            decode_sensor_counts(r#"{"sensorCounts": {"NPK Sensor": 2, "Moisture Sensor": 3, "Bad": "x"}}"#)
                .unwrap();
        assert_eq!(counts.get("NPK Sensor"), Some(&2));
        assert_eq!(counts.get("Moisture Sensor"), Some(&3));
        assert_eq!(counts.get("Bad"), None);
    }

    #[test]
    fn test_decode_user_sensors_grouped_by_plot() {
        let body = r#"{"sensors": {
            "p-1": [{"sensor_id": 1, "sensor_name": "NPK A", "sensor_category": "NPK Sensor"}],
            "p-2": [{"sensor_id": "m-9", "sensor_name": "Moist B", "sensor_category": "Moisture Sensor", "plot_id": "p-2"}, {"sensor_name": "no id"}]
        }}"#;
        let sensors = decode_user_sensors(body).unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].sensor_id, "1");
        assert_eq!(sensors[0].plot_id, "p-1");
        assert_eq!(sensors[1].sensor_category, "Moisture Sensor");
    }

    #[test]
    fn test_decode_user_sensors_flat() {
        let sensors = decode_user_sensors(r#"[{"sensor_id": "s1", "plot_id": "p"}]"#).unwrap();
        assert_eq!(sensors[0].sensor_category, "Unknown");
    }

    #[test]
    fn test_decode_user_device() {
        assert_eq!(decode_user_device("null").unwrap(), None);
        assert_eq!(decode_user_device(r#"{"device": null}"#).unwrap(), None);
        assert_eq!(decode_user_device("{}").unwrap(), None);
        let device = decode_user_device(r#"{"device": {"mac_address": "AA:BB", "firmware": "1.2"}}"#)
            .unwrap()
            .expect("device should be present");
        assert_eq!(device.mac_address.as_deref(), Some("AA:BB"));
        assert_eq!(device.extra.get("firmware"), Some(&Value::from("1.2")));
    }

    #[test]
    fn test_decode_plot_list() {
        let plots = decode_plot_list(
            r#"{"plots": [{"plot_id": "a", "plot_name": "A", "user_crops": {"crop_name": "Corn"}}, {"plot_name": "orphan"}]}"#,
        )
        .unwrap();
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].user_crop.as_ref().unwrap().crop_name, "Corn");
        assert!(decode_plot_list(r#"{"plots": null}"#).unwrap().is_empty());
    }
}
