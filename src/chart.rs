//! Chart-ready series.
//!
//! Maps filtered reading series onto the category/value arrays the charting
//! widget consumes. Everything is `Serialize` so the binary can hand the
//! result straight to a frontend as JSON.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::analysis::change::{ChangeBasis, ChangeMetric, change_metric};
use crate::metrics::{DEFAULT_SERIES_COLOR, metric_info};
use crate::model::{Metric, MoistureRow, NutrientRow, Reading};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub color: &'static str,
    pub unit: &'static str,
    /// x-axis timestamps, ascending.
    pub categories: Vec<DateTime<Utc>>,
    /// One value per category.
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A detailed single-metric chart with its header change figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedChart {
    pub metric: Metric,
    /// Readings-table field the series is drawn from.
    pub data_key: &'static str,
    pub series: ChartSeries,
    pub y_axis: (f64, f64),
    pub change: ChangeMetric,
}

/// Builds the detailed chart for `metric` from a window-filtered series.
///
/// `filtered` must come from `window::filter_by_range`, so every reading
/// has a value and the series is ascending. The header change is the
/// window trend.
pub fn detailed_chart(metric: Metric, filtered: &[Reading]) -> DetailedChart {
    let info = metric_info(metric);
    let (categories, values): (Vec<_>, Vec<_>) = filtered
        .iter()
        .filter_map(|r| r.value.map(|v| (r.read_time, v)))
        .unzip();
    DetailedChart {
        metric,
        data_key: info.data_key,
        series: ChartSeries {
            name: info.title.to_string(),
            color: info.color,
            unit: info.unit,
            categories,
            values,
        },
        y_axis: info.y_axis,
        change: change_metric(filtered, ChangeBasis::WindowTrend),
    }
}

/// The soil overview chart: moisture plus the mean of N, P and K.
///
/// Each series keeps its own timestamps, ascending. Nutrient rows missing
/// any of the three values are left out of the mean series.
pub fn soil_overview(moisture: &[MoistureRow], nutrients: &[NutrientRow]) -> Vec<ChartSeries> {
    let mut moisture: Vec<(DateTime<Utc>, f64)> = moisture
        .iter()
        .filter_map(|row| row.soil_moisture.map(|v| (row.read_time, v)))
        .collect();
    moisture.sort_by_key(|(t, _)| *t);

    let mut npk: Vec<(DateTime<Utc>, f64)> = nutrients
        .iter()
        .filter_map(|row| {
            let (n, p, k) = (row.nitrogen?, row.phosphorus?, row.potassium?);
            Some((row.read_time, (n + p + k) / 3.0))
        })
        .collect();
    npk.sort_by_key(|(t, _)| *t);

    let moisture_info = metric_info(Metric::Moisture);
    let (m_categories, m_values): (Vec<_>, Vec<_>) = moisture.into_iter().unzip();
    let (n_categories, n_values): (Vec<_>, Vec<_>) = npk.into_iter().unzip();
    vec![
        ChartSeries {
            name: "Moisture".to_string(),
            color: moisture_info.color,
            unit: moisture_info.unit,
            categories: m_categories,
            values: m_values,
        },
        ChartSeries {
            name: "Nutrients".to_string(),
            color: DEFAULT_SERIES_COLOR,
            unit: "%",
            categories: n_categories,
            values: n_values,
        },
    ]
}

/// Tooltip timestamp in the viewer's timezone, e.g. "03 May 2024 2:05 PM".
pub fn format_tooltip_time<Tz: TimeZone>(t: DateTime<Utc>, tz: &Tz) -> String {
    t.with_timezone(tz)
        .naive_local()
        .format("%d %b %Y %-I:%M %p")
        .to_string()
}
