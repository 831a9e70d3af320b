/// Metric registry for the plot dashboard.
///
/// Defines every chartable soil metric along with the payload field it is
/// read from, its display title, unit and chart colour. Chart and card code
/// looks metrics up here rather than hardcoding field names or colours.

use crate::model::Metric;

/// Colour for series that are not a single registry metric.
pub const DEFAULT_SERIES_COLOR: &str = "#134F14";

/// Display metadata for one metric.
pub struct MetricInfo {
    pub metric: Metric,
    /// Field name in the readings table row.
    pub data_key: &'static str,
    pub title: &'static str,
    pub unit: &'static str,
    /// Hex colour for the chart series.
    pub color: &'static str,
    /// Fixed y-axis range for the detailed chart.
    pub y_axis: (f64, f64),
}

/// All metrics shown on the dashboard, in display order.
pub static METRIC_REGISTRY: &[MetricInfo] = &[
    MetricInfo {
        metric: Metric::Moisture,
        data_key: "soil_moisture",
        title: "Soil Moisture",
        unit: "%",
        color: "#1E88E5",
        y_axis: (0.0, 200.0),
    },
    MetricInfo {
        metric: Metric::Nitrogen,
        data_key: "readed_nitrogen",
        title: "Nitrogen",
        unit: " mg/kg",
        color: "#FFEB3B",
        y_axis: (0.0, 200.0),
    },
    MetricInfo {
        metric: Metric::Phosphorus,
        data_key: "readed_phosphorus",
        title: "Phosphorus",
        unit: " mg/kg",
        color: "#9C27B0",
        y_axis: (0.0, 200.0),
    },
    MetricInfo {
        metric: Metric::Potassium,
        data_key: "readed_potassium",
        title: "Potassium",
        unit: " mg/kg",
        color: "#E91E63",
        y_axis: (0.0, 200.0),
    },
];

/// Looks up a metric's metadata. Every `Metric` variant has an entry.
pub fn metric_info(metric: Metric) -> &'static MetricInfo {
    METRIC_REGISTRY
        .iter()
        .find(|m| m.metric == metric)
        .unwrap_or(&METRIC_REGISTRY[0])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
