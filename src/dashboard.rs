//! Plot dashboard view model.
//!
//! Composes the store's widget states into everything the plot page shows:
//! range-filtered detailed charts, the soil overview, sensor cards, the AI
//! summary and latest analysis, the analysis history and the irrigation
//! list. Building it never fails. Every panel is either `Ready` or a
//! `Message` naming why it is empty.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::alert::freshness::{self, AnalysisFreshness};
use crate::alert::thresholds::{RangeStatus, check_crop_range};
use crate::analysis::change::{ChangeBasis, ChangeMetric, change_metric};
use crate::analysis::groupings::{Density, group_by_calendar_day, paginate};
use crate::analysis::latest::{analysis_history, select_latest};
use crate::chart::{ChartSeries, DetailedChart, detailed_chart, format_tooltip_time, soil_overview};
use crate::metrics::metric_info;
use crate::model::{
    AiSummary, AnalysisEntry, Cadence, IrrigationHistoryEntry, Metric, PlotAnalytics, Reading,
};
use crate::store::{LoadState, PlotStore};
use crate::window::{RangeSelection, RangeToken, TimeWindow};

pub const SELECT_PLOT: &str = "Please select a plot to see AI insights.";
pub const LOADING: &str = "Loading...";
pub const SUMMARY_UNAVAILABLE: &str = "AI Summary Unavailable";
pub const NO_SUMMARY_DATA: &str = "No summary data found for this plot.";
pub const NO_ANALYSIS_TODAY: &str = "No analysis generated today";
pub const NO_IRRIGATION_LOGS: &str = "No irrigation logs found.";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// What the viewer is looking at. `now` is in the viewer's timezone, which
/// decides every calendar-day question.
#[derive(Debug, Clone)]
pub struct DashboardRequest<Tz: TimeZone> {
    pub range: RangeSelection<Tz>,
    pub language: String,
    pub cadence: Cadence,
    pub now: DateTime<Tz>,
    /// 1-based.
    pub history_page: usize,
    /// 1-based.
    pub irrigation_page: usize,
    pub density: Density,
}

impl<Tz: TimeZone> DashboardRequest<Tz> {
    pub fn new(now: DateTime<Tz>) -> Self {
        DashboardRequest {
            range: RangeSelection::Last(RangeToken::OneWeek),
            language: "en".to_string(),
            cadence: Cadence::Daily,
            now,
            history_page: 1,
            irrigation_page: 1,
            density: Density::Compact,
        }
    }
}

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Panel<T> {
    Ready(T),
    Message(String),
}

impl<T> Panel<T> {
    fn message(text: &str) -> Self {
        Panel::Message(text.to_string())
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            Panel::Message(_) => None,
        }
    }

    pub fn message_text(&self) -> Option<&str> {
        match self {
            Panel::Ready(_) => None,
            Panel::Message(text) => Some(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotHeader {
    pub plot_id: String,
    pub plot_name: String,
    pub soil_type: Option<String>,
    pub crop_name: Option<String>,
    pub is_valve_on: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeView {
    pub token: RangeToken,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Latest reading of one metric, compared with the sample before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorCard {
    pub metric: Metric,
    pub title: &'static str,
    pub unit: &'static str,
    pub read_time: Option<DateTime<Utc>>,
    /// `read_time` in the viewer's timezone, as the chart tooltips show it.
    pub read_time_label: Option<String>,
    pub change: ChangeMetric,
    pub change_display: Option<String>,
    /// Against the plot crop's optimal range, when the crop defines one.
    pub status: Option<RangeStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisCard {
    pub date_label: String,
    pub entry: AnalysisEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPage {
    pub entries: Vec<AnalysisCard>,
    pub page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationRow {
    pub date: NaiveDate,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationPanel {
    pub rows: Vec<IrrigationRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_runs: usize,
}

/// One run in the user-wide irrigation history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationRunRow {
    pub plot_id: String,
    pub plot_name: String,
    pub time_started: DateTime<Utc>,
    pub started_label: String,
    pub time_stopped: Option<DateTime<Utc>>,
    /// `None` while the run is still going.
    pub stopped_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationHistoryPage {
    pub rows: Vec<IrrigationRunRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_runs: usize,
    /// The compact list hides runs that expanding would show.
    pub can_expand: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotDashboard {
    pub plot_id: Option<String>,
    pub header: Panel<PlotHeader>,
    pub range: Panel<RangeView>,
    pub charts: Panel<Vec<DetailedChart>>,
    pub soil_overview: Panel<Vec<ChartSeries>>,
    pub sensor_cards: Panel<Vec<SensorCard>>,
    pub summary: Panel<AiSummary>,
    pub latest_analysis: Panel<AnalysisCard>,
    pub history: Panel<HistoryPage>,
    pub irrigation: Panel<IrrigationPanel>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

fn state_message<T>(state: &LoadState<T>) -> Option<&str> {
    match state {
        LoadState::NoPlotSelected => Some(SELECT_PLOT),
        LoadState::Loading => Some(LOADING),
        LoadState::Unavailable(label) => Some(label),
        LoadState::Ready(_) => None,
    }
}

/// Runs `f` on the ready value, or turns the state into its message.
fn with_state<T, U>(state: &LoadState<T>, f: impl FnOnce(&T) -> Panel<U>) -> Panel<U> {
    match state {
        LoadState::Ready(value) => f(value),
        other => Panel::message(state_message(other).unwrap_or(LOADING)),
    }
}

fn date_label<Tz: TimeZone>(t: DateTime<Utc>, tz: &Tz) -> String {
    t.with_timezone(tz).date_naive().format("%B %-d, %Y").to_string()
}

fn header(analytics: &PlotAnalytics) -> PlotHeader {
    let plot = &analytics.plot;
    PlotHeader {
        plot_id: plot.plot_id.clone(),
        plot_name: plot.plot_name.clone(),
        soil_type: plot.soil_type.clone(),
        crop_name: plot.user_crop.as_ref().map(|c| c.crop_name.clone()),
        is_valve_on: plot.is_valve_on,
    }
}

fn charts(analytics: &PlotAnalytics, window: &TimeWindow) -> Vec<DetailedChart> {
    Metric::ALL
        .iter()
        .map(|&metric| detailed_chart(metric, &window.filter(&analytics.readings_for(metric))))
        .collect()
}

/// Non-null readings in time order, over the whole fetched history.
fn present_sorted(mut readings: Vec<Reading>) -> Vec<Reading> {
    readings.retain(|r| r.value.is_some());
    readings.sort_by_key(|r| r.read_time);
    readings
}

fn sensor_cards<Tz: TimeZone>(analytics: &PlotAnalytics, tz: &Tz) -> Vec<SensorCard> {
    let crop = analytics.plot.user_crop.as_ref();
    Metric::ALL
        .iter()
        .map(|&metric| {
            let info = metric_info(metric);
            let series = present_sorted(analytics.readings_for(metric));
            let change = change_metric(&series, ChangeBasis::SampleOverSample);
            SensorCard {
                metric,
                title: info.title,
                unit: info.unit,
                read_time: series.last().map(|r| r.read_time),
                read_time_label: series.last().map(|r| format_tooltip_time(r.read_time, tz)),
                change_display: change.display(),
                status: check_crop_range(change.latest, crop, metric),
                change,
            }
        })
        .collect()
}

fn summary_panel(summary: &AiSummary) -> Panel<AiSummary> {
    if summary.headline.is_none() && summary.short_summary.is_none() {
        Panel::message(SUMMARY_UNAVAILABLE)
    } else {
        Panel::Ready(summary.clone())
    }
}

fn latest_panel<Tz: TimeZone>(entries: &[AnalysisEntry], request: &DashboardRequest<Tz>) -> Panel<AnalysisCard> {
    if entries.is_empty() {
        return Panel::message(NO_SUMMARY_DATA);
    }
    let latest = select_latest(entries, &request.language, request.cadence);
    match (freshness::classify(latest, &request.now), latest) {
        (AnalysisFreshness::Current, Some(entry)) => Panel::Ready(AnalysisCard {
            date_label: date_label(entry.analysis_date, &request.now.timezone()),
            entry: entry.clone(),
        }),
        _ => Panel::message(NO_ANALYSIS_TODAY),
    }
}

fn history_panel<Tz: TimeZone>(entries: &[AnalysisEntry], request: &DashboardRequest<Tz>) -> Panel<HistoryPage> {
    let history = analysis_history(entries, &request.language, request.cadence);
    if history.is_empty() {
        return Panel::message(NO_SUMMARY_DATA);
    }
    let tz = request.now.timezone();
    let page = paginate(&history, request.density, request.history_page);
    Panel::Ready(HistoryPage {
        entries: page
            .items
            .iter()
            .map(|entry| AnalysisCard {
                date_label: date_label(entry.analysis_date, &tz),
                entry: (*entry).clone(),
            })
            .collect(),
        page: page.page,
        total_pages: page.total_pages,
    })
}

fn irrigation_panel<Tz: TimeZone>(analytics: &PlotAnalytics, request: &DashboardRequest<Tz>) -> Panel<IrrigationPanel> {
    if analytics.irrigation_logs.is_empty() {
        return Panel::message(NO_IRRIGATION_LOGS);
    }
    let days = group_by_calendar_day(&analytics.irrigation_logs, &request.now.timezone());
    let page = paginate(&days, request.density, request.irrigation_page);
    Panel::Ready(IrrigationPanel {
        rows: page
            .items
            .iter()
            .map(|day| IrrigationRow {
                date: day.date,
                label: day.label(),
                count: day.count,
            })
            .collect(),
        page: page.page,
        total_pages: page.total_pages,
        total_runs: analytics.irrigation_logs.len(),
    })
}

/// Pages the irrigation runs across all of a user's plots, in the order
/// the service returned them. Times are labelled in `tz`.
pub fn irrigation_history_panel<Tz: TimeZone>(
    entries: &[IrrigationHistoryEntry],
    tz: &Tz,
    density: Density,
    page: usize,
) -> Panel<IrrigationHistoryPage> {
    if entries.is_empty() {
        return Panel::message(NO_IRRIGATION_LOGS);
    }
    let slice = paginate(entries, density, page);
    Panel::Ready(IrrigationHistoryPage {
        rows: slice
            .items
            .iter()
            .map(|entry| IrrigationRunRow {
                plot_id: entry.log.plot_id.clone(),
                plot_name: entry.plot_name.clone(),
                time_started: entry.log.time_started,
                started_label: format_tooltip_time(entry.log.time_started, tz),
                time_stopped: entry.log.time_stopped,
                stopped_label: entry.log.time_stopped.map(|t| format_tooltip_time(t, tz)),
            })
            .collect(),
        page: slice.page,
        total_pages: slice.total_pages,
        total_runs: entries.len(),
        can_expand: density == Density::Compact && entries.len() > Density::Compact.page_size(),
    })
}

/// Builds the dashboard for the store's selected plot.
pub fn build_dashboard<Tz: TimeZone>(store: &PlotStore, request: &DashboardRequest<Tz>) -> PlotDashboard {
    let now_utc = request.now.with_timezone(&Utc);
    let window = request.range.window(now_utc);
    let analytics = store.analytics();

    let (range, charts_panel) = match &window {
        Ok(w) => (
            Panel::Ready(RangeView {
                token: request.range.token(),
                start: w.start(),
                end: w.end(),
            }),
            with_state(analytics, |a| Panel::Ready(charts(a, w))),
        ),
        Err(err) => (Panel::Message(err.to_string()), Panel::Message(err.to_string())),
    };

    PlotDashboard {
        plot_id: store.selected_plot().map(String::from),
        header: with_state(analytics, |a| Panel::Ready(header(a))),
        range,
        charts: charts_panel,
        soil_overview: with_state(analytics, |a| {
            Panel::Ready(soil_overview(&a.moisture_readings, &a.nutrient_readings))
        }),
        sensor_cards: with_state(analytics, |a| Panel::Ready(sensor_cards(a, &request.now.timezone()))),
        summary: with_state(store.ai_summary(), summary_panel),
        latest_analysis: with_state(store.ai_history(), |entries| latest_panel(entries, request)),
        history: with_state(store.ai_history(), |entries| history_panel(entries, request)),
        irrigation: with_state(analytics, |a| irrigation_panel(a, request)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
