/// Plot view state.
///
/// `PlotStore` holds everything fetched for the currently selected plot,
/// one `LoadState` per widget. Fetches go through tickets:
///
/// 1. `begin(widget)` issues a `FetchTicket` carrying the selected plot id
///    and a fresh request id, and marks the widget `Loading`.
/// 2. The caller runs the fetch however it likes.
/// 3. `apply_*(ticket, result)` stores the result only if the ticket is
///    still current: the same plot is selected and no newer ticket has been
///    issued for that widget. Anything else is discarded.
///
/// A response for plot A that lands after plot B was selected is therefore
/// never shown as plot B's data, no matter the order responses arrive in.

use std::collections::HashMap;
use std::fmt;

use crate::ingest::PlotSource;
use crate::logging::{self, Service};
use crate::model::{AiSummary, AnalysisEntry, PlotAnalytics, PlotError};

// ---------------------------------------------------------------------------
// Widget state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    NoPlotSelected,
    Loading,
    Ready(T),
    /// The fetch failed; the string is the label to show in its place.
    Unavailable(String),
}

impl<T> LoadState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// The independently fetched parts of the plot view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Widget {
    Analytics,
    AiHistory,
    AiSummary,
}

impl Widget {
    pub const ALL: [Widget; 3] = [Widget::Analytics, Widget::AiHistory, Widget::AiSummary];

    pub fn service(self) -> Service {
        match self {
            Widget::Analytics => Service::Analytics,
            Widget::AiHistory => Service::AiHistory,
            Widget::AiSummary => Service::AiSummary,
        }
    }

    /// Label shown in place of the widget when its fetch fails.
    pub fn unavailable_label(self) -> &'static str {
        match self {
            Widget::Analytics => "Plot data unavailable",
            Widget::AiHistory => "AI analysis history unavailable",
            Widget::AiSummary => "AI Summary Unavailable",
        }
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Widget::Analytics => write!(f, "analytics"),
            Widget::AiHistory => write!(f, "ai-history"),
            Widget::AiSummary => write!(f, "ai-summary"),
        }
    }
}

/// Identifies one in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub plot_id: String,
    pub request_id: u64,
    pub widget: Widget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The ticket was superseded; the store is unchanged.
    Discarded,
}

/// Outcome of `PlotStore::refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub applied: usize,
    pub failed: usize,
    pub discarded: usize,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PlotStore {
    selected: Option<String>,
    next_request_id: u64,
    latest_request: HashMap<Widget, u64>,
    analytics: LoadState<PlotAnalytics>,
    ai_history: LoadState<Vec<AnalysisEntry>>,
    ai_summary: LoadState<AiSummary>,
}

impl Default for PlotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotStore {
    pub fn new() -> Self {
        PlotStore {
            selected: None,
            next_request_id: 1,
            latest_request: HashMap::new(),
            analytics: LoadState::NoPlotSelected,
            ai_history: LoadState::NoPlotSelected,
            ai_summary: LoadState::NoPlotSelected,
        }
    }

    pub fn selected_plot(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn analytics(&self) -> &LoadState<PlotAnalytics> {
        &self.analytics
    }

    pub fn ai_history(&self) -> &LoadState<Vec<AnalysisEntry>> {
        &self.ai_history
    }

    pub fn ai_summary(&self) -> &LoadState<AiSummary> {
        &self.ai_summary
    }

    /// Selects `plot_id`. Every widget drops the previous plot's data and
    /// shows `Loading` until its next fetch is applied.
    pub fn select_plot(&mut self, plot_id: &str) {
        self.selected = Some(plot_id.to_string());
        self.analytics = LoadState::Loading;
        self.ai_history = LoadState::Loading;
        self.ai_summary = LoadState::Loading;
        logging::debug(Service::Store, Some(plot_id), "plot selected");
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.analytics = LoadState::NoPlotSelected;
        self.ai_history = LoadState::NoPlotSelected;
        self.ai_summary = LoadState::NoPlotSelected;
    }

    /// Issues a ticket for fetching `widget` for the selected plot.
    ///
    /// Fails with `NoPlotSelected` when there is nothing to fetch for; the
    /// caller should skip the request entirely.
    pub fn begin(&mut self, widget: Widget) -> Result<FetchTicket, PlotError> {
        let plot_id = self.selected.clone().ok_or(PlotError::NoPlotSelected)?;
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.latest_request.insert(widget, request_id);
        match widget {
            Widget::Analytics => self.analytics = LoadState::Loading,
            Widget::AiHistory => self.ai_history = LoadState::Loading,
            Widget::AiSummary => self.ai_summary = LoadState::Loading,
        }
        Ok(FetchTicket {
            plot_id,
            request_id,
            widget,
        })
    }

    /// Whether a response for `ticket` may still be shown.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.selected.as_deref() == Some(ticket.plot_id.as_str())
            && self.latest_request.get(&ticket.widget) == Some(&ticket.request_id)
    }

    fn resolve<T>(&self, ticket: &FetchTicket, expected: Widget, result: Result<T, PlotError>) -> Option<LoadState<T>> {
        if ticket.widget != expected || !self.is_current(ticket) {
            logging::debug(
                Service::Store,
                Some(&ticket.plot_id),
                &format!("discarded stale {} response #{}", ticket.widget, ticket.request_id),
            );
            return None;
        }
        Some(match result {
            Ok(value) => LoadState::Ready(value),
            Err(err) => {
                logging::log_fetch_failure(
                    ticket.widget.service(),
                    Some(&ticket.plot_id),
                    &format!("fetch {}", ticket.widget),
                    &err,
                );
                LoadState::Unavailable(ticket.widget.unavailable_label().to_string())
            }
        })
    }

    pub fn apply_analytics(
        &mut self,
        ticket: &FetchTicket,
        result: Result<PlotAnalytics, PlotError>,
    ) -> ApplyOutcome {
        match self.resolve(ticket, Widget::Analytics, result) {
            Some(state) => {
                self.analytics = state;
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Discarded,
        }
    }

    pub fn apply_ai_history(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<AnalysisEntry>, PlotError>,
    ) -> ApplyOutcome {
        match self.resolve(ticket, Widget::AiHistory, result) {
            Some(state) => {
                self.ai_history = state;
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Discarded,
        }
    }

    pub fn apply_ai_summary(
        &mut self,
        ticket: &FetchTicket,
        result: Result<AiSummary, PlotError>,
    ) -> ApplyOutcome {
        match self.resolve(ticket, Widget::AiSummary, result) {
            Some(state) => {
                self.ai_summary = state;
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Discarded,
        }
    }

    /// Fetches every widget for the selected plot from `source`.
    ///
    /// All tickets are issued before any fetch runs, as if the three
    /// requests were in flight together. Failed fetches still count as
    /// applied; they leave their widget `Unavailable`.
    pub fn refresh<S: PlotSource + ?Sized>(&mut self, source: &S) -> Result<RefreshSummary, PlotError> {
        let analytics = self.begin(Widget::Analytics)?;
        let history = self.begin(Widget::AiHistory)?;
        let summary = self.begin(Widget::AiSummary)?;
        let plot_id = analytics.plot_id.clone();

        let mut outcome = RefreshSummary {
            applied: 0,
            failed: 0,
            discarded: 0,
        };
        let mut tally = |applied: ApplyOutcome, failed: bool| match applied {
            ApplyOutcome::Applied if failed => outcome.failed += 1,
            ApplyOutcome::Applied => outcome.applied += 1,
            ApplyOutcome::Discarded => outcome.discarded += 1,
        };

        let result = source.fetch_analytics(&plot_id);
        let failed = result.is_err();
        tally(self.apply_analytics(&analytics, result), failed);

        let result = source.fetch_ai_history(&plot_id);
        let failed = result.is_err();
        tally(self.apply_ai_history(&history, result), failed);

        let result = source.fetch_ai_summary(&plot_id);
        let failed = result.is_err();
        tally(self.apply_ai_summary(&summary, result), failed);

        logging::log_refresh_summary(&plot_id, Widget::ALL.len(), outcome.applied, outcome.failed);
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
