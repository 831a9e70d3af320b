/// Irrigation log grouping and list pagination.
///
/// Groups the flat irrigation log for a plot into one row per calendar day
/// (in the viewer's timezone) and slices grouped or history lists into
/// pages. All of it runs over data already fetched for the plot; the query
/// service does no paging.

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::IrrigationLogEntry;

// ---------------------------------------------------------------------------
// Per-day grouping
// ---------------------------------------------------------------------------

/// Number of irrigation runs started on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

impl DayCount {
    /// Long US-style label, e.g. "May 3, 2024".
    pub fn label(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}

/// Groups logs by the calendar date of `time_started` in `tz`, most recent
/// day first.
pub fn group_by_calendar_day<Tz: TimeZone>(
    logs: &[IrrigationLogEntry],
    tz: &Tz,
) -> Vec<DayCount> {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for log in logs {
        let day = log.time_started.with_timezone(tz).date_naive();
        *by_day.entry(day).or_insert(0) += 1;
    }
    by_day
        .into_iter()
        .rev()
        .map(|(date, count)| DayCount { date, count })
        .collect()
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Rows per page. Lists start compact and can be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Density {
    Compact,
    Expanded,
}

impl Density {
    pub fn page_size(self) -> usize {
        match self {
            Density::Compact => 5,
            Density::Expanded => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
}

/// The `page`-th (1-based) slice of `items`. Pages past the end, and page
/// 0, are empty.
pub fn paginate<T>(items: &[T], density: Density, page: usize) -> Page<'_, T> {
    let size = density.page_size();
    let total_pages = items.len().div_ceil(size);
    let start = page.saturating_sub(1).saturating_mul(size);
    let slice = if page == 0 || start >= items.len() {
        &items[0..0]
    } else {
        &items[start..items.len().min(start + size)]
    };
    Page {
        items: slice,
        page,
        total_pages,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
