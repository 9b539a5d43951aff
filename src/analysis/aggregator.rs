//! Time-windowed aggregation of the event log.
//!
//! Turns a flat event stream into a rectangular day × group table of
//! summed measures, most recent day first, ready for the chart renderer.

use crate::analysis::labels::day_label;
use crate::models::{Event, GroupBy, SubjectFilter};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Parameters of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationParams {
    /// Trailing window in days; the cutoff is the start of `today - window_days`.
    pub window_days: u32,
    pub subject_filter: SubjectFilter,
    pub group_by: GroupBy,
}

/// Result of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Nothing survived filtering; callers show a message instead of a chart.
    NoData,
    Table(DailyTable),
}

/// One day of the table. `values[i]` belongs to `DailyTable::columns[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub label: String,
    pub values: Vec<f64>,
}

impl DailyRow {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Rectangular day × group table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTable {
    /// Group labels, sorted.
    pub columns: Vec<String>,
    /// Days, most recent first.
    pub rows: Vec<DailyRow>,
}

impl DailyTable {
    /// Look up the value for a day label and group label.
    #[cfg(test)]
    pub fn get(&self, label: &str, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.label == label)
            .and_then(|r| r.values.get(idx).copied())
    }

    /// Largest single cell.
    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(|r| r.values.iter().copied())
            .fold(0.0, f64::max)
    }

    /// Largest row total (the tallest stacked bar).
    pub fn max_total(&self) -> f64 {
        self.rows.iter().map(DailyRow::total).fold(0.0, f64::max)
    }
}

/// An event that passed the window and subject filters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Windowed<'a> {
    pub date: NaiveDate,
    pub measure: f64,
    pub event: &'a Event,
}

/// Keep events dated within `[today - window_days, today]` that match the
/// subject filter and carry a usable measure.
///
/// Unparseable dates and malformed measures are dropped, never reported.
pub(crate) fn filter_window<'a>(
    events: &'a [Event],
    window_days: u32,
    subject_filter: &SubjectFilter,
    today: NaiveDate,
) -> Vec<Windowed<'a>> {
    let cutoff = today - Duration::days(i64::from(window_days));

    let mut bad_date = 0usize;
    let mut bad_measure = 0usize;
    let mut outside = 0usize;
    let mut other_subject = 0usize;

    let mut kept = Vec::new();
    for event in events {
        if !subject_filter.matches(event) {
            other_subject += 1;
            continue;
        }

        let date = match event.date() {
            Some(d) => d,
            None => {
                bad_date += 1;
                continue;
            }
        };

        if date < cutoff || date > today {
            outside += 1;
            continue;
        }

        let measure = match event.measure_value() {
            Some(m) => m,
            None => {
                bad_measure += 1;
                continue;
            }
        };

        kept.push(Windowed {
            date,
            measure,
            event,
        });
    }

    debug!(
        "Window {}..={}: kept {}, dropped {} (subject), {} (date), {} (outside), {} (measure)",
        cutoff,
        today,
        kept.len(),
        other_subject,
        bad_date,
        outside,
        bad_measure
    );

    kept
}

/// Run the aggregation pipeline over `events` as of `today`.
pub fn aggregate(events: &[Event], params: &AggregationParams, today: NaiveDate) -> Aggregation {
    let windowed = filter_window(events, params.window_days, &params.subject_filter, today);

    // Keyed by date, not label, so rows sort chronologically.
    let mut sums: BTreeMap<NaiveDate, BTreeMap<&str, f64>> = BTreeMap::new();
    let mut columns: BTreeSet<&str> = BTreeSet::new();
    let mut ungrouped = 0usize;

    for item in &windowed {
        let key = match params.group_by.key(item.event) {
            Some(k) => k,
            None => {
                ungrouped += 1;
                continue;
            }
        };
        columns.insert(key);
        *sums.entry(item.date).or_default().entry(key).or_insert(0.0) += item.measure;
    }

    if ungrouped > 0 {
        debug!("{} events had no {} and were left out", ungrouped, params.group_by);
    }

    if sums.is_empty() {
        return Aggregation::NoData;
    }

    let columns: Vec<String> = columns.into_iter().map(String::from).collect();
    let rows = sums
        .into_iter()
        .rev()
        .map(|(date, groups)| DailyRow {
            date,
            label: day_label(date),
            values: columns
                .iter()
                .map(|c| groups.get(c.as_str()).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    Aggregation::Table(DailyTable { columns, rows })
}
