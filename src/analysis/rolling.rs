//! Short trailing averages per group.

use crate::analysis::aggregator::filter_window;
use crate::models::{Event, GroupBy, SubjectFilter};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Trailing window used for the averages chart.
pub const ROLLING_WINDOW_DAYS: u32 = 5;

/// Mean daily total for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub label: String,
    pub mean: f64,
    /// Number of days with data that went into the mean.
    pub days: usize,
}

/// Per-group mean of daily sums over the last `ROLLING_WINDOW_DAYS` days.
///
/// Days without any event for a group do not count towards its mean.
/// Sorted ascending by mean. `None` when nothing is in the window.
pub fn rolling_average(
    events: &[Event],
    subject_filter: &SubjectFilter,
    group_by: GroupBy,
    today: NaiveDate,
) -> Option<Vec<GroupAverage>> {
    let windowed = filter_window(events, ROLLING_WINDOW_DAYS, subject_filter, today);

    let mut daily: BTreeMap<&str, HashMap<NaiveDate, f64>> = BTreeMap::new();
    for item in &windowed {
        if let Some(key) = group_by.key(item.event) {
            *daily.entry(key).or_default().entry(item.date).or_insert(0.0) += item.measure;
        }
    }

    if daily.is_empty() {
        return None;
    }

    let mut averages: Vec<GroupAverage> = daily
        .into_iter()
        .map(|(label, per_day)| {
            let days = per_day.len();
            let total: f64 = per_day.values().sum();
            GroupAverage {
                label: label.to_string(),
                mean: total / days as f64,
                days,
            }
        })
        .collect();

    averages.sort_by(|a, b| {
        a.mean
            .partial_cmp(&b.mean)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });

    Some(averages)
}
