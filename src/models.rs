//! Data models for the tracker.
//!
//! This module contains the core data structures shared by the stores,
//! the aggregation pipeline and the chart renderer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single logged occurrence: one sleep session or one feed.
///
/// Events are created once by `log` and never mutated. The date is kept
/// as the raw text the store handed back; the pipeline decides whether
/// it parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Calendar date the event happened on (raw text from the store).
    pub occurred_at: String,
    /// Hours slept or millilitres fed. Absent counts as zero.
    #[serde(default)]
    pub measure: Option<f64>,
    /// Category label (e.g. "Sleep", "Nap", "Bottle").
    pub category: String,
    /// Which tracked person the event belongs to, if the tracker has subjects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// When the event was recorded, distinct from `occurred_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_at: Option<DateTime<Utc>>,
}

/// Date formats accepted from stores, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

impl Event {
    /// Create a new event dated `date`.
    pub fn new(
        date: NaiveDate,
        measure: f64,
        category: impl Into<String>,
        subject: Option<String>,
    ) -> Self {
        Self {
            occurred_at: date.format("%Y-%m-%d").to_string(),
            measure: Some(measure),
            category: category.into(),
            subject,
            logged_at: None,
        }
    }

    /// Set the time the event was recorded.
    pub fn with_logged_at(mut self, logged_at: DateTime<Utc>) -> Self {
        self.logged_at = Some(logged_at);
        self
    }

    /// Parse `occurred_at` into a calendar date, or `None` if it cannot be read.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.occurred_at)
    }

    /// The usable measure: absent is zero, negative or non-finite is unusable.
    pub fn measure_value(&self) -> Option<f64> {
        match self.measure {
            None => Some(0.0),
            Some(v) if v.is_finite() && v >= 0.0 => Some(v),
            Some(_) => None,
        }
    }
}

/// Parse the date portion of a stored date or timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Which tracker this deployment is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Sleep tracker for one or two people (hours).
    #[default]
    Sleep,
    /// Baby-feeding tracker (millilitres).
    Feeding,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Sleep => write!(f, "sleep"),
            Variant::Feeding => write!(f, "feeding"),
        }
    }
}

/// The secondary axis of an aggregated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Subject,
    Category,
}

impl GroupBy {
    /// The label this dimension takes for `event`, if it has one.
    pub fn key<'a>(&self, event: &'a Event) -> Option<&'a str> {
        match self {
            GroupBy::Subject => event.subject.as_deref(),
            GroupBy::Category => Some(event.category.as_str()),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::Subject => write!(f, "subject"),
            GroupBy::Category => write!(f, "category"),
        }
    }
}

/// Restricts the pipeline to one subject, or lets everyone through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubjectFilter {
    #[default]
    All,
    Only(String),
}

impl SubjectFilter {
    /// Parse user text. `all_label` (e.g. "Both") and "all" select everyone.
    pub fn parse(text: &str, all_label: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case(all_label) || text.eq_ignore_ascii_case("all")
        {
            SubjectFilter::All
        } else {
            SubjectFilter::Only(text.to_string())
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        match self {
            SubjectFilter::All => true,
            SubjectFilter::Only(name) => event.subject.as_deref() == Some(name.as_str()),
        }
    }
}

impl fmt::Display for SubjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectFilter::All => write!(f, "all"),
            SubjectFilter::Only(name) => write!(f, "{}", name),
        }
    }
}

/// Bounds for the numeric input of `log`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl MeasureBounds {
    /// Check a value against the range and the step grid.
    pub fn validate(&self, value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err("Measure must be a finite number".to_string());
        }
        if value < self.min || value > self.max {
            return Err(format!(
                "Measure must be between {} and {}",
                self.min, self.max
            ));
        }
        if self.step > 0.0 {
            let steps = (value - self.min) / self.step;
            if (steps - steps.round()).abs() > 1e-9 {
                return Err(format!("Measure must be a multiple of {}", self.step));
            }
        }
        Ok(())
    }
}

/// Inclusive range for the recency-window control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRange {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl WindowRange {
    pub fn contains(&self, days: u32) -> bool {
        (self.min..=self.max).contains(&days)
    }
}
