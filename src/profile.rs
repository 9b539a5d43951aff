//! Tracker profiles.
//!
//! A profile bundles everything that differs between the sleep tracker
//! and the feeding tracker: vocabulary, input bounds, window range and
//! how the chart is drawn.

use crate::models::{GroupBy, MeasureBounds, Variant, WindowRange};

/// Fixed palette for the two-category feeding chart.
pub const FEEDING_PALETTE: [&str; 2] = ["#1f77b4", "#ff7f0e"];

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub variant: Variant,
    /// Unit shown next to measures ("hours", "ml").
    pub unit: String,
    pub categories: Vec<String>,
    /// Empty when the tracker has no subjects.
    pub subjects: Vec<String>,
    /// Subject-filter label meaning "everyone".
    pub all_label: String,
    pub bounds: MeasureBounds,
    pub window: WindowRange,
    pub group_by: GroupBy,
    pub stacked: bool,
    pub y_label: String,
    /// Chart title; `{days}` is replaced by the window length.
    pub title: String,
    pub palette: Vec<String>,
}

impl Profile {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Sleep => Self {
                variant,
                unit: "hours".to_string(),
                categories: vec!["Sleep".to_string(), "Nap".to_string()],
                subjects: vec!["Lloyd".to_string(), "Georgia".to_string()],
                all_label: "Both".to_string(),
                bounds: MeasureBounds {
                    min: 0.0,
                    max: 24.0,
                    step: 0.25,
                },
                window: WindowRange {
                    min: 3,
                    max: 60,
                    default: 7,
                },
                group_by: GroupBy::Subject,
                stacked: false,
                y_label: "Hours slept".to_string(),
                title: "Sleep in last {days} days".to_string(),
                palette: Vec::new(),
            },
            Variant::Feeding => Self {
                variant,
                unit: "ml".to_string(),
                categories: vec!["Bottle".to_string(), "Formula".to_string()],
                subjects: Vec::new(),
                all_label: "All".to_string(),
                bounds: MeasureBounds {
                    min: 0.0,
                    max: 1000.0,
                    step: 10.0,
                },
                window: WindowRange {
                    min: 1,
                    max: 30,
                    default: 7,
                },
                group_by: GroupBy::Category,
                stacked: true,
                y_label: "Millilitres fed".to_string(),
                title: "Feeds in last {days} days".to_string(),
                palette: FEEDING_PALETTE.iter().map(|c| c.to_string()).collect(),
            },
        }
    }

    pub fn has_subjects(&self) -> bool {
        !self.subjects.is_empty()
    }

    pub fn chart_title(&self, days: u32) -> String {
        self.title.replace("{days}", &days.to_string())
    }

    /// Resolve a category name case-insensitively to its configured spelling.
    pub fn resolve_category(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }

    /// Resolve a subject name case-insensitively to its configured spelling.
    pub fn resolve_subject(&self, name: &str) -> Option<&str> {
        self.subjects
            .iter()
            .find(|s| s.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }
}
