//! Column layout shared by the row-oriented backends (file and sheet).
//!
//! A layout is read from the header row so older data with different
//! column names (`date,hours,type,person`) still loads.

use crate::models::Event;
use chrono::{DateTime, Utc};

/// Header written to new files.
pub const DEFAULT_HEADER: [&str; 5] = ["date", "measure", "category", "subject", "logged_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Measure,
    Category,
    Subject,
    LoggedAt,
    Other,
}

impl Column {
    fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "date" | "occurred_at" => Column::Date,
            "measure" | "hours" | "ml" | "amount" => Column::Measure,
            "category" | "type" => Column::Category,
            "subject" | "person" | "who" => Column::Subject,
            "logged_at" | "timestamp" => Column::LoggedAt,
            _ => Column::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    columns: Vec<Column>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::from_header(&DEFAULT_HEADER)
    }
}

impl Layout {
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Self {
        Self {
            columns: header.iter().map(|h| Column::from_name(h.as_ref())).collect(),
        }
    }

    /// Whether `cells` looks like a header row rather than data.
    ///
    /// A header names a date column somewhere; data rows never hold the word.
    pub fn is_header<S: AsRef<str>>(cells: &[S]) -> bool {
        cells
            .iter()
            .any(|c| Column::from_name(c.as_ref()) == Column::Date)
    }

    pub fn has_date(&self) -> bool {
        self.columns.contains(&Column::Date)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Build an event from one data row.
    ///
    /// The date stays raw; only the measure is checked here since an
    /// unreadable number cannot be carried in the event.
    pub fn parse_row<S: AsRef<str>>(&self, cells: &[S]) -> Result<Event, String> {
        let mut event = Event {
            occurred_at: String::new(),
            measure: None,
            category: String::new(),
            subject: None,
            logged_at: None,
        };

        for (column, cell) in self.columns.iter().zip(cells) {
            let cell = cell.as_ref().trim();
            match column {
                Column::Date => event.occurred_at = cell.to_string(),
                Column::Measure if !cell.is_empty() => {
                    let value = cell
                        .parse::<f64>()
                        .map_err(|_| format!("unreadable measure '{}'", cell))?;
                    event.measure = Some(value);
                }
                Column::Category => event.category = cell.to_string(),
                Column::Subject if !cell.is_empty() => event.subject = Some(cell.to_string()),
                Column::LoggedAt if !cell.is_empty() => {
                    event.logged_at = DateTime::parse_from_rfc3339(cell)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc));
                }
                _ => {}
            }
        }

        Ok(event)
    }

    /// Render an event in this layout's column order.
    pub fn render_row(&self, event: &Event) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| match column {
                Column::Date => event.occurred_at.clone(),
                Column::Measure => event.measure.map(|m| m.to_string()).unwrap_or_default(),
                Column::Category => event.category.clone(),
                Column::Subject => event.subject.clone().unwrap_or_default(),
                Column::LoggedAt => event
                    .logged_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                Column::Other => String::new(),
            })
            .collect()
    }
}
