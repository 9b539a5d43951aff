//! Chart rendering.
//!
//! Draws an aggregated table as terminal bars, a Markdown table, or JSON
//! for an external chart renderer.

use crate::analysis::{Aggregation, DailyRow, DailyTable};
use crate::profile::Profile;
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

/// Message shown instead of an empty chart.
pub const NO_DATA_MESSAGE: &str = "No data to display.";

/// Width of the longest bar in terminal output.
const BAR_WIDTH: usize = 40;

/// Glyphs used for the segments of a stacked bar, cycled per column.
const STACK_GLYPHS: [char; 4] = ['█', '▓', '▒', '░'];

/// Axis and title metadata for a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub y_label: String,
    pub unit: String,
    pub stacked: bool,
    pub palette: Vec<String>,
}

impl ChartSpec {
    pub fn from_profile(profile: &Profile, days: u32) -> Self {
        Self {
            title: profile.chart_title(days),
            y_label: profile.y_label.clone(),
            unit: profile.unit.clone(),
            stacked: profile.stacked,
            palette: profile.palette.clone(),
        }
    }

    /// Colour for column `idx`, if a palette is configured.
    fn color(&self, idx: usize) -> Option<String> {
        if self.palette.is_empty() {
            None
        } else {
            Some(self.palette[idx % self.palette.len()].clone())
        }
    }
}

/// Format a measure without trailing zeros ("8", "7.5", "0.25").
pub fn format_measure(value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn bar_len(value: f64, scale: f64) -> usize {
    if scale <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / scale) * BAR_WIDTH as f64).round() as usize
}

/// Render a terminal bar chart.
pub fn generate_text_chart(result: &Aggregation, spec: &ChartSpec) -> String {
    let mut output = String::new();
    output.push_str(&spec.title);
    output.push('\n');
    output.push_str(&"=".repeat(spec.title.chars().count()));
    output.push_str("\n\n");

    let table = match result {
        Aggregation::NoData => {
            output.push_str(NO_DATA_MESSAGE);
            output.push('\n');
            return output;
        }
        Aggregation::Table(table) => table,
    };

    if spec.stacked {
        output.push_str(&generate_stacked_rows(table, spec));
    } else {
        output.push_str(&generate_grouped_rows(table, spec));
    }

    output.push_str(&format!("\n({})\n", spec.y_label));
    output
}

fn generate_grouped_rows(table: &DailyTable, spec: &ChartSpec) -> String {
    let mut section = String::new();
    let scale = table.max_value();
    let name_width = table.columns.iter().map(|c| c.chars().count()).max().unwrap_or(0);

    for row in &table.rows {
        section.push_str(&row.label);
        section.push('\n');
        for (column, value) in table.columns.iter().zip(&row.values) {
            section.push_str(&format!(
                "  {:<width$} {} {} {}\n",
                column,
                "█".repeat(bar_len(*value, scale)),
                format_measure(*value),
                spec.unit,
                width = name_width
            ));
        }
    }

    section
}

fn generate_stacked_rows(table: &DailyTable, spec: &ChartSpec) -> String {
    let mut section = String::new();
    let scale = table.max_total();
    let label_width = table.rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);

    // Legend
    let legend: Vec<String> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} {}", STACK_GLYPHS[i % STACK_GLYPHS.len()], c))
        .collect();
    section.push_str(&legend.join("   "));
    section.push_str("\n\n");

    for row in &table.rows {
        let mut bar = String::new();
        for (i, value) in row.values.iter().enumerate() {
            let glyph = STACK_GLYPHS[i % STACK_GLYPHS.len()];
            bar.extend(std::iter::repeat(glyph).take(bar_len(*value, scale)));
        }
        section.push_str(&format!(
            "{:<width$} {} {} {}\n",
            row.label,
            bar,
            format_measure(row.total()),
            spec.unit,
            width = label_width
        ));
    }

    section
}

/// Render the table as Markdown.
pub fn generate_markdown_chart(result: &Aggregation, spec: &ChartSpec) -> String {
    let mut output = String::new();
    output.push_str(&format!("## {}\n\n", spec.title));

    let table = match result {
        Aggregation::NoData => {
            output.push_str(NO_DATA_MESSAGE);
            output.push('\n');
            return output;
        }
        Aggregation::Table(table) => table,
    };

    output.push_str("| Day |");
    for column in &table.columns {
        output.push_str(&format!(" {} |", column));
    }
    output.push_str(" **Total** |\n");

    output.push_str("|:---|");
    for _ in &table.columns {
        output.push_str("---:|");
    }
    output.push_str("---:|\n");

    for row in &table.rows {
        output.push_str(&format!("| {} |", row.label));
        for value in &row.values {
            output.push_str(&format!(" {} |", format_measure(*value)));
        }
        output.push_str(&format!(" **{}** |\n", format_measure(row.total())));
    }

    output.push_str(&format!("\n*{} ({})*\n", spec.y_label, spec.unit));
    output
}

#[derive(Debug, Serialize)]
struct JsonColumn {
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonRow<'a> {
    label: &'a str,
    date: NaiveDate,
    values: &'a [f64],
    total: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JsonChart<'a> {
    NoData {
        title: &'a str,
        message: &'a str,
    },
    Table {
        title: &'a str,
        y_label: &'a str,
        unit: &'a str,
        stacked: bool,
        columns: Vec<JsonColumn>,
        rows: Vec<JsonRow<'a>>,
    },
}

fn json_row(row: &DailyRow) -> JsonRow<'_> {
    JsonRow {
        label: &row.label,
        date: row.date,
        values: &row.values,
        total: row.total(),
    }
}

/// Render the table as JSON for an external renderer.
pub fn generate_json_chart(result: &Aggregation, spec: &ChartSpec) -> Result<String> {
    let chart = match result {
        Aggregation::NoData => JsonChart::NoData {
            title: &spec.title,
            message: NO_DATA_MESSAGE,
        },
        Aggregation::Table(table) => JsonChart::Table {
            title: &spec.title,
            y_label: &spec.y_label,
            unit: &spec.unit,
            stacked: spec.stacked,
            columns: table
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| JsonColumn {
                    label: c.clone(),
                    color: spec.color(i),
                })
                .collect(),
            rows: table.rows.iter().map(json_row).collect(),
        },
    };

    serde_json::to_string_pretty(&chart).map_err(Into::into)
}
