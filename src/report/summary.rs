//! Rendering for the rolling-average list.

use crate::analysis::{GroupAverage, ROLLING_WINDOW_DAYS};
use crate::report::chart::{format_measure, NO_DATA_MESSAGE};
use anyhow::Result;
use serde::Serialize;

pub fn averages_title() -> String {
    format!("Average per day, last {} days", ROLLING_WINDOW_DAYS)
}

/// Lowest average first.
pub fn generate_text_averages(averages: Option<&[GroupAverage]>, unit: &str) -> String {
    let mut output = String::new();
    let title = averages_title();
    output.push_str(&title);
    output.push('\n');
    output.push_str(&"=".repeat(title.len()));
    output.push_str("\n\n");

    let averages = match averages {
        Some(a) => a,
        None => {
            output.push_str(NO_DATA_MESSAGE);
            output.push('\n');
            return output;
        }
    };

    let width = averages.iter().map(|a| a.label.chars().count()).max().unwrap_or(0);
    for avg in averages {
        output.push_str(&format!(
            "{:<width$}  {} {} ({} {})\n",
            avg.label,
            format_measure(avg.mean),
            unit,
            avg.days,
            if avg.days == 1 { "day" } else { "days" },
            width = width
        ));
    }

    output
}

pub fn generate_markdown_averages(averages: Option<&[GroupAverage]>, unit: &str) -> String {
    let mut output = format!("## {}\n\n", averages_title());

    let averages = match averages {
        Some(a) => a,
        None => {
            output.push_str(NO_DATA_MESSAGE);
            output.push('\n');
            return output;
        }
    };

    output.push_str(&format!("| Group | Mean ({}) | Days |\n", unit));
    output.push_str("|:---|---:|---:|\n");
    for avg in averages {
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            avg.label,
            format_measure(avg.mean),
            avg.days
        ));
    }
    output
}

#[derive(Debug, Serialize)]
struct JsonAverages<'a> {
    title: String,
    unit: &'a str,
    window_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    averages: Option<&'a [GroupAverage]>,
    no_data: bool,
}

pub fn generate_json_averages(averages: Option<&[GroupAverage]>, unit: &str) -> Result<String> {
    let doc = JsonAverages {
        title: averages_title(),
        unit,
        window_days: ROLLING_WINDOW_DAYS,
        averages,
        no_data: averages.is_none(),
    };
    serde_json::to_string_pretty(&doc).map_err(Into::into)
}
