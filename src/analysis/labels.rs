//! Human-readable day labels used as chart axis ticks.

use chrono::{Datelike, NaiveDate};

/// English ordinal suffix for a day of the month.
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Label a calendar date, e.g. "Wednesday 10th January 2024".
///
/// Depends on the date alone, so every event on one day gets the same label.
pub fn day_label(date: NaiveDate) -> String {
    format!(
        "{} {}{} {}",
        date.format("%A"),
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B %Y")
    )
}
