//! Chart and summary rendering.

pub mod chart;
pub mod summary;

pub use chart::{
    format_measure, generate_json_chart, generate_markdown_chart, generate_text_chart, ChartSpec,
};
pub use summary::{generate_json_averages, generate_markdown_averages, generate_text_averages};
