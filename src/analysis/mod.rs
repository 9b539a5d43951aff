//! Analysis modules.
//!
//! Everything here is a pure function of the loaded event stream.

pub mod aggregator;
pub mod labels;
pub mod recency;
pub mod rolling;

pub use aggregator::{aggregate, Aggregation, AggregationParams, DailyRow, DailyTable};
pub use recency::since_last;
pub use rolling::{rolling_average, GroupAverage, ROLLING_WINDOW_DAYS};
