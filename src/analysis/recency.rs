//! "Time since last event", derived from the loaded stream.

use crate::models::Event;
use chrono::{DateTime, Duration, Utc};

/// The most recent event and how long ago it was.
#[derive(Debug, Clone, PartialEq)]
pub struct LastEvent {
    pub event: Event,
    pub at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl LastEvent {
    pub fn describe(&self) -> String {
        humanize_elapsed(self.elapsed)
    }
}

/// When an event happened, as precisely as the record allows.
///
/// `logged_at` wins; otherwise midnight UTC of `occurred_at`.
fn event_instant(event: &Event) -> Option<DateTime<Utc>> {
    if let Some(logged_at) = event.logged_at {
        return Some(logged_at);
    }
    event
        .date()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Find the latest event in `events` relative to `now`.
pub fn since_last(events: &[Event], now: DateTime<Utc>) -> Option<LastEvent> {
    events
        .iter()
        .filter_map(|e| event_instant(e).map(|at| (at, e)))
        .max_by_key(|(at, _)| *at)
        .map(|(at, event)| LastEvent {
            event: event.clone(),
            at,
            elapsed: now - at,
        })
}

/// Render a duration as "3d 4h ago", "2h 15m ago", "12m ago" or "just now".
pub fn humanize_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }

    let days = minutes / (24 * 60);
    let hours = (minutes / 60) % 24;
    let mins = minutes % 60;

    if days > 0 {
        format!("{}d {}h ago", days, hours)
    } else if hours > 0 {
        format!("{}h {}m ago", hours, mins)
    } else {
        format!("{}m ago", mins)
    }
}
