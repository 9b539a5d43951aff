//! In-process store used by tests.

use crate::models::Event;
use crate::store::error::StoreResult;
use crate::store::RecordStore;
use async_trait::async_trait;
use std::sync::Mutex;

/// Store backed by a `Vec<Event>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<Event>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(&self, event: &Event) -> StoreResult<()> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event.clone());
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<Event>> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        Ok(events.clone())
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_append_and_load() {
        let store = MemoryStore::new();
        let event = Event::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), 1.0, "Nap", None);

        tokio_test::block_on(store.append(&event)).unwrap();
        tokio_test::block_on(store.append(&event)).unwrap();

        let loaded = tokio_test::block_on(store.load_all()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], event);
    }

    #[test]
    fn test_with_events() {
        let event = Event::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), 1.0, "Nap", None);
        let store = MemoryStore::with_events(vec![event.clone()]);
        let loaded = tokio_test::block_on(store.load_all()).unwrap();
        assert_eq!(loaded, vec![event]);
    }
}
