//! Paginated REST table backend.
//!
//! Each record is a JSON object with a `fields` map. Loading follows the
//! `offset` cursor until the server stops returning one.

use crate::models::Event;
use crate::store::error::{StoreError, StoreResult};
use crate::store::{check_status, HttpSettings, RecordStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

const PAGE_SIZE: &str = "100";

/// Table location.
#[derive(Debug, Clone)]
pub struct TableTarget {
    pub base_url: String,
    pub base_id: String,
    pub table: String,
}

/// Field map of one table record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecordFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    measure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    logged_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableRecord {
    #[serde(default)]
    fields: RecordFields,
    #[serde(default, rename = "createdTime")]
    created_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TablePage {
    /// Decoded one at a time so a single bad record is skipped, not fatal.
    #[serde(default)]
    records: Vec<Value>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateBody {
    fields: RecordFields,
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<TableRecord> for Event {
    fn from(record: TableRecord) -> Self {
        let fields = record.fields;
        Event {
            occurred_at: fields.date.unwrap_or_default(),
            measure: fields.measure,
            category: fields.category.unwrap_or_default(),
            subject: fields.subject.filter(|s| !s.is_empty()),
            logged_at: parse_timestamp(fields.logged_at.as_deref())
                .or_else(|| parse_timestamp(record.created_time.as_deref())),
        }
    }
}

impl From<&Event> for RecordFields {
    fn from(event: &Event) -> Self {
        Self {
            date: Some(event.occurred_at.clone()),
            measure: event.measure,
            category: Some(event.category.clone()),
            subject: event.subject.clone(),
            logged_at: event.logged_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Convert raw records, skipping any whose fields have the wrong shape.
fn records_to_events(records: Vec<Value>) -> Vec<Event> {
    records
        .into_iter()
        .filter_map(|raw| {
            let id = raw.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
            match serde_json::from_value::<TableRecord>(raw) {
                Ok(record) => Some(Event::from(record)),
                Err(e) => {
                    warn!("Skipping table record {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

pub struct TableStore {
    target: TableTarget,
    settings: HttpSettings,
    client: reqwest::Client,
}

impl TableStore {
    pub fn new(target: TableTarget, settings: HttpSettings) -> StoreResult<Self> {
        let client = settings.build_client()?;
        Ok(Self::with_client(target, settings, client))
    }

    pub fn with_client(target: TableTarget, settings: HttpSettings, client: reqwest::Client) -> Self {
        Self {
            target,
            settings,
            client,
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/v0/{}/{}",
            self.target.base_url.trim_end_matches('/'),
            self.target.base_id,
            self.target.table
        )
    }

    async fn fetch_page(&self, offset: Option<&str>) -> StoreResult<TablePage> {
        let mut request = self
            .client
            .get(self.table_url())
            .query(&[("pageSize", PAGE_SIZE)]);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }

        let response = check_status(self.settings.authorize(request).send().await?).await?;
        response
            .json::<TablePage>()
            .await
            .map_err(|e| StoreError::Malformed(format!("table page: {}", e)))
    }

    async fn fetch_all(&self, spinner: Option<&indicatif::ProgressBar>) -> StoreResult<Vec<Event>> {
        let mut events = Vec::new();
        let mut offset: Option<String> = None;

        for page in 1..=self.settings.max_pages {
            let batch = self.fetch_page(offset.as_deref()).await?;
            debug!("Page {}: {} records", page, batch.records.len());
            events.extend(records_to_events(batch.records));

            if let Some(pb) = spinner {
                pb.set_message(format!("Fetched {} records", events.len()));
            }

            match batch.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => return Ok(events),
            }
        }

        warn!(
            "Stopped after {} pages; the table may have more records",
            self.settings.max_pages
        );
        Ok(events)
    }
}

#[async_trait]
impl RecordStore for TableStore {
    async fn append(&self, event: &Event) -> StoreResult<()> {
        let body = CreateBody {
            fields: RecordFields::from(event),
        };
        let request = self.client.post(self.table_url()).json(&body);
        check_status(self.settings.authorize(request).send().await?).await?;

        debug!("Created record in table {}", self.target.table);
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<Event>> {
        let spinner = self.settings.spinner("Loading table...");
        let result = self.fetch_all(spinner.as_ref()).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let events = result?;
        info!("Loaded {} events from table {}", events.len(), self.target.table);
        Ok(events)
    }

    fn describe(&self) -> String {
        format!("table {}/{}", self.target.base_id, self.target.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{serve, test_client};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn target(base_url: String) -> TableTarget {
        TableTarget {
            base_url,
            base_id: "app1".to_string(),
            table: "feeds".to_string(),
        }
    }

    fn settings(max_pages: usize) -> HttpSettings {
        HttpSettings {
            token: Some("tok".to_string()),
            timeout_seconds: 5,
            show_progress: false,
            max_pages,
        }
    }

    fn page(records: Value, offset: Option<&str>) -> String {
        match offset {
            Some(o) => json!({"records": records, "offset": o}).to_string(),
            None => json!({"records": records}).to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_follows_cursor() {
        let (base, log) = serve(|req| {
            if req.target.contains("offset=cursor2") {
                (
                    200,
                    page(
                        json!([{"id": "r3", "fields": {"date": "2024-01-12", "measure": 90, "category": "Formula"}}]),
                        None,
                    ),
                )
            } else if req.target.contains("offset=cursor1") {
                (
                    200,
                    page(
                        json!([{"id": "r2", "fields": {"date": "2024-01-11", "measure": 150, "category": "Bottle"}}]),
                        Some("cursor2"),
                    ),
                )
            } else {
                (
                    200,
                    page(
                        json!([{
                            "id": "r1",
                            "createdTime": "2024-01-10T07:30:00.000Z",
                            "fields": {"date": "2024-01-10", "measure": 120, "category": "Bottle"}
                        }]),
                        Some("cursor1"),
                    ),
                )
            }
        })
        .await;

        let store = TableStore::with_client(target(base), settings(10), test_client());
        let events = store.load_all().await.unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].measure, Some(120.0));
        assert_eq!(
            events[0].logged_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 10, 7, 30, 0).unwrap())
        );
        assert_eq!(events[2].category, "Formula");

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.method == "GET"));
        assert!(requests[0].target.starts_with("/v0/app1/feeds?"));
        assert!(!requests[0].target.contains("offset="));
        assert_eq!(requests[0].header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_load_skips_malformed_records() {
        let (base, _log) = serve(|_| {
            (
                200,
                page(
                    json!([
                        {"id": "r1", "fields": {"date": "2024-01-10", "measure": 120, "category": "Bottle"}},
                        {"id": "r2", "fields": {"date": "2024-01-11", "measure": 150, "category": "Formula"}},
                        {"id": "r3", "fields": {"date": "2024-01-12", "measure": "90", "category": "Bottle"}},
                        {"id": "r4", "fields": {"date": 20240112, "measure": 60, "category": "Bottle"}}
                    ]),
                    None,
                ),
            )
        })
        .await;

        let store = TableStore::with_client(target(base), settings(10), test_client());
        let events = store.load_all().await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].measure, Some(120.0));
        assert_eq!(events[1].category, "Formula");
    }

    #[test]
    fn test_records_to_events_keeps_good_records() {
        let records = vec![
            json!({"fields": {"date": "2024-01-10", "measure": 120, "category": "Bottle"}}),
            json!({"fields": {"measure": [1, 2]}}),
            json!({"fields": {"date": "2024-01-11", "category": "Formula"}}),
        ];
        let events = records_to_events(records);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].measure, None);
    }

    #[tokio::test]
    async fn test_load_stops_at_page_cap() {
        let (base, log) = serve(|_| {
            (
                200,
                page(
                    json!([{"fields": {"date": "2024-01-10", "measure": 1, "category": "Bottle"}}]),
                    Some("forever"),
                ),
            )
        })
        .await;

        let store = TableStore::with_client(target(base), settings(3), test_client());
        let events = store.load_all().await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_load_reports_http_error() {
        let (base, _log) = serve(|_| (500, "{\"error\":\"boom\"}".to_string())).await;
        let store = TableStore::with_client(target(base), settings(10), test_client());

        let err = store.load_all().await.unwrap_err();
        match err {
            StoreError::Http { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_append_posts_fields() {
        let (base, log) = serve(|_| (200, json!({"id": "rec1"}).to_string())).await;
        let store = TableStore::with_client(target(base), settings(10), test_client());

        let logged = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let event = Event::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), 120.0, "Bottle", None)
            .with_logged_at(logged);
        store.append(&event).await.unwrap();

        let requests = log.lock().unwrap();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/v0/app1/feeds");

        let body: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(
            body,
            json!({"fields": {
                "date": "2024-01-10",
                "measure": 120.0,
                "category": "Bottle",
                "logged_at": "2024-01-10T09:00:00+00:00"
            }})
        );
    }

    #[tokio::test]
    async fn test_append_failure_is_error() {
        let (base, _log) = serve(|_| (422, "{\"error\":\"INVALID\"}".to_string())).await;
        let store = TableStore::with_client(target(base), settings(10), test_client());

        let event = Event::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), 120.0, "Bottle", None);
        assert!(matches!(
            store.append(&event).await,
            Err(StoreError::Http { status: 422, .. })
        ));
    }
}
