//! Remote spreadsheet backend using a values API.
//!
//! Appends go through the `:append` endpoint one row at a time; the sheet
//! is never cleared and rewritten.

use crate::models::Event;
use crate::store::error::{StoreError, StoreResult};
use crate::store::layout::Layout;
use crate::store::{check_status, HttpSettings, RecordStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Spreadsheet location.
#[derive(Debug, Clone)]
pub struct SheetTarget {
    pub base_url: String,
    pub spreadsheet_id: String,
    /// A1 range covering the data columns, e.g. `Sheet1!A:E`.
    pub range: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct AppendBody {
    values: Vec<Vec<String>>,
}

pub struct SheetStore {
    target: SheetTarget,
    settings: HttpSettings,
    client: reqwest::Client,
}

impl SheetStore {
    pub fn new(target: SheetTarget, settings: HttpSettings) -> StoreResult<Self> {
        let client = settings.build_client()?;
        Ok(Self::with_client(target, settings, client))
    }

    pub fn with_client(target: SheetTarget, settings: HttpSettings, client: reqwest::Client) -> Self {
        Self {
            target,
            settings,
            client,
        }
    }

    fn values_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.target.base_url.trim_end_matches('/'),
            self.target.spreadsheet_id,
            self.target.range
        )
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Turn the sheet's rows into events. A leading header row picks the layout.
fn rows_to_events(rows: Vec<Vec<Value>>) -> Vec<Event> {
    let mut rows = rows
        .into_iter()
        .map(|r| r.iter().map(cell_text).collect::<Vec<String>>())
        .peekable();

    let layout = match rows.peek() {
        Some(first) if Layout::is_header(first) => {
            let layout = Layout::from_header(first);
            rows.next();
            layout
        }
        _ => Layout::default(),
    };

    let mut events = Vec::new();
    for (idx, mut cells) in rows.enumerate() {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        // Trailing empty cells are omitted by the API.
        if cells.len() < layout.len() {
            cells.resize(layout.len(), String::new());
        }
        match layout.parse_row(&cells) {
            Ok(event) => events.push(event),
            Err(e) => warn!("Skipping sheet row {}: {}", idx + 1, e),
        }
    }
    events
}

#[async_trait]
impl RecordStore for SheetStore {
    async fn append(&self, event: &Event) -> StoreResult<()> {
        let url = format!("{}:append", self.values_url());
        let body = AppendBody {
            values: vec![Layout::default().render_row(event)],
        };

        let request = self
            .client
            .post(&url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body);
        let response = self.settings.authorize(request).send().await?;
        check_status(response).await?;

        debug!("Appended row to spreadsheet {}", self.target.spreadsheet_id);
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<Event>> {
        let url = self.values_url();
        let spinner = self.settings.spinner("Loading spreadsheet...");

        let request = self.client.get(&url);
        let result = async {
            let response = check_status(self.settings.authorize(request).send().await?).await?;
            response
                .json::<ValueRange>()
                .await
                .map_err(|e| StoreError::Malformed(format!("spreadsheet response: {}", e)))
        }
        .await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let events = rows_to_events(result?.values);
        info!("Loaded {} events from spreadsheet", events.len());
        Ok(events)
    }

    fn describe(&self) -> String {
        format!(
            "spreadsheet {} ({})",
            self.target.spreadsheet_id, self.target.range
        )
    }
}
