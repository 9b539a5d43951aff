//! Record stores.
//!
//! Every backend exposes the same two operations: append one event and
//! load the whole stream. Callers never know which backend they talk to.

pub mod error;
pub mod file;
pub mod layout;
#[cfg(test)]
pub mod memory;
pub mod sheet;
pub mod table;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
#[cfg(test)]
pub use memory::MemoryStore;
pub use sheet::{SheetStore, SheetTarget};
pub use table::{TableStore, TableTarget};

use crate::config::{Backend, StoreConfig};
use crate::models::Event;
use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::info;

/// Append-only event log.
///
/// Guarantees:
/// - `append` either stores the event or returns an error; nothing is queued.
/// - `load_all` returns every stored event in backend order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store one event.
    async fn append(&self, event: &Event) -> StoreResult<()>;

    /// Load every stored event.
    async fn load_all(&self) -> StoreResult<Vec<Event>>;

    /// Short human-readable name of the backend.
    fn describe(&self) -> String;
}

/// Settings shared by the HTTP backends.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Bearer token sent with every request.
    pub token: Option<String>,
    pub timeout_seconds: u64,
    /// Show a spinner while loading.
    pub show_progress: bool,
    /// Upper bound on pages fetched by a paginated load.
    pub max_pages: usize,
}

impl HttpSettings {
    pub(crate) fn build_client(&self) -> StoreResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()
            .map_err(StoreError::from)
    }

    pub(crate) fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub(crate) fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Turn a non-success response into `StoreError::Http`.
///
/// Reads and writes both go through here.
pub(crate) async fn check_status(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Open the backend selected in the configuration.
pub fn open_store(config: &StoreConfig, show_progress: bool) -> Result<Box<dyn RecordStore>> {
    let settings = HttpSettings {
        token: config.token.clone(),
        timeout_seconds: config.timeout_seconds,
        show_progress,
        max_pages: config.table.max_pages,
    };

    let store: Box<dyn RecordStore> = match config.backend {
        Backend::File => Box::new(FileStore::new(&config.file.path)),
        Backend::Sheet => {
            let target = SheetTarget {
                base_url: config.sheet.base_url.clone(),
                spreadsheet_id: config
                    .sheet
                    .spreadsheet_id
                    .clone()
                    .context("store.sheet.spreadsheet_id is required for the sheet backend")?,
                range: config.sheet.range.clone(),
            };
            Box::new(SheetStore::new(target, settings).context("Failed to create HTTP client")?)
        }
        Backend::Table => {
            let target = TableTarget {
                base_url: config.table.base_url.clone(),
                base_id: config
                    .table
                    .base_id
                    .clone()
                    .context("store.table.base_id is required for the table backend")?,
                table: config.table.table.clone(),
            };
            Box::new(TableStore::new(target, settings).context("Failed to create HTTP client")?)
        }
    };

    info!("Using {}", store.describe());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_store() {
        let mut config = StoreConfig::default();
        config.file.path = "somewhere.csv".to_string();
        let store = open_store(&config, false).unwrap();
        assert_eq!(store.describe(), "file somewhere.csv");
    }

    #[test]
    fn test_open_sheet_requires_id() {
        let mut config = StoreConfig::default();
        config.backend = Backend::Sheet;
        assert!(open_store(&config, false).is_err());

        config.sheet.spreadsheet_id = Some("abc".to_string());
        let store = open_store(&config, false).unwrap();
        assert!(store.describe().contains("abc"));
    }

    #[test]
    fn test_open_table_requires_base() {
        let mut config = StoreConfig::default();
        config.backend = Backend::Table;
        assert!(open_store(&config, false).is_err());

        config.table.base_id = Some("app1".to_string());
        let store = open_store(&config, false).unwrap();
        assert_eq!(store.describe(), "table app1/events");
    }

    #[test]
    fn test_spinner_hidden_when_quiet() {
        let settings = HttpSettings {
            token: None,
            timeout_seconds: 1,
            show_progress: false,
            max_pages: 1,
        };
        assert!(settings.spinner("x").is_none());
    }
}
