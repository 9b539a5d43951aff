//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sleeptrack.toml` files.

use crate::models::{GroupBy, Variant};
use crate::profile::Profile;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".sleeptrack.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which tracker and its vocabulary.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Where events are kept.
    #[serde(default)]
    pub store: StoreConfig,

    /// Chart defaults.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Tracker settings. Unset lists fall back to the variant's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// `sleep` or `feeding`.
    #[serde(default)]
    pub variant: Variant,

    /// Category vocabulary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// Tracked people. An empty list means the tracker has no subjects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,

    /// Label of the "everyone" subject filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_label: Option<String>,
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local delimited file.
    #[default]
    File,
    /// Remote spreadsheet values API.
    Sheet,
    /// Paginated REST table API.
    Table,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Bearer token for the remote backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub file: FileStoreConfig,

    #[serde(default)]
    pub sheet: SheetStoreConfig,

    #[serde(default)]
    pub table: TableStoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            token: None,
            timeout_seconds: default_timeout(),
            file: FileStoreConfig::default(),
            sheet: SheetStoreConfig::default(),
            table: TableStoreConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Path of the delimited data file.
    #[serde(default = "default_data_file")]
    pub path: String,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: default_data_file(),
        }
    }
}

fn default_data_file() -> String {
    "sleep_data.csv".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetStoreConfig {
    #[serde(default = "default_sheet_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,

    /// A1 range holding the data.
    #[serde(default = "default_sheet_range")]
    pub range: String,
}

impl Default for SheetStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_sheet_url(),
            spreadsheet_id: None,
            range: default_sheet_range(),
        }
    }
}

fn default_sheet_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_sheet_range() -> String {
    "Sheet1!A:E".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStoreConfig {
    #[serde(default = "default_table_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,

    #[serde(default = "default_table_name")]
    pub table: String,

    /// Stop paginating after this many pages.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for TableStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_table_url(),
            base_id: None,
            table: default_table_name(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_table_url() -> String {
    "https://api.airtable.com".to_string()
}

fn default_table_name() -> String {
    "events".to_string()
}

fn default_max_pages() -> usize {
    100
}

/// Chart defaults. Unset values fall back to the variant's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Default recency window in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_days: Option<u32>,

    /// Secondary axis of the chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,

    /// Default subject filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(variant) = args.variant {
            self.tracker.variant = variant;
        }

        // --data always means the file backend
        if let Some(ref data) = args.data {
            self.store.backend = Backend::File;
            self.store.file.path = data.display().to_string();
        }

        if let Some(ref token) = args.token {
            self.store.token = Some(token.clone());
        }
    }

    /// Resolve the tracker profile: variant defaults with config overrides applied.
    pub fn profile(&self) -> Result<Profile> {
        let mut profile = Profile::for_variant(self.tracker.variant);

        if let Some(ref categories) = self.tracker.categories {
            if categories.is_empty() {
                bail!("tracker.categories must not be empty");
            }
            profile.categories = categories.clone();
        }
        if let Some(ref subjects) = self.tracker.subjects {
            profile.subjects = subjects.clone();
        }
        if let Some(ref all_label) = self.tracker.all_label {
            profile.all_label = all_label.clone();
        }

        if let Some(days) = self.chart.window_days {
            if !profile.window.contains(days) {
                bail!(
                    "chart.window_days must be between {} and {}",
                    profile.window.min,
                    profile.window.max
                );
            }
            profile.window.default = days;
        }

        if let Some(group_by) = self.chart.group_by {
            profile.group_by = group_by;
        }
        if profile.group_by == GroupBy::Subject && !profile.has_subjects() {
            bail!("Cannot group by subject: no subjects are configured");
        }

        Ok(profile)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
