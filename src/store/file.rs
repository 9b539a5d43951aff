//! Local append-only delimited file.

use crate::models::Event;
use crate::store::error::{StoreError, StoreResult};
use crate::store::layout::{Layout, DEFAULT_HEADER};
use crate::store::RecordStore;
use async_trait::async_trait;
use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

const DELIMITER: char = ',';

/// Events stored one per line in a comma-delimited file with a header row.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the whole file, treating a missing file as empty.
    async fn read_contents(&self) -> StoreResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    async fn open_existing(&self) -> StoreResult<Option<File>> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// First non-empty line of the file, split into cells. Stops reading there.
    async fn read_header(&self) -> StoreResult<Option<Vec<String>>> {
        let file = match self.open_existing().await? {
            Some(file) => file,
            None => return Ok(None),
        };

        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| StoreError::io(&self.path, e))?
        {
            if !line.trim().is_empty() {
                return Ok(Some(split_line(&line).into_iter().map(String::from).collect()));
            }
        }
        Ok(None)
    }

    /// Whether the file is non-empty and its last byte is not a newline.
    async fn lacks_final_newline(&self) -> StoreResult<bool> {
        let mut file = match self.open_existing().await? {
            Some(file) => file,
            None => return Ok(false),
        };

        let io_err = |e: std::io::Error| StoreError::io(&self.path, e);
        let len = file.metadata().await.map_err(io_err)?.len();
        if len == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1)).await.map_err(io_err)?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await.map_err(io_err)?;
        Ok(last[0] != b'\n')
    }
}

fn split_line(line: &str) -> Vec<&str> {
    line.split(DELIMITER).collect()
}

fn check_field(field: &str) -> StoreResult<()> {
    if field.contains([DELIMITER, '"', '\n', '\r']) {
        return Err(StoreError::InvalidRecord(format!(
            "field '{}' contains a delimiter, quote or line break",
            field.escape_debug()
        )));
    }
    Ok(())
}

/// Parse file contents into events, skipping rows that cannot be read.
pub(crate) fn parse_contents(content: &str) -> StoreResult<Vec<Event>> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let header = match lines.next() {
        Some(h) => split_line(h),
        None => return Ok(Vec::new()),
    };
    let layout = Layout::from_header(&header);
    if !layout.has_date() {
        return Err(StoreError::Malformed(format!(
            "header has no date column: {}",
            header.join(",")
        )));
    }

    let mut events = Vec::new();
    for (idx, line) in lines.enumerate() {
        let cells = split_line(line);
        if cells.len() != layout.len() {
            warn!(
                "Skipping row {}: expected {} fields, found {}",
                idx + 2,
                layout.len(),
                cells.len()
            );
            continue;
        }
        match layout.parse_row(&cells) {
            Ok(event) => events.push(event),
            Err(e) => warn!("Skipping row {}: {}", idx + 2, e),
        }
    }

    Ok(events)
}

#[async_trait]
impl RecordStore for FileStore {
    async fn append(&self, event: &Event) -> StoreResult<()> {
        let (layout, write_header) = match self.read_header().await? {
            Some(header) => (Layout::from_header(&header), false),
            None => (Layout::default(), true),
        };

        let cells = layout.render_row(event);
        for cell in &cells {
            check_field(cell)?;
        }

        let mut chunk = String::new();
        if self.lacks_final_newline().await? {
            chunk.push('\n');
        }
        if write_header {
            chunk.push_str(&DEFAULT_HEADER.join(","));
            chunk.push('\n');
        }
        chunk.push_str(&cells.join(","));
        chunk.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(chunk.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&self.path, e))?;

        debug!("Appended event to {}", self.path.display());
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<Event>> {
        match self.read_contents().await? {
            Some(content) => {
                let events = parse_contents(&content)?;
                debug!("Loaded {} events from {}", events.len(), self.path.display());
                Ok(events)
            }
            None => {
                debug!("{} does not exist yet, no events", self.path.display());
                Ok(Vec::new())
            }
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn sample(day: u32, hours: f64, who: &str) -> Event {
        Event::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            hours,
            "Sleep",
            Some(who.to_string()),
        )
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nothing.csv"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sleep.csv");
        let store = FileStore::new(&path);

        let logged = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        store
            .append(&sample(10, 7.5, "Lloyd").with_logged_at(logged))
            .await
            .unwrap();
        store.append(&sample(11, 8.0, "Georgia")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("date,measure,category,subject,logged_at\n"));
        assert_eq!(content.lines().count(), 3);

        let events = store.load_all().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].measure, Some(7.5));
        assert_eq!(events[0].logged_at, Some(logged));
        assert_eq!(events[1].subject.as_deref(), Some("Georgia"));
    }

    #[tokio::test]
    async fn test_append_respects_legacy_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sleep_data.csv");
        std::fs::write(&path, "date,hours,type,person\n2024-01-09,6.0,Sleep,Lloyd").unwrap();

        let store = FileStore::new(&path);
        store.append(&sample(10, 0.5, "Georgia")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "date,hours,type,person\n2024-01-09,6.0,Sleep,Lloyd\n2024-01-10,0.5,Sleep,Georgia\n"
        );
        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_append_reads_only_the_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sleep.csv");

        // Bytes after the header are not valid UTF-8; a whole-file read would fail.
        let mut content = b"\r\ndate,hours,type,person\r\n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b'\n']);
        std::fs::write(&path, &content).unwrap();

        let store = FileStore::new(&path);
        store.append(&sample(10, 8.0, "Lloyd")).await.unwrap();

        let written = std::fs::read(&path).unwrap();
        assert!(written.ends_with(b"\xff\xfe\n2024-01-10,8,Sleep,Lloyd\n"));
    }

    #[tokio::test]
    async fn test_append_to_blank_file_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sleep.csv");
        std::fs::write(&path, "").unwrap();

        let store = FileStore::new(&path);
        store.append(&sample(10, 8.0, "Lloyd")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "date,measure,category,subject,logged_at\n2024-01-10,8,Sleep,Lloyd,\n"
        );
    }

    #[tokio::test]
    async fn test_append_rejects_delimiter_in_field() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("sleep.csv"));

        let err = store
            .append(&sample(10, 1.0, "Lloyd, Jr"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[test]
    fn test_parse_skips_bad_rows() {
        let content = "date,hours,type,person\n\
                       2024-01-10,7.5,Sleep,Lloyd\n\
                       2024-01-10,0.5,Nap\n\
                       2024-01-11,eight,Sleep,Georgia\n\
                       not-a-date,1.0,Nap,Georgia\n";
        let events = parse_contents(content).unwrap();

        // Bad dates survive parsing; the pipeline drops them.
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].occurred_at, "not-a-date");
    }

    #[test]
    fn test_parse_requires_date_column() {
        assert!(matches!(
            parse_contents("when,hours\n2024-01-10,1\n"),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_empty_file() {
        assert!(parse_contents("").unwrap().is_empty());
        assert!(parse_contents("\n\n").unwrap().is_empty());
    }
}
