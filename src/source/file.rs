//! File-based batch source.
//!
//! Reads a single provenance file, or every `.json` / `.ndjson` / `.jsonl`
//! file in a directory in name order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{parse_document, BatchSource, LoadedBatch};

const EXTENSIONS: &[&str] = &["json", "ndjson", "jsonl"];

/// A batch source backed by a file or a directory of files.
///
/// Within a directory, a file that cannot be read or parsed is skipped and
/// reported; the remaining files still load.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given file or directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being loaded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_file(path: &Path) -> Result<LoadedBatch> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Read error: {}", path.display()))?;
        Ok(parse_document(&content, &path.display().to_string()))
    }

    async fn load_dir(&self) -> Result<LoadedBatch> {
        let mut entries = fs::read_dir(&self.path)
            .await
            .with_context(|| format!("Read error: {}", self.path.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let wanted = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if wanted && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut batch = LoadedBatch::new(self.description.clone());
        for path in files {
            debug!(path = %path.display(), "loading provenance file");
            match Self::load_file(&path).await {
                Ok(loaded) => batch.merge(loaded),
                Err(e) => batch.skip(path.display().to_string(), format!("{:#}", e)),
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl BatchSource for FileSource {
    async fn load(&mut self) -> Result<LoadedBatch> {
        let metadata = fs::metadata(&self.path)
            .await
            .with_context(|| format!("Read error: {}", self.path.display()))?;

        let batch = if metadata.is_dir() {
            self.load_dir().await?
        } else {
            let mut batch = Self::load_file(&self.path).await?;
            batch.description = self.description.clone();
            batch
        };

        info!(
            source = %self.description,
            records = batch.records.len(),
            skipped = batch.skipped.len(),
            "batch loaded"
        );
        Ok(batch)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn sample_json() -> &'static str {
        r#"[
            {"event_id": "e1", "flowfile_uuid": "ff-1", "event_type": "CREATE", "event_time": 0},
            {"event_id": "e2", "flowfile_uuid": "ff-1", "event_type": "DROP", "event_time": 5}
        ]"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/provenance.json");
        assert_eq!(source.path(), Path::new("/tmp/provenance.json"));
        assert_eq!(source.description(), "file: /tmp/provenance.json");
    }

    #[tokio::test]
    async fn test_file_source_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());
        let batch = source.load().await.unwrap();
        assert_eq!(batch.records.len(), 2);
        assert!(batch.skipped.is_empty());
        assert_eq!(batch.description, source.description());
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/provenance.json");

        let err = source.load().await.unwrap_err();
        assert!(err.to_string().contains("Read error"));
    }

    #[tokio::test]
    async fn test_file_source_invalid_json_is_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());
        let batch = source.load().await.unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.skipped.len(), 1);
        assert!(batch.skipped[0].reason.contains("Parse error"));
    }

    #[tokio::test]
    async fn test_directory_source() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), sample_json()).unwrap();
        std::fs::write(
            dir.path().join("b.ndjson"),
            "{\"event_id\": \"e3\", \"flowfile_uuid\": \"ff-2\"}\n{\"event_id\": \"e4\"}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("c.json"),
            r#"{"version": {"major": 2, "minor": 0}, "records": []}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let mut source = FileSource::new(dir.path());
        let batch = source.load().await.unwrap();
        assert_eq!(batch.records.len(), 4);
        assert_eq!(batch.records[0].event_id.as_deref(), Some("e1"));
        assert_eq!(batch.records[2].event_id.as_deref(), Some("e3"));
        assert_eq!(batch.skipped.len(), 1);
        assert!(batch.skipped[0].origin.ends_with("c.json"));
    }
}
