//! Batch sources for provenance events.
//!
//! A source produces one finite [`LoadedBatch`] of raw rows. Inputs that
//! cannot be read as provenance (unparseable files, incompatible schema
//! versions, garbage NDJSON lines) are skipped and reported instead of
//! failing the load; rows that parse but are incomplete are left for the
//! lineage index to reject.

mod file;
mod stream;

pub use file::FileSource;
pub use stream::StreamSource;

use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;
use provwatch_types::{EventBatch, RawFlowEvent, SchemaVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Trait for loading a batch of provenance rows from various inputs.
///
/// # Example
///
/// ```no_run
/// use provwatch::{BatchSource, FileSource};
///
/// # tokio_test::block_on(async {
/// let mut source = FileSource::new("provenance.json");
/// let batch = source.load().await.unwrap();
/// println!("{} rows from {}", batch.records.len(), source.description());
/// # });
/// ```
#[async_trait]
pub trait BatchSource: Send + Debug {
    /// Read the whole batch.
    ///
    /// Fails only when the input as a whole is unavailable; individual bad
    /// documents end up in [`LoadedBatch::skipped`].
    async fn load(&mut self) -> Result<LoadedBatch>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

/// An input document or line that contributed no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInput {
    /// File path, `path:line`, or stream position.
    pub origin: String,
    pub reason: String,
}

/// Raw rows gathered by a [`BatchSource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedBatch {
    pub description: String,
    pub records: Vec<RawFlowEvent>,
    pub skipped: Vec<SkippedInput>,
}

impl LoadedBatch {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Append another batch's rows and skips, keeping this description.
    pub fn merge(&mut self, other: LoadedBatch) {
        self.records.extend(other.records);
        self.skipped.extend(other.skipped);
    }

    pub(crate) fn skip(&mut self, origin: impl Into<String>, reason: impl Into<String>) {
        let skipped = SkippedInput {
            origin: origin.into(),
            reason: reason.into(),
        };
        warn!(origin = %skipped.origin, reason = %skipped.reason, "skipping input");
        self.skipped.push(skipped);
    }
}

/// Parse one document: a JSON array of rows, a single row object, a
/// versioned [`EventBatch`] envelope, or newline-delimited rows.
///
/// Rows are decoded one at a time, so a row with a mistyped field is
/// skipped as `origin#index` without losing its neighbours.
pub(crate) fn parse_document(text: &str, origin: &str) -> LoadedBatch {
    let mut batch = LoadedBatch::new(origin);
    let text = text.trim();
    if text.is_empty() {
        return batch;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => decode_value(value, origin, &mut batch),
        // Not a single JSON value; read it line by line.
        Err(_) => {
            for (n, line) in text.lines().enumerate() {
                parse_line(line, &format!("{}:{}", origin, n + 1), &mut batch);
            }
        }
    }
    batch
}

/// Parse one NDJSON line into `batch`. Blank lines yield no rows.
pub(crate) fn parse_line(line: &str, origin: &str, batch: &mut LoadedBatch) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(value) => decode_value(value, origin, batch),
        Err(e) => batch.skip(origin, format!("Parse error: {}", e)),
    }
}

fn decode_value(value: Value, origin: &str, batch: &mut LoadedBatch) {
    match value {
        Value::Array(rows) => decode_rows(rows, origin, batch),
        Value::Object(mut envelope) if envelope.contains_key("records") => {
            let version = match envelope.remove("version") {
                Some(version) => match serde_json::from_value::<SchemaVersion>(version) {
                    Ok(version) => version,
                    Err(e) => {
                        batch.skip(origin, format!("Parse error: {}", e));
                        return;
                    }
                },
                None => SchemaVersion::CURRENT,
            };
            if !version.is_compatible() {
                batch.skip(
                    origin,
                    format!(
                        "incompatible schema version {} (supported: {})",
                        version,
                        SchemaVersion::CURRENT
                    ),
                );
                return;
            }
            match envelope.remove("records") {
                Some(Value::Array(rows)) => decode_rows(rows, origin, batch),
                _ => batch.skip(origin, "Parse error: `records` is not an array"),
            }
        }
        row @ Value::Object(_) => decode_row(row, origin, batch),
        other => batch.skip(
            origin,
            format!("expected a JSON array or object, found `{}`", other),
        ),
    }
}

fn decode_rows(rows: Vec<Value>, origin: &str, batch: &mut LoadedBatch) {
    for (i, row) in rows.into_iter().enumerate() {
        decode_row(row, &format!("{}#{}", origin, i), batch);
    }
}

fn decode_row(row: Value, origin: &str, batch: &mut LoadedBatch) {
    match serde_json::from_value::<RawFlowEvent>(row) {
        Ok(raw) => batch.records.push(raw),
        Err(e) => batch.skip(origin, format!("Parse error: {}", e)),
    }
}
