//! EventBatch - a versioned envelope of loader rows.

use alloc::vec::Vec;
use core::fmt;

use crate::{FlowEventRecord, RawFlowEvent, SCHEMA_VERSION};

/// Producer schema of an [`EventBatch`].
///
/// Readers accept any minor revision of their own major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaVersion {
    pub major: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub minor: u32,
}

impl SchemaVersion {
    /// The schema this crate writes.
    pub const CURRENT: SchemaVersion = SchemaVersion::new(SCHEMA_VERSION, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A batch of raw provenance rows as written by the collector.
///
/// # Example
///
/// ```rust
/// use provwatch_types::{EventBatch, EventType, FlowEventRecord};
///
/// let batch = EventBatch::builder()
///     .record(FlowEventRecord::builder("e1", "ff-1", EventType::Create, 0).build())
///     .record(FlowEventRecord::builder("e2", "ff-1", EventType::Drop, 10).build())
///     .build();
///
/// assert_eq!(batch.len(), 2);
/// assert!(batch.version.is_compatible());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventBatch {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: SchemaVersion,

    /// Rows in delivery order.
    pub records: Vec<RawFlowEvent>,
}

impl EventBatch {
    /// Create an empty batch at the current schema version.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing batches.
    pub fn builder() -> EventBatchBuilder {
        EventBatchBuilder::new()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Append another batch's rows.
    pub fn extend(&mut self, other: EventBatch) {
        self.records.extend(other.records);
    }
}

/// Builder for constructing [`EventBatch`] instances.
#[derive(Debug, Default)]
pub struct EventBatchBuilder {
    version: SchemaVersion,
    records: Vec<RawFlowEvent>,
}

impl EventBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the schema version (used to simulate older producers).
    pub fn version(mut self, version: SchemaVersion) -> Self {
        self.version = version;
        self
    }

    /// Add a validated record.
    pub fn record(mut self, record: FlowEventRecord) -> Self {
        self.records.push(record.into());
        self
    }

    /// Add a raw row as-is.
    pub fn raw(mut self, raw: RawFlowEvent) -> Self {
        self.records.push(raw);
        self
    }

    pub fn build(self) -> EventBatch {
        EventBatch {
            version: self.version,
            records: self.records,
        }
    }
}
