//! Loosely-typed loader rows and their validation into [`FlowEventRecord`].

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::{EventType, FlowEventRecord, UnknownEventType, UNKNOWN_COMPONENT};

/// A provenance row as delivered by a loader, before validation.
///
/// Every field is optional so that one incomplete row never prevents the
/// rest of a batch from deserializing. Column names used by the collector's
/// storage format (`flowfile_uuid`, `file_size_bytes`, `parent_uuids`,
/// `child_uuids`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawFlowEvent {
    pub event_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "flowfile_uuid"))]
    pub flowfile_id: Option<String>,
    pub event_type: Option<String>,
    pub component_id: Option<String>,
    pub component_name: Option<String>,
    pub component_type: Option<String>,
    pub event_time: Option<i64>,
    pub event_duration: Option<i64>,
    #[cfg_attr(feature = "serde", serde(alias = "file_size_bytes"))]
    pub file_size: Option<i64>,
    pub transit_uri: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "parent_uuids"))]
    pub parent_ids: Option<Vec<String>>,
    #[cfg_attr(feature = "serde", serde(alias = "child_uuids"))]
    pub child_ids: Option<Vec<String>>,
    pub details: Option<String>,
    pub relationship: Option<String>,
}

/// Why a raw row could not become a [`FlowEventRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "value", rename_all = "snake_case")
)]
pub enum MalformedReason {
    /// A required field is absent or empty.
    MissingField(String),
    /// `event_type` is not one of the known event types.
    UnknownEventType(String),
    /// `event_time` is before the Unix epoch.
    NegativeEventTime(i64),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingField(name) => write!(f, "missing required field `{}`", name),
            MalformedReason::UnknownEventType(t) => write!(f, "unknown event type `{}`", t),
            MalformedReason::NegativeEventTime(t) => write!(f, "negative event time {}", t),
        }
    }
}

/// A row excluded from indexing, with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MalformedRecord {
    /// Zero-based position of the row in the delivered batch.
    pub position: usize,
    /// The row's event id, when it had one.
    pub event_id: Option<String>,
    pub reason: MalformedReason,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.event_id {
            Some(id) => write!(f, "record #{} ({}): {}", self.position, id, self.reason),
            None => write!(f, "record #{}: {}", self.position, self.reason),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MalformedRecord {}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The platform reports `-1` for unknown durations and sizes.
fn non_negative(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}

impl RawFlowEvent {
    /// Validate this row into a closed [`FlowEventRecord`].
    ///
    /// `position` is the row's index in its batch and is only used for
    /// reporting.
    pub fn validate(self, position: usize) -> Result<FlowEventRecord, MalformedRecord> {
        let event_id = non_empty(self.event_id);
        let malformed = |reason| MalformedRecord {
            position,
            event_id: event_id.clone(),
            reason,
        };
        let missing = |field: &str| malformed(MalformedReason::MissingField(String::from(field)));

        let flowfile_id = non_empty(self.flowfile_id).ok_or_else(|| missing("flowfile_id"))?;
        let event_type: EventType = non_empty(self.event_type)
            .ok_or_else(|| missing("event_type"))?
            .parse()
            .map_err(|e: UnknownEventType| malformed(MalformedReason::UnknownEventType(e.0)))?;
        let event_time = self.event_time.ok_or_else(|| missing("event_time"))?;
        let event_time = u64::try_from(event_time)
            .map_err(|_| malformed(MalformedReason::NegativeEventTime(event_time)))?;
        let Some(event_id) = event_id.clone() else {
            return Err(missing("event_id"));
        };

        let component_id =
            non_empty(self.component_id).unwrap_or_else(|| String::from(UNKNOWN_COMPONENT));
        let component_name = non_empty(self.component_name).unwrap_or_else(|| component_id.clone());
        let component_type =
            non_empty(self.component_type).unwrap_or_else(|| String::from(UNKNOWN_COMPONENT));

        Ok(FlowEventRecord {
            event_id,
            flowfile_id,
            event_type,
            component_id,
            component_name,
            component_type,
            event_time,
            event_duration: non_negative(self.event_duration),
            file_size: non_negative(self.file_size),
            transit_uri: non_empty(self.transit_uri),
            parent_ids: self.parent_ids.unwrap_or_default(),
            child_ids: self.child_ids.unwrap_or_default(),
            details: non_empty(self.details),
            relationship: non_empty(self.relationship),
        })
    }
}

impl From<FlowEventRecord> for RawFlowEvent {
    fn from(record: FlowEventRecord) -> Self {
        Self {
            event_id: Some(record.event_id),
            flowfile_id: Some(record.flowfile_id),
            event_type: Some(String::from(record.event_type.as_str())),
            component_id: Some(record.component_id),
            component_name: Some(record.component_name),
            component_type: Some(record.component_type),
            event_time: i64::try_from(record.event_time).ok(),
            event_duration: record.event_duration.and_then(|d| i64::try_from(d).ok()),
            file_size: record.file_size.and_then(|s| i64::try_from(s).ok()),
            transit_uri: record.transit_uri,
            parent_ids: Some(record.parent_ids),
            child_ids: Some(record.child_ids),
            details: record.details,
            relationship: record.relationship,
        }
    }
}
