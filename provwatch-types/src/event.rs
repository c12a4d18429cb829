//! Flow events - one entry per thing that happened to one unit of data.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

/// Kind of provenance event recorded for a flowfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum EventType {
    #[cfg_attr(feature = "minicbor", n(0))]
    Create,
    #[cfg_attr(feature = "minicbor", n(1))]
    Receive,
    #[cfg_attr(feature = "minicbor", n(2))]
    Send,
    #[cfg_attr(feature = "minicbor", n(3))]
    Drop,
    #[cfg_attr(feature = "minicbor", n(4))]
    Route,
    #[cfg_attr(feature = "minicbor", n(5))]
    Fork,
    #[cfg_attr(feature = "minicbor", n(6))]
    Join,
    #[cfg_attr(feature = "minicbor", n(7))]
    Clone,
    #[cfg_attr(feature = "minicbor", n(8))]
    ContentModified,
    #[cfg_attr(feature = "minicbor", n(9))]
    AttributesModified,
}

impl EventType {
    /// All event types, in declaration order.
    pub const ALL: [EventType; 10] = [
        EventType::Create,
        EventType::Receive,
        EventType::Send,
        EventType::Drop,
        EventType::Route,
        EventType::Fork,
        EventType::Join,
        EventType::Clone,
        EventType::ContentModified,
        EventType::AttributesModified,
    ];

    /// The upper-case name used on the wire and in canonical paths.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "CREATE",
            EventType::Receive => "RECEIVE",
            EventType::Send => "SEND",
            EventType::Drop => "DROP",
            EventType::Route => "ROUTE",
            EventType::Fork => "FORK",
            EventType::Join => "JOIN",
            EventType::Clone => "CLONE",
            EventType::ContentModified => "CONTENT_MODIFIED",
            EventType::AttributesModified => "ATTRIBUTES_MODIFIED",
        }
    }

    /// Events that end a flowfile's own history (it leaves the flow or is
    /// absorbed into another flowfile).
    pub const fn is_terminal(&self) -> bool {
        matches!(self, EventType::Drop | EventType::Send | EventType::Join)
    }

    /// Events that bring a flowfile into existence.
    pub const fn is_origin(&self) -> bool {
        matches!(self, EventType::Create | EventType::Receive)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(pub String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownEventType {}

impl FromStr for EventType {
    type Err = UnknownEventType;

    /// Parses case-insensitively; `-` and spaces are accepted as separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        EventType::ALL
            .iter()
            .copied()
            .find(|t| {
                let name = t.as_str();
                name.len() == trimmed.len()
                    && name.bytes().zip(trimmed.bytes()).all(|(a, b)| {
                        let b = match b {
                            b'-' | b' ' => b'_',
                            other => other.to_ascii_uppercase(),
                        };
                        a == b
                    })
            })
            .ok_or_else(|| UnknownEventType(String::from(trimmed)))
    }
}

/// A single validated provenance event.
///
/// Records are immutable once built; the analysis engine only ever reads
/// them. Times and durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct FlowEventRecord {
    /// Unique id of this event.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub event_id: String,

    /// Id of the flowfile the event happened to.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub flowfile_id: String,

    #[cfg_attr(feature = "minicbor", n(2))]
    pub event_type: EventType,

    #[cfg_attr(feature = "minicbor", n(3))]
    pub component_id: String,

    #[cfg_attr(feature = "minicbor", n(4))]
    pub component_name: String,

    #[cfg_attr(feature = "minicbor", n(5))]
    pub component_type: String,

    /// Unix timestamp in milliseconds.
    #[cfg_attr(feature = "minicbor", n(6))]
    pub event_time: u64,

    /// Time the component spent on this event, in milliseconds.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(7))]
    pub event_duration: Option<u64>,

    /// Content size in bytes.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(8))]
    pub file_size: Option<u64>,

    /// External endpoint for SEND/RECEIVE events.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(9))]
    pub transit_uri: Option<String>,

    /// Input flowfiles, populated on JOIN and CLONE.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    #[cfg_attr(feature = "minicbor", n(10))]
    pub parent_ids: Vec<String>,

    /// Output flowfiles, populated on FORK.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    #[cfg_attr(feature = "minicbor", n(11))]
    pub child_ids: Vec<String>,

    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(12))]
    pub details: Option<String>,

    /// Relationship a ROUTE event sent the flowfile to.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(13))]
    pub relationship: Option<String>,
}

impl FlowEventRecord {
    /// Create a builder with the fields every event must have.
    pub fn builder(
        event_id: impl Into<String>,
        flowfile_id: impl Into<String>,
        event_type: EventType,
        event_time: u64,
    ) -> FlowEventRecordBuilder {
        FlowEventRecordBuilder::new(event_id, flowfile_id, event_type, event_time)
    }
}

/// Builder for constructing [`FlowEventRecord`] instances.
#[derive(Debug, Clone)]
pub struct FlowEventRecordBuilder {
    record: FlowEventRecord,
}

impl FlowEventRecordBuilder {
    /// Create a new builder. Component fields default to `"unknown"`.
    pub fn new(
        event_id: impl Into<String>,
        flowfile_id: impl Into<String>,
        event_type: EventType,
        event_time: u64,
    ) -> Self {
        Self {
            record: FlowEventRecord {
                event_id: event_id.into(),
                flowfile_id: flowfile_id.into(),
                event_type,
                component_id: String::from(crate::UNKNOWN_COMPONENT),
                component_name: String::from(crate::UNKNOWN_COMPONENT),
                component_type: String::from(crate::UNKNOWN_COMPONENT),
                event_time,
                event_duration: None,
                file_size: None,
                transit_uri: None,
                parent_ids: Vec::new(),
                child_ids: Vec::new(),
                details: None,
                relationship: None,
            },
        }
    }

    /// Set the component id, name and type together.
    pub fn component(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        component_type: impl Into<String>,
    ) -> Self {
        self.record.component_id = id.into();
        self.record.component_name = name.into();
        self.record.component_type = component_type.into();
        self
    }

    pub fn duration(mut self, millis: u64) -> Self {
        self.record.event_duration = Some(millis);
        self
    }

    pub fn file_size(mut self, bytes: u64) -> Self {
        self.record.file_size = Some(bytes);
        self
    }

    pub fn transit_uri(mut self, uri: impl Into<String>) -> Self {
        self.record.transit_uri = Some(uri.into());
        self
    }

    /// Append parent flowfile ids (JOIN / CLONE inputs).
    pub fn parents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record
            .parent_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Append child flowfile ids (FORK outputs).
    pub fn children<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record
            .child_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.record.details = Some(details.into());
        self
    }

    pub fn relationship(mut self, relationship: impl Into<String>) -> Self {
        self.record.relationship = Some(relationship.into());
        self
    }

    /// Build the record.
    pub fn build(self) -> FlowEventRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_parse() {
        assert_eq!("DROP".parse::<EventType>().unwrap(), EventType::Drop);
        assert_eq!(
            "content_modified".parse::<EventType>().unwrap(),
            EventType::ContentModified
        );
        assert_eq!(
            " Attributes-Modified ".parse::<EventType>().unwrap(),
            EventType::AttributesModified
        );
        assert!("QUERY_SUMMARY".parse::<EventType>().is_err());
        assert!("".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_type_names_roundtrip() {
        for t in EventType::ALL {
            assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
        }
    }

    #[test]
    fn test_terminal_and_origin() {
        assert!(EventType::Drop.is_terminal());
        assert!(EventType::Send.is_terminal());
        assert!(EventType::Join.is_terminal());
        assert!(!EventType::Fork.is_terminal());
        assert!(EventType::Create.is_origin());
        assert!(EventType::Receive.is_origin());
        assert!(!EventType::Route.is_origin());
    }

    #[test]
    fn test_builder() {
        let record = FlowEventRecord::builder("e1", "ff-1", EventType::Fork, 1000)
            .component("split-1", "SplitText", "SplitText")
            .duration(12)
            .children(["ff-2", "ff-3"])
            .build();

        assert_eq!(record.component_id, "split-1");
        assert_eq!(record.event_duration, Some(12));
        assert_eq!(
            record.child_ids,
            vec!["ff-2".to_string(), "ff-3".to_string()]
        );
        assert!(record.parent_ids.is_empty());
    }

    #[test]
    fn test_builder_defaults_component() {
        let record = FlowEventRecord::builder("e1", "ff-1", EventType::Create, 0).build();
        assert_eq!(record.component_name, crate::UNKNOWN_COMPONENT);
        assert!(record.details.is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_wire_names() {
        let record = FlowEventRecord::builder("e1", "ff-1", EventType::ContentModified, 5)
            .component("c1", "UpdateRecord", "UpdateRecord")
            .build();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event_type"], "CONTENT_MODIFIED");
        assert!(json.get("parent_ids").is_none());

        let parsed: FlowEventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[cfg(feature = "minicbor")]
    #[test]
    fn test_minicbor_roundtrip() {
        let record = FlowEventRecord::builder("e1", "ff-1", EventType::Join, 5)
            .parents(["a", "b"])
            .file_size(10)
            .build();

        let bytes = minicbor::to_vec(&record).unwrap();
        let parsed: FlowEventRecord = minicbor::decode(&bytes).unwrap();
        assert_eq!(parsed, record);
    }
}
