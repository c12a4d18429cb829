//! Error types for lineage analysis.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = LineageError> = std::result::Result<T, E>;

/// Errors raised to the immediate caller of an analyzer.
///
/// Malformed input rows are not errors; they are collected in the index's
/// skip list instead. An empty result is not an error either.
#[derive(Debug, Error)]
pub enum LineageError {
    /// A trace was requested for a flowfile with no events in the batch.
    #[error("flowfile {0} not found in the loaded batch")]
    NotFound(String),

    /// The batch contradicts itself; signals upstream data corruption.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl LineageError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        LineageError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Lineage relationships that cannot occur in a well-formed batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    /// Parent/child edges loop back on themselves.
    #[error("lineage cycle detected among flowfiles: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// A child's history starts no later than its parent's.
    #[error(
        "non-monotonic lineage: parent {parent} (first event at {parent_time}) is not earlier than child {child} (first event at {child_time})"
    )]
    NonMonotonic {
        parent: String,
        child: String,
        parent_time: u64,
        child_time: u64,
    },
}
