//! # provwatch-lineage
//!
//! Lineage reconstruction and performance analysis over a batch of
//! data-flow provenance events.
//!
//! A batch is indexed once into a [`LineageIndex`]; every analyzer is a
//! stateless function over that index, so independent analyses can run in
//! parallel against one `Arc<LineageIndex>` without locking.
//!
//! ## Analyzers
//!
//! - [`mine_paths`] - most common component/event-type routes
//! - [`analyze_bottlenecks`] - per-component duration percentiles
//! - [`detect_drops`] - recent DROP events per component, with reasons
//! - [`trace_lineage`] - ancestor/descendant tree of one flowfile
//! - [`analyze_transfers`] - SEND/RECEIVE by external endpoint
//! - [`analyze_fork_join`] - fan-out and fan-in per component
//! - [`analyze_modifications`] - content/attribute changes per component
//! - [`BatchSummary`] - headline numbers for the batch
//!
//! ## Example
//!
//! ```rust
//! use provwatch_lineage::{detect_drops, DropQuery, LineageIndex};
//! use provwatch_types::{EventType, FlowEventRecord};
//!
//! let records = vec![
//!     FlowEventRecord::builder("e1", "ff-1", EventType::Create, 0)
//!         .component("gen", "Generate", "GenerateFlowFile")
//!         .build(),
//!     FlowEventRecord::builder("e2", "ff-1", EventType::Drop, 1_000)
//!         .component("route", "Router", "RouteOnAttribute")
//!         .details("Auto-Terminated by unmatched Relationship")
//!         .build(),
//! ];
//! let index = LineageIndex::from_records(records);
//!
//! let report = detect_drops(&index, &DropQuery { time_window_minutes: 60, min_drops: 1 });
//! assert_eq!(report.rows.len(), 1);
//! assert_eq!(report.rows[0].component_name, "Router");
//! ```

pub mod bottleneck;
pub mod cache;
pub mod drops;
pub mod error;
pub mod fanout;
pub mod index;
pub mod modification;
pub mod paths;
pub mod summary;
pub mod trace;
pub mod transfer;

#[cfg(test)]
mod fixtures;

pub use bottleneck::{analyze_bottlenecks, percentile, BottleneckQuery, PercentileStat};
pub use cache::{AnalysisCache, CacheKey};
pub use drops::{detect_drops, DropQuery, DropReason, DropReport, DropRow};
pub use error::{ConsistencyError, LineageError, Result};
pub use fanout::{analyze_fork_join, FanStats, ForkJoinReport};
pub use index::{Edge, EdgeCause, LineageIndex};
pub use modification::{analyze_modifications, ModificationQuery, ModificationRow};
pub use paths::{mine_paths, FlowPath, PathEnd, PathQuery, PathReport, PathToken};
pub use summary::BatchSummary;
pub use trace::{trace_lineage, LineageGraph, LineageTrace, NodeKind, TraceNode, TraceOptions};
pub use transfer::{analyze_transfers, Endpoint, TransferReport, TransferRow};

// Re-export types for convenience
pub use provwatch_types::{EventType, FlowEventRecord, MalformedRecord, RawFlowEvent};
