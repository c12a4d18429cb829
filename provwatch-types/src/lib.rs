//! # provwatch-types
//!
//! Core types for data-flow provenance analysis. This crate defines the
//! closed event schema that the provwatch analysis engine consumes, plus the
//! loosely-typed wire form produced by loaders and the validation step that
//! turns one into the other.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Closed schema**: Every [`FlowEventRecord`] is fully typed; optional fields are explicit
//! - **Lenient ingestion**: [`RawFlowEvent`] accepts partial rows and reports why one is unusable
//! - **Versioned batches**: [`EventBatch`] carries a schema version for forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use provwatch_types::{EventType, FlowEventRecord, RawFlowEvent};
//!
//! let record = FlowEventRecord::builder("evt-1", "ff-1", EventType::Create, 1_703_160_000_000)
//!     .component("gen-1", "GenerateFlowFile", "GenerateFlowFile")
//!     .file_size(1024)
//!     .build();
//!
//! assert_eq!(record.component_name, "GenerateFlowFile");
//!
//! // Loader rows are validated before indexing
//! let raw = RawFlowEvent {
//!     event_id: Some("evt-2".into()),
//!     event_type: Some("DROP".into()),
//!     event_time: Some(1_703_160_000_500),
//!     ..Default::default()
//! };
//! assert!(raw.validate(0).is_err()); // no flowfile id
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! batches to allow consumers to skip formats they cannot read.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod batch;
mod event;
mod raw;

pub use batch::*;
pub use event::*;
pub use raw::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the batch format.
/// Consumers should check this version and skip batches they cannot read.
pub const SCHEMA_VERSION: u32 = 1;

/// Placeholder used when a loader row carries no component information.
pub const UNKNOWN_COMPONENT: &str = "unknown";
