//! # provwatch
//!
//! Provenance diagnostics for data-flow platforms: load a batch of flow
//! events, index its lineage once, and ask it questions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         provwatch                            │
//! │  ┌─────────┐    ┌───────────┐    ┌────────────────────────┐  │
//! │  │ source  │───▶│  session  │───▶│ provwatch-lineage      │  │
//! │  │ (input) │    │index+cache│    │ analyzers (pure fns)   │  │
//! │  └─────────┘    └─────┬─────┘    └────────────────────────┘  │
//! │   FileSource          │                                      │
//! │   StreamSource        ▼                                      │
//! │                  ┌─────────┐                                 │
//! │                  │ report  │──▶ JSON (stdout / --export)     │
//! │                  └─────────┘                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`BatchSource`] trait with file/directory and
//!   NDJSON stream implementations
//! - **[`session`]**: a loaded batch's [`LineageIndex`](provwatch_lineage::LineageIndex)
//!   plus an explicit result cache
//! - **[`report`]**: every analyzer at once, run concurrently
//! - **[`config`]**: layered defaults (built-in, TOML file, `PROVWATCH_*` env)
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Headline numbers for a file or a directory of files
//! provwatch --file provenance/ summary
//!
//! # Components dropping data in the last two hours of the batch
//! provwatch --file provenance.json drops --window 2h --min-drops 1
//!
//! # Everything, written to a file
//! cat events.ndjson | provwatch --stdin report --export report.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::io::Cursor;
//! use provwatch::{BatchSource, PathQuery, Session, StreamSource};
//!
//! # tokio_test::block_on(async {
//! let data = concat!(
//!     "{\"event_id\": \"e1\", \"flowfile_id\": \"ff-1\", \"event_type\": \"CREATE\", \"event_time\": 0, \"component_name\": \"Generate\"}\n",
//!     "{\"event_id\": \"e2\", \"flowfile_id\": \"ff-1\", \"event_type\": \"SEND\", \"event_time\": 9, \"component_name\": \"Publish\"}\n",
//! );
//! let mut source = StreamSource::new(Cursor::new(data.as_bytes().to_vec()), "example");
//! let session = Session::new(source.load().await.unwrap());
//!
//! let report = session.paths(&PathQuery::default());
//! assert_eq!(report.paths[0].canonical, "Generate(CREATE) → Publish(SEND)");
//! # });
//! ```

pub mod config;
pub mod duration;
pub mod report;
pub mod session;
pub mod source;

// Re-export main types for convenience
pub use config::Settings;
pub use report::Report;
pub use session::Session;
pub use source::{BatchSource, FileSource, LoadedBatch, SkippedInput, StreamSource};

pub use provwatch_lineage::{
    BottleneckQuery, DropQuery, LineageError, ModificationQuery, PathQuery, TraceOptions,
};
