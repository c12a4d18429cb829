//! Example: Tracing lineage from an NDJSON stream
//!
//! This example feeds newline-delimited provenance events through a
//! StreamSource and traces one flowfile's descendants.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example stream_batch
//! ```

use std::io::Cursor;

use provwatch::{BatchSource, Session, StreamSource, TraceOptions};

const EVENTS: &str = r#"{"event_id": "e1", "flowfile_id": "f1", "event_type": "CREATE", "event_time": 0, "component_name": "Generate"}
{"event_id": "e2", "flowfile_id": "f1", "event_type": "FORK", "event_time": 1, "component_name": "Split", "child_ids": ["f2", "f3"]}
{"event_id": "e3", "flowfile_id": "f2", "event_type": "DROP", "event_time": 5, "component_name": "Filter"}
{"event_id": "e4", "flowfile_id": "f3", "event_type": "SEND", "event_time": 5, "component_name": "Publish", "transit_uri": "s3://bucket/out"}
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut source = StreamSource::new(Cursor::new(EVENTS.as_bytes().to_vec()), "demo");
    let session = Session::new(source.load().await?);

    let trace = session.trace("f1", &TraceOptions::default())?;
    println!("Lineage of {}:", trace.flowfile_id);
    for child in &trace.descendants {
        let last = child
            .events
            .last()
            .map(|e| e.event_type.to_string())
            .unwrap_or_default();
        println!(
            "  {} --{}--> {} (ends with {})",
            trace.flowfile_id, child.via.event_type, child.flowfile_id, last
        );
    }

    println!("\n{}", serde_json::to_string_pretty(&session.transfers())?);
    Ok(())
}
