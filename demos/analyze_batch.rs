//! Example: Analyzing a provenance file
//!
//! This example loads a provenance file (or directory) and prints the batch
//! summary, the most common paths and the components dropping data.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example analyze_batch -- path/to/provenance.json
//! ```

use std::env;

use provwatch::{BatchSource, DropQuery, FileSource, PathQuery, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: cargo run --example analyze_batch -- <path-to-provenance.json>");
        eprintln!();
        eprintln!("The file should contain a JSON array of provenance events:");
        eprintln!(r#"  [{{"event_id": "e1", "flowfile_id": "ff-1", "event_type": "CREATE"}}]"#);
        std::process::exit(1);
    };

    let mut source = FileSource::new(&path);
    let session = Session::new(source.load().await?);

    let summary = session.summary();
    println!(
        "{} events, {} flowfiles, {} components ({} skipped records)",
        summary.total_events,
        summary.distinct_flowfiles,
        summary.components,
        summary.skipped_records
    );

    println!("\nTop paths:");
    for path in session.paths(&PathQuery { top_n: 5 }).paths {
        println!("  {:>6}  {}", path.count, path.canonical);
    }

    println!("\nDrops in the last hour of the batch:");
    let drops = session.drops(&DropQuery {
        time_window_minutes: 60,
        min_drops: 1,
    });
    for row in drops.rows {
        let reason = row
            .reasons
            .first()
            .map(|r| r.reason.as_str())
            .unwrap_or("-");
        println!(
            "  {:>6}  {}  ({})",
            row.drop_count, row.component_name, reason
        );
    }

    Ok(())
}
