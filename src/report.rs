//! Combined report: every analyzer over one session.

use std::path::Path;

use anyhow::{Context, Result};
use provwatch_lineage::{
    BatchSummary, DropReport, ForkJoinReport, MalformedRecord, ModificationRow, PathReport,
    PercentileStat, TransferReport,
};
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use tracing::info;

use crate::config::Settings;
use crate::session::Session;
use crate::source::SkippedInput;

/// Output of the `report` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub source: String,
    pub summary: BatchSummary,
    pub skipped_inputs: Vec<SkippedInput>,
    pub malformed_records: Vec<MalformedRecord>,
    pub paths: PathReport,
    pub bottlenecks: Vec<PercentileStat>,
    pub drops: DropReport,
    pub transfers: TransferReport,
    pub fork_join: ForkJoinReport,
    pub modifications: Vec<ModificationRow>,
}

impl Report {
    /// Run every analyzer, each on its own blocking worker.
    ///
    /// The workers share the session's index and cache; nothing is
    /// recomputed for analyses the session has already answered.
    pub async fn build(session: &Session, settings: &Settings) -> Result<Self> {
        let path_query = settings.path_query();
        let bottleneck_query = settings.bottleneck_query();
        let drop_query = settings.drop_query()?;
        let modification_query = settings.modification_query();

        let worker = || session.clone();
        let joined = tokio::try_join!(
            spawn_blocking({
                let s = worker();
                move || s.summary()
            }),
            spawn_blocking({
                let s = worker();
                move || s.paths(&path_query)
            }),
            spawn_blocking({
                let s = worker();
                move || s.bottlenecks(&bottleneck_query)
            }),
            spawn_blocking({
                let s = worker();
                move || s.drops(&drop_query)
            }),
            spawn_blocking({
                let s = worker();
                move || s.transfers()
            }),
            spawn_blocking({
                let s = worker();
                move || s.fork_join()
            }),
            spawn_blocking({
                let s = worker();
                move || s.modifications(&modification_query)
            }),
        )
        .context("analysis worker failed")?;
        let (summary, paths, bottlenecks, drops, transfers, fork_join, modifications) = joined;

        let report = Self {
            source: session.description().to_string(),
            summary,
            skipped_inputs: session.skipped_inputs().to_vec(),
            malformed_records: session.index().skipped().to_vec(),
            paths,
            bottlenecks: bottlenecks.context("bottleneck analysis failed")?,
            drops,
            transfers,
            fork_join,
            modifications,
        };
        info!(
            source = %report.source,
            paths = report.paths.paths.len(),
            bottlenecks = report.bottlenecks.len(),
            drop_rows = report.drops.rows.len(),
            "report built"
        );
        Ok(report)
    }

    /// Write the report as pretty JSON.
    pub fn export(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_document;

    fn session() -> Session {
        let mut rows = Vec::new();
        for i in 0..6 {
            rows.push(format!(
                r#"{{"event_id": "c{i}", "flowfile_id": "f{i}", "event_type": "CREATE", "event_time": {t}, "component_id": "gen", "event_duration": {d}}}"#,
                i = i,
                t = i * 10,
                d = i + 1
            ));
            rows.push(format!(
                r#"{{"event_id": "d{i}", "flowfile_id": "f{i}", "event_type": "DROP", "event_time": {t}, "component_id": "sink", "details": "Auto-Terminated"}}"#,
                i = i,
                t = i * 10 + 5
            ));
        }
        rows.push(r#"{"event_id": "x", "event_type": "CREATE"}"#.to_string());
        Session::new(parse_document(&rows.join("\n"), "mem"))
    }

    #[tokio::test]
    async fn test_report_runs_every_analyzer() {
        let session = session();
        let report = Report::build(&session, &Settings::default()).await.unwrap();

        assert_eq!(report.summary.total_events, 12);
        assert_eq!(report.malformed_records.len(), 1);
        assert_eq!(report.paths.total_roots, 6);
        assert_eq!(report.paths.paths[0].count, 6);
        assert_eq!(report.bottlenecks.len(), 1);
        assert_eq!(report.bottlenecks[0].max, 6);
        assert_eq!(report.drops.rows.len(), 1);
        assert_eq!(report.drops.rows[0].drop_count, 6);
        assert!(report.transfers.outbound.is_empty());
        assert!(report.modifications.is_empty());

        // Every analysis landed in the shared cache.
        assert_eq!(session.cache().len(), 7);
    }

    #[tokio::test]
    async fn test_invalid_percentile_fails_report() {
        let mut settings = Settings::default();
        settings.bottlenecks.percentile = 150.0;

        let err = Report::build(&session(), &settings).await.unwrap_err();
        assert!(format!("{:#}", err).contains("percentile"));
    }

    #[tokio::test]
    async fn test_export_writes_json() {
        let session = session();
        let report = Report::build(&session, &Settings::default()).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        report.export(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["source"], "mem");
        assert_eq!(back["drops"]["rows"][0]["component_id"], "sink");
    }
}
