//! One loaded batch, its lineage index and an analysis cache.

use std::convert::Infallible;
use std::sync::Arc;

use provwatch_lineage::{
    analyze_bottlenecks, analyze_fork_join, analyze_modifications, analyze_transfers,
    detect_drops, mine_paths, trace_lineage, AnalysisCache, BatchSummary, BottleneckQuery,
    CacheKey, DropQuery, DropReport, ForkJoinReport, LineageIndex, LineageTrace,
    ModificationQuery, ModificationRow, PathQuery, PathReport, PercentileStat, TraceOptions,
    TransferReport,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::duration::format_millis;
use crate::source::{LoadedBatch, SkippedInput};

/// Analyses over one batch.
///
/// Cloning is cheap: the index and the cache are shared, so clones can be
/// moved onto worker threads and still fill the same cache.
#[derive(Debug, Clone)]
pub struct Session {
    description: String,
    index: Arc<LineageIndex>,
    cache: Arc<AnalysisCache>,
    skipped_inputs: Arc<[SkippedInput]>,
}

impl Session {
    /// Index a loaded batch with a fresh cache.
    pub fn new(batch: LoadedBatch) -> Self {
        Self::with_cache(batch, Arc::new(AnalysisCache::new()))
    }

    /// Index a loaded batch, storing results in a cache that other
    /// sessions may share.
    pub fn with_cache(batch: LoadedBatch, cache: Arc<AnalysisCache>) -> Self {
        let index = LineageIndex::build(batch.records);
        let span = match (index.earliest_time(), index.now()) {
            (Some(first), Some(last)) => format_millis(last - first),
            _ => "-".to_string(),
        };
        info!(
            source = %batch.description,
            events = index.len(),
            flowfiles = index.flowfile_count(),
            malformed = index.skipped().len(),
            span = %span,
            skipped_inputs = batch.skipped.len(),
            "session ready"
        );
        Self {
            description: batch.description,
            index: Arc::new(index),
            cache,
            skipped_inputs: batch.skipped.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn index(&self) -> &Arc<LineageIndex> {
        &self.index
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Documents or lines the source could not read.
    pub fn skipped_inputs(&self) -> &[SkippedInput] {
        &self.skipped_inputs
    }

    fn key(&self, analyzer: &'static str, params: impl Into<String>) -> CacheKey {
        CacheKey::new(self.index.fingerprint(), analyzer, params)
    }

    fn cached<T>(&self, analyzer: &'static str, params: String, compute: impl FnOnce() -> T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let key = self.key(analyzer, params);
        self.cache
            .get_or_compute(key, || Ok::<_, Infallible>(compute()))
            .unwrap_or_else(|never| match never {})
    }

    pub fn summary(&self) -> BatchSummary {
        self.cached("summary", String::new(), || {
            BatchSummary::from_index(&self.index)
        })
    }

    pub fn paths(&self, query: &PathQuery) -> PathReport {
        self.cached("paths", format!("{:?}", query), || {
            mine_paths(&self.index, query)
        })
    }

    pub fn bottlenecks(
        &self,
        query: &BottleneckQuery,
    ) -> provwatch_lineage::Result<Vec<PercentileStat>> {
        let key = self.key("bottlenecks", format!("{:?}", query));
        self.cache
            .get_or_compute(key, || analyze_bottlenecks(&self.index, query))
    }

    pub fn drops(&self, query: &DropQuery) -> DropReport {
        self.cached("drops", format!("{:?}", query), || {
            detect_drops(&self.index, query)
        })
    }

    pub fn trace(
        &self,
        flowfile_id: &str,
        options: &TraceOptions,
    ) -> provwatch_lineage::Result<LineageTrace> {
        let key = self.key("trace", format!("{} {:?}", flowfile_id, options));
        self.cache
            .get_or_compute(key, || trace_lineage(&self.index, flowfile_id, options))
    }

    pub fn transfers(&self) -> TransferReport {
        self.cached("transfers", String::new(), || {
            analyze_transfers(&self.index)
        })
    }

    pub fn fork_join(&self) -> ForkJoinReport {
        self.cached("fork_join", String::new(), || {
            analyze_fork_join(&self.index)
        })
    }

    pub fn modifications(&self, query: &ModificationQuery) -> Vec<ModificationRow> {
        self.cached("modifications", format!("{:?}", query), || {
            analyze_modifications(&self.index, query)
        })
    }
}
