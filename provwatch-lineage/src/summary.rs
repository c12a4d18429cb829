//! Whole-batch overview.

use std::collections::BTreeMap;

use provwatch_types::EventType;
use serde::{Deserialize, Serialize};

use crate::index::LineageIndex;

/// Headline numbers for one loaded batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_events: usize,
    pub distinct_flowfiles: usize,
    pub components: usize,
    pub events_by_type: BTreeMap<EventType, usize>,
    pub earliest_event_time: Option<u64>,
    pub latest_event_time: Option<u64>,
    pub edges: usize,
    /// Edges with one end outside the batch window.
    pub dangling_edges: usize,
    pub skipped_records: usize,
}

impl BatchSummary {
    pub fn from_index(index: &LineageIndex) -> Self {
        let mut events_by_type = BTreeMap::new();
        for event in index.events() {
            *events_by_type.entry(event.event_type).or_insert(0) += 1;
        }

        Self {
            total_events: index.len(),
            distinct_flowfiles: index.flowfile_count(),
            components: index.component_count(),
            events_by_type,
            earliest_event_time: index.earliest_time(),
            latest_event_time: index.now(),
            edges: index.edge_count(),
            dangling_edges: index.dangling_edge_count(),
            skipped_records: index.skipped().len(),
        }
    }

    /// Count of one event type.
    pub fn count(&self, event_type: EventType) -> usize {
        self.events_by_type.get(&event_type).copied().unwrap_or(0)
    }
}
