//! Lineage index over one loaded batch.
//!
//! The index is an arena of validated events plus id-keyed lookups into it.
//! Parent/child relationships are stored as plain id pairs in two adjacency
//! maps, so the many-to-many lineage DAG never needs owning references.
//!
//! ```text
//! RawFlowEvent rows
//!        │ validate (malformed rows -> skip list)
//!        ▼
//!   events: Vec<FlowEventRecord>   (arena, never mutated)
//!        │
//!        ├──▶ by_id         flowfile_id  -> [arena idx] sorted by (time, event_id)
//!        ├──▶ by_component  component_id -> [arena idx] sorted by (time, event_id)
//!        ├──▶ parent_of     child id     -> [Edge]
//!        └──▶ children_of   parent id    -> [Edge]
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use provwatch_types::{EventType, FlowEventRecord, MalformedRecord, RawFlowEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A parent -> child relationship between two flowfiles.
///
/// Either end may be absent from the batch (a dangling edge); the batch is a
/// bounded window over an unbounded history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub parent: String,
    pub child: String,
    /// The event that recorded the relationship.
    pub cause: EdgeCause,
}

/// Label of an [`Edge`]: the FORK/JOIN/CLONE event that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCause {
    pub event_id: String,
    pub event_type: EventType,
    pub event_time: u64,
    pub component_name: String,
}

impl EdgeCause {
    fn from_record(record: &FlowEventRecord) -> Self {
        Self {
            event_id: record.event_id.clone(),
            event_type: record.event_type,
            event_time: record.event_time,
            component_name: record.component_name.clone(),
        }
    }
}

fn hash_one<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Immutable index over one batch of provenance events.
///
/// Built once, then shared read-only (typically behind an `Arc`) by any
/// number of analyzers.
#[derive(Debug, Default)]
pub struct LineageIndex {
    events: Vec<FlowEventRecord>,
    by_id: HashMap<String, Vec<usize>>,
    by_component: HashMap<String, Vec<usize>>,
    parent_of: HashMap<String, Vec<Edge>>,
    children_of: HashMap<String, Vec<Edge>>,
    edge_count: usize,
    skipped: Vec<MalformedRecord>,
    now: Option<u64>,
    earliest: Option<u64>,
    fingerprint: u64,
}

impl LineageIndex {
    /// Validate raw loader rows and index the valid ones.
    ///
    /// Malformed rows never fail the batch: they are logged and kept in
    /// [`skipped`](Self::skipped).
    pub fn build<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RawFlowEvent>,
    {
        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for (position, row) in rows.into_iter().enumerate() {
            match row.validate(position) {
                Ok(record) => records.push(record),
                Err(malformed) => {
                    warn!("skipping malformed provenance record: {}", malformed);
                    skipped.push(malformed);
                }
            }
        }

        let mut index = Self::from_records(records);
        for malformed in &skipped {
            index.fingerprint = index.fingerprint.wrapping_add(hash_one(malformed));
        }
        index.skipped = skipped;
        index
    }

    /// Index already-validated records.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = FlowEventRecord>,
    {
        let events: Vec<FlowEventRecord> = records.into_iter().collect();

        let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_component: HashMap<String, Vec<usize>> = HashMap::new();
        let mut candidate_edges: Vec<(usize, &str, &str)> = Vec::new();
        let mut now: Option<u64> = None;
        let mut earliest: Option<u64> = None;
        let mut fingerprint: u64 = events.len() as u64;

        for (idx, event) in events.iter().enumerate() {
            by_id
                .entry(event.flowfile_id.clone())
                .or_default()
                .push(idx);
            by_component
                .entry(event.component_id.clone())
                .or_default()
                .push(idx);

            now = Some(now.map_or(event.event_time, |n| n.max(event.event_time)));
            earliest = Some(earliest.map_or(event.event_time, |e| e.min(event.event_time)));

            // Summed so that row order does not change the fingerprint.
            fingerprint = fingerprint.wrapping_add(hash_one(event));

            let own = event.flowfile_id.as_str();
            for parent in event.parent_ids.iter().filter(|p| p.as_str() != own) {
                candidate_edges.push((idx, parent.as_str(), own));
            }
            for child in event.child_ids.iter().filter(|c| c.as_str() != own) {
                candidate_edges.push((idx, own, child.as_str()));
            }
        }

        let by_time = |a: &usize, b: &usize| {
            let (ea, eb) = (&events[*a], &events[*b]);
            ea.event_time
                .cmp(&eb.event_time)
                .then_with(|| ea.event_id.cmp(&eb.event_id))
        };
        for indices in by_id.values_mut().chain(by_component.values_mut()) {
            indices.sort_by(by_time);
        }

        // The earliest recording of a relationship labels it; later
        // duplicates (e.g. a CLONE listing both ends) are dropped.
        candidate_edges.sort_by(|a, b| {
            by_time(&a.0, &b.0).then_with(|| (a.1, a.2).cmp(&(b.1, b.2)))
        });

        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut parent_of: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut children_of: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut edge_count = 0;

        for (idx, parent, child) in candidate_edges {
            if !seen.insert((parent, child)) {
                continue;
            }
            let edge = Edge {
                parent: parent.to_string(),
                child: child.to_string(),
                cause: EdgeCause::from_record(&events[idx]),
            };
            parent_of
                .entry(edge.child.clone())
                .or_default()
                .push(edge.clone());
            children_of
                .entry(edge.parent.clone())
                .or_default()
                .push(edge);
            edge_count += 1;
        }

        debug!(
            events = events.len(),
            flowfiles = by_id.len(),
            components = by_component.len(),
            edges = edge_count,
            "lineage index built"
        );

        Self {
            events,
            by_id,
            by_component,
            parent_of,
            children_of,
            edge_count,
            skipped: Vec::new(),
            now,
            earliest,
            fingerprint,
        }
    }

    /// All indexed events, in delivery order.
    pub fn events(&self) -> &[FlowEventRecord] {
        &self.events
    }

    /// Indexed events of one type, in delivery order.
    pub fn events_of_type(&self, event_type: EventType) -> impl Iterator<Item = &FlowEventRecord> {
        self.events
            .iter()
            .filter(move |e| e.event_type == event_type)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events of one flowfile, sorted by time (ties by event id).
    pub fn history(&self, flowfile_id: &str) -> Vec<&FlowEventRecord> {
        self.resolve(self.by_id.get(flowfile_id))
    }

    fn resolve(&self, indices: Option<&Vec<usize>>) -> Vec<&FlowEventRecord> {
        indices
            .map(|indices| indices.iter().map(|&i| &self.events[i]).collect())
            .unwrap_or_default()
    }

    /// Display name of a component, taken from its earliest event.
    pub fn component_name(&self, component_id: &str) -> Option<&str> {
        self.by_component
            .get(component_id)
            .and_then(|indices| indices.first())
            .map(|&i| self.events[i].component_name.as_str())
    }

    /// First event of a flowfile, if it has any in this batch.
    pub fn first_event(&self, flowfile_id: &str) -> Option<&FlowEventRecord> {
        self.by_id
            .get(flowfile_id)
            .and_then(|indices| indices.first())
            .map(|&i| &self.events[i])
    }

    /// Whether the flowfile has at least one event in this batch.
    pub fn is_tracked(&self, flowfile_id: &str) -> bool {
        self.by_id.contains_key(flowfile_id)
    }

    /// Distinct flowfile ids with events in this batch (unordered).
    pub fn flowfile_ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }

    /// Distinct component ids with events in this batch (unordered).
    pub fn component_ids(&self) -> impl Iterator<Item = &str> {
        self.by_component.keys().map(String::as_str)
    }

    pub fn flowfile_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn component_count(&self) -> usize {
        self.by_component.len()
    }

    /// Edges pointing at `flowfile_id` from its parents.
    pub fn parents(&self, flowfile_id: &str) -> &[Edge] {
        self.parent_of
            .get(flowfile_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Edges from `flowfile_id` to its children.
    pub fn children(&self, flowfile_id: &str) -> &[Edge] {
        self.children_of
            .get(flowfile_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether any parent of `flowfile_id` has events in this batch.
    pub fn has_tracked_parent(&self, flowfile_id: &str) -> bool {
        self.parents(flowfile_id)
            .iter()
            .any(|e| self.is_tracked(&e.parent))
    }

    /// Every edge once, grouped by parent.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.children_of.values().flatten()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Edges with at least one end outside the batch.
    pub fn dangling_edge_count(&self) -> usize {
        self.edges()
            .filter(|e| !self.is_tracked(&e.parent) || !self.is_tracked(&e.child))
            .count()
    }

    /// Rows excluded from indexing.
    pub fn skipped(&self) -> &[MalformedRecord] {
        &self.skipped
    }

    /// Latest event time in the batch; the reference point for windows.
    pub fn now(&self) -> Option<u64> {
        self.now
    }

    /// Earliest event time in the batch.
    pub fn earliest_time(&self) -> Option<u64> {
        self.earliest
    }

    /// Deterministic, row-order independent identifier of the batch contents.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}
