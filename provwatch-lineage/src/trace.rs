//! Ancestor/descendant tracing for a single flowfile.
//!
//! The reachable lineage is a DAG: FORK splits, JOIN merges and CLONE
//! copies. It is collected into a [`LineageGraph`], checked for cycles and
//! for time running backwards along an edge, and then rendered as a pair of
//! trees rooted at the traced flowfile. Shared ancestors are repeated on
//! every branch that reaches them, so the output is finite and needs no
//! back-references.
//!
//! ```text
//!            ancestors (next = parents)
//!      gone[boundary]   p ─┐
//!              └─ JOIN ──┐ │ FORK
//!                        ▼ ▼
//!                      [traced]
//!                        │ FORK
//!              ┌─────────┴─────────┐
//!              ▼                   ▼
//!             c1                  c2       descendants (next = children)
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use provwatch_types::FlowEventRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConsistencyError, LineageError, Result};
use crate::index::{Edge, EdgeCause, LineageIndex};

/// Options for [`trace_lineage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceOptions {
    /// Stop descending after this many hops from the traced flowfile.
    pub max_depth: Option<usize>,
}

/// The reachable lineage of one flowfile as a flat DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGraph {
    /// Node ids in topological order (parents before children).
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

/// How a [`TraceNode`] relates to the loaded batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The flowfile has events in the batch.
    Tracked,
    /// Referenced by an edge but outside the batch window.
    Boundary,
    /// Not expanded because of [`TraceOptions::max_depth`].
    Truncated,
}

/// One flowfile in a rendered lineage tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceNode {
    pub flowfile_id: String,
    pub kind: NodeKind,
    /// The FORK/JOIN/CLONE event that links this node to the previous one.
    pub via: EdgeCause,
    /// Time-sorted events; empty unless the node is tracked.
    pub events: Vec<FlowEventRecord>,
    /// Parents in an ancestor tree, children in a descendant tree.
    pub next: Vec<TraceNode>,
}

/// Full lineage of one flowfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageTrace {
    pub flowfile_id: String,
    /// Time-sorted events of the traced flowfile itself.
    pub events: Vec<FlowEventRecord>,
    pub ancestors: Vec<TraceNode>,
    pub descendants: Vec<TraceNode>,
    pub graph: LineageGraph,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn edges<'a>(self, index: &'a LineageIndex, flowfile_id: &str) -> &'a [Edge] {
        match self {
            Direction::Up => index.parents(flowfile_id),
            Direction::Down => index.children(flowfile_id),
        }
    }

    fn next(self, edge: &Edge) -> &str {
        match self {
            Direction::Up => &edge.parent,
            Direction::Down => &edge.child,
        }
    }
}

/// Trace every ancestor and descendant of `flowfile_id`.
///
/// Fails with [`LineageError::NotFound`] when the flowfile has no events in
/// the batch, and with [`LineageError::Consistency`] when the reachable
/// lineage contains a cycle or an edge whose child starts no later than its
/// parent.
pub fn trace_lineage(
    index: &LineageIndex,
    flowfile_id: &str,
    options: &TraceOptions,
) -> Result<LineageTrace> {
    if !index.is_tracked(flowfile_id) {
        return Err(LineageError::NotFound(flowfile_id.to_string()));
    }

    let mut graph = LineageGraph::collect(index, flowfile_id);
    graph.verify(index)?;
    debug!(
        flowfile_id,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "lineage graph verified"
    );

    let render = |direction: Direction| -> Vec<TraceNode> {
        direction
            .edges(index, flowfile_id)
            .iter()
            .map(|edge| render_node(index, edge, direction, 1, options.max_depth))
            .collect()
    };

    Ok(LineageTrace {
        flowfile_id: flowfile_id.to_string(),
        events: owned_history(index, flowfile_id),
        ancestors: render(Direction::Up),
        descendants: render(Direction::Down),
        graph,
    })
}

fn owned_history(index: &LineageIndex, flowfile_id: &str) -> Vec<FlowEventRecord> {
    index.history(flowfile_id).into_iter().cloned().collect()
}

fn render_node(
    index: &LineageIndex,
    edge: &Edge,
    direction: Direction,
    depth: usize,
    max_depth: Option<usize>,
) -> TraceNode {
    let flowfile_id = direction.next(edge);
    let leaf = |kind| TraceNode {
        flowfile_id: flowfile_id.to_string(),
        kind,
        via: edge.cause.clone(),
        events: Vec::new(),
        next: Vec::new(),
    };

    if max_depth.is_some_and(|max| depth > max) {
        return leaf(NodeKind::Truncated);
    }
    if !index.is_tracked(flowfile_id) {
        return leaf(NodeKind::Boundary);
    }

    TraceNode {
        flowfile_id: flowfile_id.to_string(),
        kind: NodeKind::Tracked,
        via: edge.cause.clone(),
        events: owned_history(index, flowfile_id),
        next: direction
            .edges(index, flowfile_id)
            .iter()
            .map(|next| render_node(index, next, direction, depth + 1, max_depth))
            .collect(),
    }
}

impl LineageGraph {
    /// Walk parents backward and children forward from `flowfile_id`.
    ///
    /// Untracked ids are included as nodes but never expanded.
    fn collect<'a>(index: &'a LineageIndex, flowfile_id: &'a str) -> Self {
        let mut nodes = vec![flowfile_id.to_string()];
        let mut edges = Vec::new();
        let mut seen_nodes: HashSet<&str> = HashSet::from([flowfile_id]);
        let mut seen_edges: HashSet<(&str, &str)> = HashSet::new();

        for direction in [Direction::Up, Direction::Down] {
            let mut queue = VecDeque::from([flowfile_id]);
            let mut visited: HashSet<&str> = HashSet::from([flowfile_id]);

            while let Some(id) = queue.pop_front() {
                if !index.is_tracked(id) {
                    continue;
                }
                for edge in direction.edges(index, id) {
                    if seen_edges.insert((edge.parent.as_str(), edge.child.as_str())) {
                        edges.push(edge.clone());
                    }
                    let next = direction.next(edge);
                    if seen_nodes.insert(next) {
                        nodes.push(next.to_string());
                    }
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        Self { nodes, edges }
    }

    /// Topologically sort the nodes and check edge timing.
    fn verify(&mut self, index: &LineageIndex) -> std::result::Result<(), ConsistencyError> {
        let order = {
            let mut in_degree: HashMap<&str, usize> =
                self.nodes.iter().map(|n| (n.as_str(), 0)).collect();
            let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
            for edge in &self.edges {
                if let Some(degree) = in_degree.get_mut(edge.child.as_str()) {
                    *degree += 1;
                }
                outgoing
                    .entry(edge.parent.as_str())
                    .or_default()
                    .push(edge.child.as_str());
            }

            let mut ready: VecDeque<&str> = self
                .nodes
                .iter()
                .map(String::as_str)
                .filter(|n| in_degree.get(n) == Some(&0))
                .collect();
            let mut order: Vec<String> = Vec::with_capacity(self.nodes.len());

            while let Some(node) = ready.pop_front() {
                order.push(node.to_string());
                for &child in outgoing.get(node).map(Vec::as_slice).unwrap_or(&[]) {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.push_back(child);
                        }
                    }
                }
            }

            if order.len() < self.nodes.len() {
                let mut stuck: Vec<String> = in_degree
                    .into_iter()
                    .filter(|(_, degree)| *degree > 0)
                    .map(|(node, _)| node.to_string())
                    .collect();
                stuck.sort();
                return Err(ConsistencyError::Cycle(stuck));
            }
            order
        };
        self.nodes = order;

        for edge in &self.edges {
            let parent = index.first_event(&edge.parent);
            let child = index.first_event(&edge.child);
            let (Some(parent), Some(child)) = (parent, child) else {
                continue;
            };
            if parent.event_time >= child.event_time {
                return Err(ConsistencyError::NonMonotonic {
                    parent: edge.parent.clone(),
                    child: edge.child.clone(),
                    parent_time: parent.event_time,
                    child_time: child.event_time,
                });
            }
        }
        Ok(())
    }
}

impl LineageTrace {
    /// Every traced event once, sorted by time then event id.
    pub fn flatten(&self) -> Vec<&FlowEventRecord> {
        let mut events: Vec<&FlowEventRecord> = self.events.iter().collect();
        let mut stack: Vec<&TraceNode> = self.ancestors.iter().chain(&self.descendants).collect();
        while let Some(node) = stack.pop() {
            events.extend(&node.events);
            stack.extend(&node.next);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        events.retain(|event| seen.insert(event.event_id.as_str()));
        events.sort_by(|a, b| {
            a.event_time
                .cmp(&b.event_time)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{event, fork, join};
    use provwatch_types::EventType;

    fn trace(index: &LineageIndex, id: &str) -> Result<LineageTrace> {
        trace_lineage(index, id, &TraceOptions::default())
    }

    #[test]
    fn test_fork_into_drop_and_send_branches() {
        let index = LineageIndex::from_records(vec![
            fork("e1", "f1", &["f2", "f3"], 0, "Split"),
            event("e2", "f2", EventType::Drop, 5, "Sink"),
            event("e3", "f3", EventType::Send, 5, "Put"),
        ]);

        let trace = trace(&index, "f1").unwrap();
        assert!(trace.ancestors.is_empty());
        assert_eq!(trace.descendants.len(), 2);

        let ends: Vec<_> = trace
            .descendants
            .iter()
            .map(|n| (n.flowfile_id.as_str(), n.events.last().map(|e| e.event_type)))
            .collect();
        assert_eq!(
            ends,
            vec![
                ("f2", Some(EventType::Drop)),
                ("f3", Some(EventType::Send))
            ]
        );
        assert!(trace
            .descendants
            .iter()
            .all(|n| n.via.event_type == EventType::Fork));
        assert_eq!(trace.graph.nodes[0], "f1");
    }

    #[test]
    fn test_linear_trace_matches_history() {
        let index = LineageIndex::from_records(vec![
            event("e3", "a", EventType::Drop, 9, "Sink"),
            event("e1", "a", EventType::Create, 1, "Gen"),
            event("e2", "a", EventType::Route, 4, "Route"),
            event("x1", "other", EventType::Create, 2, "Gen"),
        ]);

        let trace = trace(&index, "a").unwrap();
        assert_eq!(trace.flatten(), index.history("a"));
        assert_eq!(trace.graph.nodes, vec!["a".to_string()]);
        assert!(trace.graph.edges.is_empty());
    }

    #[test]
    fn test_not_found() {
        let index = LineageIndex::from_records(vec![event("e1", "a", EventType::Create, 0, "Gen")]);

        let err = trace(&index, "missing").unwrap_err();
        assert!(matches!(err, LineageError::NotFound(id) if id == "missing"));
    }

    #[test]
    fn test_shared_ancestor_repeated_per_branch() {
        let index = LineageIndex::from_records(vec![
            event("p0", "p", EventType::Create, 0, "Gen"),
            fork("p1", "p", &["x", "y"], 1, "Split"),
            event("x0", "x", EventType::Route, 2, "Route"),
            event("y0", "y", EventType::Route, 2, "Route"),
            join("m0", "m", &["x", "y"], 5, "Merge"),
        ]);

        let trace = trace(&index, "m").unwrap();
        let parents: Vec<_> = trace
            .ancestors
            .iter()
            .map(|n| n.flowfile_id.as_str())
            .collect();
        assert_eq!(parents, vec!["x", "y"]);
        for branch in &trace.ancestors {
            assert_eq!(branch.via.event_type, EventType::Join);
            assert_eq!(branch.next.len(), 1);
            assert_eq!(branch.next[0].flowfile_id, "p");
            assert_eq!(branch.next[0].events.len(), 2);
        }

        // p's events appear on both branches but only once when flattened.
        assert_eq!(trace.flatten().len(), 5);
        assert_eq!(trace.graph.nodes.first().map(String::as_str), Some("p"));
        assert_eq!(trace.graph.nodes.last().map(String::as_str), Some("m"));
    }

    #[test]
    fn test_untracked_parent_is_boundary_leaf() {
        let index = LineageIndex::from_records(vec![
            event("a0", "a", EventType::Create, 0, "Gen"),
            join("m0", "m", &["a", "gone"], 5, "Merge"),
        ]);

        let trace = trace(&index, "m").unwrap();
        let kinds: Vec<_> = trace
            .ancestors
            .iter()
            .map(|n| (n.flowfile_id.as_str(), n.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![("a", NodeKind::Tracked), ("gone", NodeKind::Boundary)]
        );
        assert!(trace.ancestors[1].events.is_empty());
    }

    #[test]
    fn test_max_depth_truncates() {
        let index = LineageIndex::from_records(vec![
            fork("a1", "a", &["b"], 0, "Split"),
            fork("b1", "b", &["c"], 1, "Split"),
            event("c1", "c", EventType::Drop, 2, "Sink"),
        ]);

        let truncated = trace_lineage(&index, "a", &TraceOptions { max_depth: Some(1) }).unwrap();
        let b = &truncated.descendants[0];
        assert_eq!(b.kind, NodeKind::Tracked);
        assert_eq!(b.next[0].flowfile_id, "c");
        assert_eq!(b.next[0].kind, NodeKind::Truncated);
        assert!(b.next[0].events.is_empty());

        let full = trace(&index, "a").unwrap();
        assert_eq!(full.descendants[0].next[0].kind, NodeKind::Tracked);
        assert_eq!(full.graph.nodes, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let index = LineageIndex::from_records(vec![
            fork("a1", "a", &["b"], 1, "Split"),
            fork("b1", "b", &["a"], 2, "Split"),
        ]);

        let err = trace(&index, "a").unwrap_err();
        match err {
            LineageError::Consistency(ConsistencyError::Cycle(nodes)) => {
                assert_eq!(nodes, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_child_older_than_parent_is_reported() {
        let index = LineageIndex::from_records(vec![
            event("c0", "c", EventType::Route, 5, "Route"),
            fork("p1", "p", &["c"], 10, "Split"),
        ]);

        let err = trace(&index, "p").unwrap_err();
        assert!(matches!(
            err,
            LineageError::Consistency(ConsistencyError::NonMonotonic {
                parent_time: 10,
                child_time: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_trace_serializes() {
        let index = LineageIndex::from_records(vec![
            fork("e1", "f1", &["f2"], 0, "Split"),
            event("e2", "f2", EventType::Drop, 5, "Sink"),
        ]);

        let json = serde_json::to_value(trace(&index, "f1").unwrap()).unwrap();
        assert_eq!(json["descendants"][0]["kind"], "tracked");
        assert_eq!(json["descendants"][0]["via"]["event_type"], "FORK");
    }
}
