//! Traversal path mining.
//!
//! Each root flowfile's history is reduced to a sequence of
//! `ComponentName(EVENT_TYPE)` tokens; identical sequences are counted
//! together to show which routes through the flow are most common.

use std::collections::HashMap;
use std::fmt;

use provwatch_types::EventType;
use serde::{Deserialize, Serialize};

use crate::index::{Edge, LineageIndex};

/// Separator between tokens in a canonical path string.
pub const PATH_SEPARATOR: &str = " → ";

/// Default number of paths returned.
pub const DEFAULT_TOP_N: usize = 10;

/// One step of a flow path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathToken {
    pub component_name: String,
    pub event_type: EventType,
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.component_name, self.event_type)
    }
}

/// How a flowfile's path ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEnd {
    /// Removed from the flow by a DROP event.
    Dropped,
    /// Transferred out of the flow by a SEND event.
    Sent,
    /// Absorbed into a merged flowfile by a JOIN event.
    Joined,
    /// The batch ended before the flowfile's history did.
    Incomplete,
}

impl PathEnd {
    fn from_last(event_type: EventType) -> Self {
        match event_type {
            EventType::Drop => PathEnd::Dropped,
            EventType::Send => PathEnd::Sent,
            EventType::Join => PathEnd::Joined,
            _ => PathEnd::Incomplete,
        }
    }
}

/// A distinct traversal path and how many root flowfiles followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPath {
    pub tokens: Vec<PathToken>,
    /// Tokens joined by [`PATH_SEPARATOR`].
    pub canonical: String,
    pub count: usize,
    pub end: PathEnd,
}

/// Parameters for [`mine_paths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathQuery {
    pub top_n: usize,
}

impl Default for PathQuery {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Result of [`mine_paths`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathReport {
    /// Number of root flowfiles walked; equals the sum of all path counts.
    pub total_roots: usize,
    /// Number of distinct token sequences before the top-N cut.
    pub distinct_paths: usize,
    /// Most frequent paths, by count descending then canonical string.
    pub paths: Vec<FlowPath>,
}

/// Whether `flowfile_id` starts a path.
///
/// Roots are flowfiles whose first event in the batch is CREATE or RECEIVE,
/// and flowfiles with no tracked parent (FORK children whose parent is
/// outside the window, or histories that began before it).
pub fn is_root(index: &LineageIndex, flowfile_id: &str) -> bool {
    match index.first_event(flowfile_id) {
        Some(first) => first.event_type.is_origin() || !index.has_tracked_parent(flowfile_id),
        None => false,
    }
}

/// Walk one flowfile's history up to the first terminal event.
///
/// A JOIN is usually recorded on the merged output only, so an input
/// listed in some JOIN's parents is treated as absorbed at that event's
/// time even when its own history carries no JOIN.
pub fn path_of(index: &LineageIndex, flowfile_id: &str) -> (Vec<PathToken>, PathEnd) {
    // Child edges are ordered by their causing event, so this is the first JOIN.
    let absorbed_by = index
        .children(flowfile_id)
        .iter()
        .find(|edge| edge.cause.event_type == EventType::Join);
    let join_token = |edge: &Edge| PathToken {
        component_name: edge.cause.component_name.clone(),
        event_type: EventType::Join,
    };

    let mut tokens = Vec::new();
    for event in index.history(flowfile_id) {
        if let Some(edge) = absorbed_by {
            if event.event_time > edge.cause.event_time {
                tokens.push(join_token(edge));
                return (tokens, PathEnd::Joined);
            }
        }
        tokens.push(PathToken {
            component_name: event.component_name.clone(),
            event_type: event.event_type,
        });
        if event.event_type.is_terminal() {
            return (tokens, PathEnd::from_last(event.event_type));
        }
    }

    match absorbed_by {
        Some(edge) => {
            tokens.push(join_token(edge));
            (tokens, PathEnd::Joined)
        }
        None => (tokens, PathEnd::Incomplete),
    }
}

/// Mine the most common traversal paths in the batch.
pub fn mine_paths(index: &LineageIndex, query: &PathQuery) -> PathReport {
    let mut groups: HashMap<Vec<PathToken>, (usize, PathEnd)> = HashMap::new();
    let mut total_roots = 0;

    for id in index.flowfile_ids().filter(|id| is_root(index, id)) {
        let (tokens, end) = path_of(index, id);
        total_roots += 1;
        groups.entry(tokens).or_insert((0, end)).0 += 1;
    }

    let distinct_paths = groups.len();
    let mut paths: Vec<FlowPath> = groups
        .into_iter()
        .map(|(tokens, (count, end))| {
            let canonical = tokens
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(PATH_SEPARATOR);
            FlowPath {
                tokens,
                canonical,
                count,
                end,
            }
        })
        .collect();

    paths.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.canonical.cmp(&b.canonical))
    });
    paths.truncate(query.top_n);

    PathReport {
        total_roots,
        distinct_paths,
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{event, fork, join};
    use provwatch_types::FlowEventRecord;

    fn linear(ff: &str, start: u64, steps: &[(EventType, &str)]) -> Vec<FlowEventRecord> {
        steps
            .iter()
            .enumerate()
            .map(|(i, (t, c))| event(&format!("{}-{}", ff, i), ff, *t, start + i as u64, c))
            .collect()
    }

    fn create_then(ff: &str, last: (EventType, &str)) -> Vec<FlowEventRecord> {
        linear(ff, 0, &[(EventType::Create, "Gen"), last])
    }

    #[test]
    fn test_identical_sequences_collapse() {
        let steps = [
            (EventType::Create, "Gen"),
            (EventType::Route, "Route"),
            (EventType::Drop, "Sink"),
        ];
        let mut records = linear("a", 0, &steps);
        records.extend(linear("b", 100, &steps));
        let index = LineageIndex::from_records(records);

        let report = mine_paths(&index, &PathQuery::default());
        assert_eq!(report.paths.len(), 1);
        assert_eq!(report.paths[0].count, 2);
        assert_eq!(
            report.paths[0].canonical,
            "Gen(CREATE) → Route(ROUTE) → Sink(DROP)"
        );
        assert_eq!(report.paths[0].end, PathEnd::Dropped);
    }

    #[test]
    fn test_single_event_is_one_token_path() {
        let index = LineageIndex::from_records(linear("a", 0, &[(EventType::Receive, "Listen")]));

        let report = mine_paths(&index, &PathQuery::default());
        assert_eq!(report.paths[0].tokens.len(), 1);
        assert_eq!(report.paths[0].canonical, "Listen(RECEIVE)");
        assert_eq!(report.paths[0].end, PathEnd::Incomplete);
    }

    #[test]
    fn test_walk_stops_at_terminal_event() {
        let index = LineageIndex::from_records(linear(
            "a",
            0,
            &[
                (EventType::Create, "Gen"),
                (EventType::Send, "Put"),
                (EventType::Route, "Late"),
            ],
        ));

        let (tokens, end) = path_of(&index, "a");
        assert_eq!(tokens.len(), 2);
        assert_eq!(end, PathEnd::Sent);
    }

    #[test]
    fn test_join_recorded_on_output_absorbs_inputs() {
        let mut records = create_then("a", (EventType::Route, "Route"));
        records.push(join("m-join", "m", &["a"], 5, "Merge"));
        records.push(event("a-late", "a", EventType::Route, 6, "Late"));
        records.push(event("m-send", "m", EventType::Send, 9, "Put"));
        let index = LineageIndex::from_records(records);

        let (tokens, end) = path_of(&index, "a");
        assert_eq!(end, PathEnd::Joined);
        let names: Vec<_> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["Gen(CREATE)", "Route(ROUTE)", "Merge(JOIN)"]);

        // The merged output has a tracked parent and does not start with an
        // origin event, so it is not a root of its own.
        assert!(!is_root(&index, "m"));
        let report = mine_paths(&index, &PathQuery::default());
        assert_eq!(report.total_roots, 1);
    }

    #[test]
    fn test_join_in_own_history_is_terminal() {
        let mut records = linear("a", 0, &[(EventType::Create, "Gen")]);
        let mut own_join = event("a-join", "a", EventType::Join, 5, "Merge");
        own_join.child_ids = vec!["m".into()];
        records.push(own_join);
        records.push(event("a-late", "a", EventType::Route, 6, "Late"));
        let index = LineageIndex::from_records(records);

        let (tokens, end) = path_of(&index, "a");
        assert_eq!(end, PathEnd::Joined);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_fork_children_roots_depend_on_parent_visibility() {
        // "c2" names parent "q", which has no events in the batch.
        let mut orphan = event("c2-0", "c2", EventType::Clone, 1, "Dup");
        orphan.parent_ids = vec!["q".into()];

        let index = LineageIndex::from_records(vec![
            event("p0", "p", EventType::Create, 0, "Gen"),
            fork("p1", "p", &["c1"], 1, "Split"),
            event("c1-0", "c1", EventType::Route, 2, "Route"),
            orphan,
            event("c2-1", "c2", EventType::Route, 2, "Route"),
        ]);

        assert!(!index.is_tracked("q"));
        assert!(is_root(&index, "p"));
        assert!(!is_root(&index, "c1"));
        assert!(is_root(&index, "c2"));
        assert!(!is_root(&index, "q"));
    }

    #[test]
    fn test_counts_sum_to_roots() {
        let mut records = create_then("a", (EventType::Drop, "X"));
        records.extend(create_then("b", (EventType::Send, "Y")));
        records.extend(linear("c", 0, &[(EventType::Receive, "Listen")]));
        records.extend(create_then("d", (EventType::Drop, "X")));
        let index = LineageIndex::from_records(records);

        let report = mine_paths(&index, &PathQuery { top_n: 100 });
        let sum: usize = report.paths.iter().map(|p| p.count).sum();
        assert_eq!(sum, report.total_roots);
        assert_eq!(report.total_roots, 4);
        assert_eq!(report.distinct_paths, 3);
    }

    #[test]
    fn test_sort_and_top_n() {
        let mut records = Vec::new();
        for ff in ["a", "b", "c"] {
            records.extend(create_then(ff, (EventType::Drop, "Z")));
        }
        records.extend(create_then("d", (EventType::Drop, "B")));
        records.extend(create_then("e", (EventType::Drop, "A")));
        let index = LineageIndex::from_records(records);

        let report = mine_paths(&index, &PathQuery { top_n: 2 });
        assert_eq!(report.distinct_paths, 3);
        assert_eq!(report.paths.len(), 2);
        assert_eq!(report.paths[0].count, 3);
        // Equal counts break ties on the canonical string.
        assert_eq!(report.paths[1].canonical, "Gen(CREATE) → A(DROP)");
    }

    #[test]
    fn test_empty_batch() {
        let index = LineageIndex::from_records(Vec::new());
        let report = mine_paths(&index, &PathQuery::default());
        assert_eq!(report, PathReport::default());
    }
}
