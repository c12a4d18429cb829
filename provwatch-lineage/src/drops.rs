//! Data loss detection from DROP events.

use std::collections::HashMap;

use provwatch_types::{EventType, FlowEventRecord};
use serde::{Deserialize, Serialize};

use crate::index::LineageIndex;

/// Default look-back window.
pub const DEFAULT_WINDOW_MINUTES: u64 = 60;

/// Default minimum number of drops for a component to be reported.
pub const DEFAULT_MIN_DROPS: usize = 5;

const MILLIS_PER_MINUTE: u64 = 60_000;

/// Parameters for [`detect_drops`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropQuery {
    pub time_window_minutes: u64,
    pub min_drops: usize,
}

impl Default for DropQuery {
    fn default() -> Self {
        Self {
            time_window_minutes: DEFAULT_WINDOW_MINUTES,
            min_drops: DEFAULT_MIN_DROPS,
        }
    }
}

/// A distinct `details` value seen on drops, with its frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropReason {
    pub reason: String,
    pub count: usize,
}

/// One component that removed flowfiles within the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRow {
    pub component_id: String,
    pub component_name: String,
    pub drop_count: usize,
    /// Sum of known file sizes; drops without a size contribute nothing.
    pub total_bytes: u64,
    /// Candidate reasons, most frequent first.
    pub reasons: Vec<DropReason>,
}

/// Result of [`detect_drops`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DropReport {
    /// Latest event time in the batch; `None` for an empty batch.
    pub now: Option<u64>,
    /// Inclusive start of the window.
    pub window_start: Option<u64>,
    /// Components by drop count descending.
    pub rows: Vec<DropRow>,
}

/// Find components dropping at least `min_drops` flowfiles in the window
/// ending at the batch's latest event.
///
/// The reference time comes from the data rather than the wall clock, so
/// historical batches give the same answer whenever they are analyzed.
pub fn detect_drops(index: &LineageIndex, query: &DropQuery) -> DropReport {
    let Some(now) = index.now() else {
        return DropReport::default();
    };
    let window_start =
        now.saturating_sub(query.time_window_minutes.saturating_mul(MILLIS_PER_MINUTE));

    let mut groups: HashMap<&str, Vec<&FlowEventRecord>> = HashMap::new();
    for event in index
        .events_of_type(EventType::Drop)
        .filter(|e| (window_start..=now).contains(&e.event_time))
    {
        groups
            .entry(event.component_id.as_str())
            .or_default()
            .push(event);
    }

    let mut rows: Vec<DropRow> = groups
        .into_iter()
        .filter(|(_, drops)| drops.len() >= query.min_drops)
        .map(|(component_id, drops)| DropRow {
            component_id: component_id.to_string(),
            component_name: index
                .component_name(component_id)
                .unwrap_or(component_id)
                .to_string(),
            drop_count: drops.len(),
            total_bytes: drops.iter().filter_map(|e| e.file_size).sum(),
            reasons: rank_reasons(&drops),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.drop_count
            .cmp(&a.drop_count)
            .then_with(|| a.component_name.cmp(&b.component_name))
            .then_with(|| a.component_id.cmp(&b.component_id))
    });

    DropReport {
        now: Some(now),
        window_start: Some(window_start),
        rows,
    }
}

fn rank_reasons(drops: &[&FlowEventRecord]) -> Vec<DropReason> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for details in drops.iter().filter_map(|e| e.details.as_deref()) {
        *counts.entry(details).or_default() += 1;
    }

    let mut reasons: Vec<DropReason> = counts
        .into_iter()
        .map(|(reason, count)| DropReason {
            reason: reason.to_string(),
            count,
        })
        .collect();
    reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{event, sized};

    fn drop_at(id: &str, time: u64, component: &str) -> FlowEventRecord {
        event(id, &format!("ff-{}", id), EventType::Drop, time, component)
    }

    #[test]
    fn test_create_route_drop_scenario() {
        let index = LineageIndex::from_records(vec![
            event("e1", "f1", EventType::Create, 0, "gen"),
            event("e2", "f1", EventType::Route, 5, "route"),
            drop_at("e3", 10, "X"),
        ]);
        let query = DropQuery {
            time_window_minutes: 60,
            min_drops: 1,
        };

        let report = detect_drops(&index, &query);
        assert_eq!(report.now, Some(10));
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].component_id, "X");
        assert_eq!(report.rows[0].drop_count, 1);
    }

    #[test]
    fn test_min_drops_zero_gives_row_per_dropping_component() {
        let index = LineageIndex::from_records(vec![
            drop_at("a1", 1, "A"),
            drop_at("a2", 2, "A"),
            drop_at("b1", 3, "B"),
            event("c1", "ff-c", EventType::Route, 4, "C"),
        ]);
        let query = DropQuery {
            min_drops: 0,
            ..Default::default()
        };

        let report = detect_drops(&index, &query);
        let ids: Vec<_> = report
            .rows
            .iter()
            .map(|r| r.component_id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_window_excludes_old_drops() {
        let hour = 60 * MILLIS_PER_MINUTE;
        let index = LineageIndex::from_records(vec![
            drop_at("old", 0, "A"),
            drop_at("edge", hour, "A"),
            drop_at("new", 2 * hour, "A"),
        ]);
        let query = DropQuery {
            time_window_minutes: 60,
            min_drops: 0,
        };

        let report = detect_drops(&index, &query);
        assert_eq!(report.window_start, Some(hour));
        // The window is inclusive at both ends.
        assert_eq!(report.rows[0].drop_count, 2);
    }

    #[test]
    fn test_threshold_bytes_and_reasons() {
        let mut records = Vec::new();
        let reasons = ["expired", "expired", "rejected", "expired", "rejected"];
        for (i, reason) in reasons.iter().enumerate() {
            let mut drop = sized(drop_at(&format!("a{}", i), i as u64, "A"), 100);
            drop.details = Some(reason.to_string());
            records.push(drop);
        }
        records.push(drop_at("a-unsized", 6, "A"));
        records.push(drop_at("b1", 7, "B"));
        let index = LineageIndex::from_records(records);

        let report = detect_drops(&index, &DropQuery::default());
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.drop_count, 6);
        assert_eq!(row.total_bytes, 500);
        assert_eq!(
            row.reasons,
            vec![
                DropReason {
                    reason: "expired".into(),
                    count: 3,
                },
                DropReason {
                    reason: "rejected".into(),
                    count: 2,
                },
            ]
        );
    }

    #[test]
    fn test_sorted_by_count() {
        let mut records = vec![drop_at("a1", 1, "A")];
        for i in 0..3 {
            records.push(drop_at(&format!("b{}", i), 2, "B"));
        }
        let index = LineageIndex::from_records(records);

        let query = DropQuery {
            min_drops: 1,
            ..Default::default()
        };
        let report = detect_drops(&index, &query);
        assert_eq!(report.rows[0].component_id, "B");
        assert_eq!(report.rows[1].component_id, "A");
    }

    #[test]
    fn test_empty_batch() {
        let index = LineageIndex::from_records(Vec::new());
        assert_eq!(
            detect_drops(&index, &DropQuery::default()),
            DropReport::default()
        );
    }
}
