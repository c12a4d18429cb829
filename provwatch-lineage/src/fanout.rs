//! FORK and JOIN fan-out/fan-in statistics.

use std::collections::HashMap;

use provwatch_types::{EventType, FlowEventRecord};
use serde::{Deserialize, Serialize};

use crate::bottleneck::percentile;
use crate::index::LineageIndex;

/// Fan statistics for one component.
///
/// For FORK the fan of an event is its number of children; for JOIN it is
/// its number of parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanStats {
    pub component_id: String,
    pub component_name: String,
    pub event_count: usize,
    pub avg_fan: f64,
    pub median_fan: u64,
    pub max_fan: u64,
}

/// Result of [`analyze_fork_join`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForkJoinReport {
    pub forks: Vec<FanStats>,
    pub joins: Vec<FanStats>,
}

/// Summarize data splitting (FORK) and merging (JOIN) per component.
pub fn analyze_fork_join(index: &LineageIndex) -> ForkJoinReport {
    ForkJoinReport {
        forks: fan_stats(index, EventType::Fork, |e| e.child_ids.len()),
        joins: fan_stats(index, EventType::Join, |e| e.parent_ids.len()),
    }
}

fn fan_stats(
    index: &LineageIndex,
    event_type: EventType,
    fan: impl Fn(&FlowEventRecord) -> usize,
) -> Vec<FanStats> {
    let mut groups: HashMap<&str, Vec<u64>> = HashMap::new();
    for event in index.events_of_type(event_type) {
        groups
            .entry(event.component_id.as_str())
            .or_default()
            .push(fan(event) as u64);
    }

    let mut stats: Vec<FanStats> = groups
        .into_iter()
        .map(|(component_id, mut fans)| {
            fans.sort_unstable();
            let event_count = fans.len();
            FanStats {
                component_id: component_id.to_string(),
                component_name: index
                    .component_name(component_id)
                    .unwrap_or(component_id)
                    .to_string(),
                event_count,
                avg_fan: fans.iter().sum::<u64>() as f64 / event_count as f64,
                median_fan: percentile(&fans, 50.0).unwrap_or(0),
                max_fan: fans.last().copied().unwrap_or(0),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then_with(|| a.component_name.cmp(&b.component_name))
            .then_with(|| a.component_id.cmp(&b.component_id))
    });
    stats
}
