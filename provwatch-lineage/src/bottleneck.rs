//! Per-component duration statistics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LineageError, Result};
use crate::index::LineageIndex;

/// Default requested percentile.
pub const DEFAULT_PERCENTILE: f64 = 90.0;

/// Parameters for [`analyze_bottlenecks`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BottleneckQuery {
    /// Requested percentile, within `[0, 100]`.
    pub percentile: f64,
    /// Components with fewer duration samples are left out.
    pub min_samples: usize,
    /// Keep only the slowest `limit` components.
    pub limit: Option<usize>,
}

impl Default for BottleneckQuery {
    fn default() -> Self {
        Self {
            percentile: DEFAULT_PERCENTILE,
            min_samples: 1,
            limit: None,
        }
    }
}

/// Duration statistics for one component, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileStat {
    pub component_id: String,
    pub component_name: String,
    pub count: usize,
    pub mean: f64,
    pub p50: u64,
    /// The percentile that was requested.
    pub percentile: f64,
    /// Value at the requested percentile.
    pub p_n: u64,
    pub p95: u64,
    pub max: u64,
}

/// Nearest-rank percentile of an ascending slice.
///
/// Returns the value at index `clamp(ceil(p/100 * n) - 1, 0, n - 1)`, or
/// `None` for an empty slice.
pub fn percentile(sorted: &[u64], p: f64) -> Option<u64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    // Multiply before dividing so integral percentiles stay exact.
    let rank = (p * n as f64 / 100.0).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    Some(sorted[idx])
}

/// Compute duration statistics for every component with duration samples.
///
/// Sorted by mean descending, then component name.
pub fn analyze_bottlenecks(
    index: &LineageIndex,
    query: &BottleneckQuery,
) -> Result<Vec<PercentileStat>> {
    if !(0.0..=100.0).contains(&query.percentile) {
        return Err(LineageError::invalid(
            "percentile",
            format!("{} is not within [0, 100]", query.percentile),
        ));
    }

    let mut samples: HashMap<&str, Vec<u64>> = HashMap::new();
    for event in index.events() {
        if let Some(duration) = event.event_duration {
            samples
                .entry(event.component_id.as_str())
                .or_default()
                .push(duration);
        }
    }

    let min_samples = query.min_samples.max(1);
    let mut stats: Vec<PercentileStat> = samples
        .into_iter()
        .filter(|(_, durations)| durations.len() >= min_samples)
        .filter_map(|(component_id, mut durations)| {
            durations.sort_unstable();
            let count = durations.len();
            let mean = durations.iter().map(|&d| d as f64).sum::<f64>() / count as f64;
            Some(PercentileStat {
                component_id: component_id.to_string(),
                component_name: index
                    .component_name(component_id)
                    .unwrap_or(component_id)
                    .to_string(),
                count,
                mean,
                p50: percentile(&durations, 50.0)?,
                percentile: query.percentile,
                p_n: percentile(&durations, query.percentile)?,
                p95: percentile(&durations, 95.0)?,
                max: *durations.last()?,
            })
        })
        .collect();

    stats.sort_by(|a, b| {
        b.mean
            .total_cmp(&a.mean)
            .then_with(|| a.component_name.cmp(&b.component_name))
            .then_with(|| a.component_id.cmp(&b.component_id))
    });
    if let Some(limit) = query.limit {
        stats.truncate(limit);
    }

    Ok(stats)
}
