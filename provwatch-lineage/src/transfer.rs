//! Inbound and outbound transfers grouped by external endpoint.

use std::collections::HashMap;
use std::fmt;

use provwatch_types::EventType;
use serde::{Deserialize, Serialize};

use crate::index::LineageIndex;

/// External endpoint of a transfer.
///
/// Transfers without a transit URI are kept under [`Endpoint::Unknown`];
/// a component sending to nowhere in particular is itself worth seeing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uri", rename_all = "snake_case")]
pub enum Endpoint {
    Uri(String),
    Unknown,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Uri(uri) => f.write_str(uri),
            Endpoint::Unknown => f.write_str("unknown"),
        }
    }
}

/// Aggregate of transfers between one component and one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRow {
    pub endpoint: Endpoint,
    pub component_id: String,
    pub component_name: String,
    pub count: usize,
    pub total_bytes: u64,
}

/// Result of [`analyze_transfers`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferReport {
    /// SEND events, by bytes descending.
    pub outbound: Vec<TransferRow>,
    /// RECEIVE events, by bytes descending.
    pub inbound: Vec<TransferRow>,
}

/// Aggregate SEND and RECEIVE events by `(transit_uri, component_id)`.
pub fn analyze_transfers(index: &LineageIndex) -> TransferReport {
    TransferReport {
        outbound: aggregate(index, EventType::Send),
        inbound: aggregate(index, EventType::Receive),
    }
}

fn aggregate(index: &LineageIndex, event_type: EventType) -> Vec<TransferRow> {
    let mut groups: HashMap<(Endpoint, &str), (usize, u64)> = HashMap::new();
    for event in index.events_of_type(event_type) {
        let endpoint = match &event.transit_uri {
            Some(uri) => Endpoint::Uri(uri.clone()),
            None => Endpoint::Unknown,
        };
        let entry = groups
            .entry((endpoint, event.component_id.as_str()))
            .or_default();
        entry.0 += 1;
        entry.1 += event.file_size.unwrap_or(0);
    }

    let mut rows: Vec<TransferRow> = groups
        .into_iter()
        .map(|((endpoint, component_id), (count, total_bytes))| TransferRow {
            endpoint,
            component_id: component_id.to_string(),
            component_name: index
                .component_name(component_id)
                .unwrap_or(component_id)
                .to_string(),
            count,
            total_bytes,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_bytes
            .cmp(&a.total_bytes)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.endpoint.cmp(&b.endpoint))
            .then_with(|| a.component_id.cmp(&b.component_id))
    });
    rows
}
