//! Content and attribute modification counts.

use std::collections::HashMap;

use provwatch_types::EventType;
use serde::{Deserialize, Serialize};

use crate::index::LineageIndex;

/// Parameters for [`analyze_modifications`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModificationQuery {
    /// Keep only the `limit` busiest components.
    pub limit: Option<usize>,
}

/// Modification counts for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationRow {
    pub component_id: String,
    pub component_name: String,
    pub content_modified: usize,
    pub attributes_modified: usize,
    pub total: usize,
}

/// Count CONTENT_MODIFIED and ATTRIBUTES_MODIFIED events per component.
///
/// Sorted by total descending, then component name.
pub fn analyze_modifications(
    index: &LineageIndex,
    query: &ModificationQuery,
) -> Vec<ModificationRow> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for event in index.events() {
        let (content, attributes) = match event.event_type {
            EventType::ContentModified => (1, 0),
            EventType::AttributesModified => (0, 1),
            _ => continue,
        };
        let entry = counts.entry(&event.component_id).or_default();
        entry.0 += content;
        entry.1 += attributes;
    }

    let mut rows: Vec<ModificationRow> = counts
        .into_iter()
        .map(|(component_id, (content_modified, attributes_modified))| ModificationRow {
            component_id: component_id.to_string(),
            component_name: index
                .component_name(component_id)
                .unwrap_or(component_id)
                .to_string(),
            content_modified,
            attributes_modified,
            total: content_modified + attributes_modified,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.component_name.cmp(&b.component_name))
            .then_with(|| a.component_id.cmp(&b.component_id))
    });
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    rows
}
