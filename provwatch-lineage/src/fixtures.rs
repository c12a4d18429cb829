//! Shorthand event constructors for unit tests.

use provwatch_types::{EventType, FlowEventRecord};

/// An event whose component id and name are both `component`.
pub fn event(
    event_id: &str,
    flowfile_id: &str,
    event_type: EventType,
    time: u64,
    component: &str,
) -> FlowEventRecord {
    FlowEventRecord::builder(event_id, flowfile_id, event_type, time)
        .component(component, component, "Processor")
        .build()
}

pub fn fork(
    event_id: &str,
    parent: &str,
    children: &[&str],
    time: u64,
    component: &str,
) -> FlowEventRecord {
    let mut record = event(event_id, parent, EventType::Fork, time, component);
    record.child_ids = children.iter().map(|c| c.to_string()).collect();
    record
}

pub fn join(
    event_id: &str,
    output: &str,
    parents: &[&str],
    time: u64,
    component: &str,
) -> FlowEventRecord {
    let mut record = event(event_id, output, EventType::Join, time, component);
    record.parent_ids = parents.iter().map(|p| p.to_string()).collect();
    record
}

pub fn timed(mut record: FlowEventRecord, duration: u64) -> FlowEventRecord {
    record.event_duration = Some(duration);
    record
}

pub fn sized(mut record: FlowEventRecord, bytes: u64) -> FlowEventRecord {
    record.file_size = Some(bytes);
    record
}
