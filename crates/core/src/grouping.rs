//! Partitioning of the event log into per-source groups.

use std::collections::BTreeMap;

use crate::events::EventRecord;

/// Default minimum group size; groups must be strictly larger to be modeled.
pub const DEFAULT_MIN_GROUP_SIZE: usize = 5000;

/// Completed event records keyed by source identifier, in input order.
pub type Groups = BTreeMap<String, Vec<EventRecord>>;

/// Drop in-progress records and group the rest by source.
pub fn prepare(records: impl IntoIterator<Item = EventRecord>) -> Groups {
    let mut groups = Groups::new();
    for record in records.into_iter().filter(|r| !r.is_in_progress()) {
        groups.entry(record.source.clone()).or_default().push(record);
    }
    groups
}

/// Keep only groups with more than `min_group_size` records.
pub fn filter_eligible(groups: Groups, min_group_size: usize) -> Groups {
    let total = groups.len();
    let eligible: Groups = groups
        .into_iter()
        .filter(|(_, records)| records.len() > min_group_size)
        .collect();
    tracing::debug!(
        total,
        eligible = eligible.len(),
        min_group_size,
        "Filtered groups by size"
    );
    eligible
}

/// Treat an entire dataset as a single group (service uploads), dropping
/// in-progress records but ignoring the source column.
pub fn prepare_single(records: impl IntoIterator<Item = EventRecord>) -> Vec<EventRecord> {
    records.into_iter().filter(|r| !r.is_in_progress()).collect()
}
