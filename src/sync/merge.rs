//! Pure collection rules shared by submit, reset and load.

use serde::{Deserialize, Serialize};

use crate::models::RsvpEntry;

/// A local change that has not yet been confirmed by the server.
///
/// Persisted in the local cache so it survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PendingChange {
    /// Insert or replace this device's entry.
    Upsert(RsvpEntry),
    /// Remove the entry with this id.
    Remove(String),
}

impl PendingChange {
    /// Replay the change on top of another collection.
    pub fn apply(&self, entries: Vec<RsvpEntry>) -> Vec<RsvpEntry> {
        match self {
            PendingChange::Upsert(entry) => upsert_entry(entries, entry.clone()).0,
            PendingChange::Remove(id) => remove_entry(entries, id).0,
        }
    }
}

/// Prepend `entry`, dropping every entry with the same logical identity or the same id.
///
/// Returns the new collection and the entries that were replaced.
pub fn upsert_entry(entries: Vec<RsvpEntry>, entry: RsvpEntry) -> (Vec<RsvpEntry>, Vec<RsvpEntry>) {
    let identity = entry.identity();
    let (replaced, kept): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|e| e.id == entry.id || e.matches_identity(&identity));

    let mut merged = Vec::with_capacity(kept.len() + 1);
    merged.push(entry);
    merged.extend(kept);
    (merged, replaced)
}

/// Drop the entry with `id`. Returns the new collection and whether anything was removed.
pub fn remove_entry(mut entries: Vec<RsvpEntry>, id: &str) -> (Vec<RsvpEntry>, bool) {
    let before = entries.len();
    entries.retain(|e| e.id != id);
    let removed = entries.len() != before;
    (entries, removed)
}
