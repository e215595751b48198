//! Hybrid local/remote synchronization of the RSVP collection.
//!
//! Writes land in the local cache first and are then pushed to the server with
//! bounded retries. Reads prefer the server and fall back to the cache. The
//! `Reconciler` also binds this device to its guest entry across devices by
//! matching on name and cohort.

mod form;
mod merge;
mod reconciler;

use std::time::Duration;

use crate::models::RsvpEntry;

pub use form::{FormError, RsvpForm};
pub use merge::{remove_entry, upsert_entry, PendingChange};
pub use reconciler::Reconciler;

/// Retry, duplicate-check and refresh policy.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Total push attempts per save, including the first
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * retry_delay` before the next try
    pub retry_delay: Duration,
    /// Whether `check_duplicate` consults the store at all
    pub check_duplicates: bool,
    /// Period of the background refresh
    pub refresh_interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            check_duplicates: true,
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Status indicator surfaced to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    Syncing,
    Error,
    Offline,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error => "error",
            SyncStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a save reached the server or only the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Synced,
    /// Saved locally, sync pending
    LocalOnly,
}

impl SaveOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SaveOutcome::Synced)
    }
}

/// Where a load's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Cache,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub entries: Vec<RsvpEntry>,
    pub current_user: Option<RsvpEntry>,
    pub source: LoadSource,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The entry as submitted by this device
    pub entry: RsvpEntry,
    /// Entries it replaced (same guest or same device)
    pub replaced: Vec<RsvpEntry>,
    /// The collection after the submission
    pub entries: Vec<RsvpEntry>,
    pub save: SaveOutcome,
}
