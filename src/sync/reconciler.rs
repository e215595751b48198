use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::client::RemoteClient;
use crate::config::ClientConfig;
use crate::models::{find_by_identity, RsvpEntry, RsvpStats};

use super::{
    remove_entry, upsert_entry, FormError, LoadOutcome, LoadSource, PendingChange, RsvpForm,
    SaveOutcome, SubmitOutcome, SyncOptions, SyncStatus,
};

/// Keeps the local cache and the shared server collection in step for one device.
pub struct Reconciler {
    cache: LocalCache,
    remote: RemoteClient,
    options: SyncOptions,
    device_id: String,
    online: AtomicBool,
    status: watch::Sender<SyncStatus>,
    /// Held for the whole of a save or load so cycles never overlap.
    sync_lock: AsyncMutex<()>,
    /// Last local change the server has not confirmed, mirrored in the cache.
    pending: Mutex<Option<PendingChange>>,
}

impl Reconciler {
    pub fn new(cache: LocalCache, remote: RemoteClient, options: SyncOptions) -> Self {
        let device_id = cache.device_id();
        let pending = cache.load_pending();
        if pending.is_some() {
            info!("Restored unsynced local change");
        }
        let (status, _) = watch::channel(SyncStatus::Synced);

        Self {
            cache,
            remote,
            options,
            device_id,
            online: AtomicBool::new(true),
            status,
            sync_lock: AsyncMutex::new(()),
            pending: Mutex::new(pending),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let cache = LocalCache::new(config.cache_dir.clone())?;
        let remote = RemoteClient::new(&config.server_url, config.request_timeout)?;
        Ok(Self::new(cache, remote, config.sync.clone()))
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Observe status changes (synced / syncing / error / offline).
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn has_pending_change(&self) -> bool {
        self.pending_slot().is_some()
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    fn pending_slot(&self) -> std::sync::MutexGuard<'_, Option<PendingChange>> {
        // A poisoned slot still holds a usable value
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_pending(&self, change: Option<PendingChange>) {
        let mut slot = self.pending_slot();
        if let Err(e) = self.cache.save_pending(change.as_ref()) {
            warn!(error = %e, "Failed to persist unsynced change");
        }
        *slot = change;
    }

    /// Clear the pending slot, but only if it still holds `change`.
    fn confirm_pending(&self, change: &PendingChange) {
        let mut slot = self.pending_slot();
        if slot.as_ref() != Some(change) {
            return;
        }
        if let Err(e) = self.cache.save_pending(None) {
            warn!(error = %e, "Failed to clear unsynced change");
        }
        *slot = None;
    }

    fn write_local(&self, entries: &[RsvpEntry], current_user: Option<&RsvpEntry>) {
        if let Err(e) = self.cache.save_entries(entries) {
            warn!(error = %e, "Failed to cache collection");
        }
        if let Err(e) = self.cache.save_current_user(current_user) {
            warn!(error = %e, "Failed to cache current user");
        }
    }

    fn cached_outcome(&self) -> LoadOutcome {
        LoadOutcome {
            entries: self.cache.load_entries(),
            current_user: self.cache.load_current_user(),
            source: LoadSource::Cache,
        }
    }

    // ===== Save protocol =====

    /// Write through the local cache, then push to the server with bounded retries.
    pub async fn hybrid_save(
        &self,
        entries: &[RsvpEntry],
        current_user: Option<&RsvpEntry>,
    ) -> SaveOutcome {
        let _guard = self.sync_lock.lock().await;
        self.save_locked(entries, current_user).await
    }

    async fn save_locked(
        &self,
        entries: &[RsvpEntry],
        current_user: Option<&RsvpEntry>,
    ) -> SaveOutcome {
        self.write_local(entries, current_user);

        if !self.is_online() {
            debug!("Offline, keeping save local");
            self.set_status(SyncStatus::Offline);
            return SaveOutcome::LocalOnly;
        }

        self.set_status(SyncStatus::Syncing);
        let max_attempts = self.options.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if self.remote.push_entries(entries).await {
                info!(count = entries.len(), attempt, "Collection synced");
                if self.has_pending_change() {
                    self.set_pending(None);
                }
                self.set_status(SyncStatus::Synced);

                if let Some(user) = current_user {
                    if let Err(e) = self.remote.save_user(user).await {
                        debug!(error = %e, "Failed to mirror current user");
                    }
                }
                return SaveOutcome::Synced;
            }

            if attempt < max_attempts {
                let delay = self.options.retry_delay * attempt;
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Push failed, retrying"
                );
                tokio::time::sleep(delay).await;

                if !self.is_online() {
                    self.set_status(SyncStatus::Offline);
                    return SaveOutcome::LocalOnly;
                }
            }
        }

        warn!(max_attempts, "Giving up on push, data kept locally");
        self.set_status(SyncStatus::Error);
        SaveOutcome::LocalOnly
    }

    /// Push the cached collection again, e.g. after a "sync pending" save.
    pub async fn retry_sync(&self) -> SaveOutcome {
        let entries = self.cache.load_entries();
        let current_user = self.cache.load_current_user();
        self.hybrid_save(&entries, current_user.as_ref()).await
    }

    // ===== Load protocol =====

    /// Fetch the server collection, refresh the cache and work out which entry is ours.
    /// Falls back to the cache when the server cannot be reached.
    pub async fn hybrid_load(&self) -> LoadOutcome {
        let _guard = self.sync_lock.lock().await;
        self.load_locked().await
    }

    /// Run a load unless a save or load is already in flight.
    pub async fn refresh(&self) -> Option<LoadOutcome> {
        let Ok(_guard) = self.sync_lock.try_lock() else {
            debug!("Sync in progress, skipping refresh");
            return None;
        };
        Some(self.load_locked().await)
    }

    async fn load_locked(&self) -> LoadOutcome {
        if !self.is_online() {
            self.set_status(SyncStatus::Offline);
            return self.cached_outcome();
        }

        self.set_status(SyncStatus::Syncing);

        let snapshot = match self.remote.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Remote load failed, using cached data");
                self.set_status(SyncStatus::Error);
                return self.cached_outcome();
            }
        };

        let mut entries = snapshot.entries;
        let mut revision = snapshot.revision;

        // Replay an unconfirmed local change so a refresh cannot drop it
        let pending = self.pending_slot().clone();
        if let Some(change) = pending {
            entries = change.apply(entries);
            match self.remote.push_snapshot(&entries, Some(revision)).await {
                Ok(receipt) => {
                    info!(revision = receipt.revision, "Pending change synced");
                    revision = receipt.revision;
                    self.confirm_pending(&change);
                }
                Err(e) => warn!(error = %e, "Pending change still unsynced"),
            }
        }

        let current_user = self.resolve_current_user(&mut entries, revision).await;

        self.write_local(&entries, current_user.as_ref());
        self.set_status(SyncStatus::Synced);

        LoadOutcome {
            entries,
            current_user,
            source: LoadSource::Remote,
        }
    }

    /// Find this device's entry in `entries`, rebinding it to this device when it
    /// is only recognisable by name and cohort.
    ///
    /// The server-side per-device record is only consulted on a first visit, so a
    /// withdrawn confirmation is never re-adopted.
    async fn resolve_current_user(
        &self,
        entries: &mut [RsvpEntry],
        revision: i64,
    ) -> Option<RsvpEntry> {
        if let Some(mine) = entries.iter().find(|e| e.id == self.device_id) {
            return Some(mine.clone());
        }

        let known = match self.cache.load_current_user() {
            Some(user) => Some(user),
            None if self.cache.is_first_visit() => {
                self.remote.load_user(&self.device_id).await.unwrap_or_else(|e| {
                    debug!(error = %e, "No server-side record for this device");
                    None
                })
            }
            None => None,
        }?;

        let identity = known.identity();
        let position = entries.iter().position(|e| e.matches_identity(&identity))?;

        let previous_id = std::mem::replace(&mut entries[position].id, self.device_id.clone());
        info!(from = %previous_id, to = %self.device_id, "Rebinding guest entry to this device");

        // Guarded by the revision just read; a concurrent writer wins and the
        // rebinding is retried on the next load.
        match self.remote.push_snapshot(entries, Some(revision)).await {
            Ok(receipt) => debug!(revision = receipt.revision, "Rebinding pushed"),
            Err(e) if e.is_conflict() => {
                warn!("Collection changed concurrently, rebinding deferred")
            }
            Err(e) => warn!(error = %e, "Failed to push rebinding"),
        }

        Some(entries[position].clone())
    }

    // ===== Guest operations =====

    /// Submit this device's confirmation, replacing any earlier one from the same guest.
    pub async fn submit(&self, form: RsvpForm) -> Result<SubmitOutcome, FormError> {
        form.validate()?;
        let entry = form.into_entry(&self.device_id);

        let (entries, replaced) = upsert_entry(self.cache.load_entries(), entry.clone());
        if !replaced.is_empty() {
            debug!(replaced = replaced.len(), "Submission replaces existing entries");
        }

        self.set_pending(Some(PendingChange::Upsert(entry.clone())));
        let save = self.hybrid_save(&entries, Some(&entry)).await;

        Ok(SubmitOutcome {
            entry,
            replaced,
            entries,
            save,
        })
    }

    /// Withdraw this device's confirmation and forget the current user.
    pub async fn reset(&self) -> SaveOutcome {
        let mut entries = self.cache.load_entries();

        if let Some(me) = self.cache.load_current_user() {
            let (left, removed) = remove_entry(entries, &me.id);
            entries = left;
            if removed {
                self.set_pending(Some(PendingChange::Remove(me.id)));
            }
        }

        self.hybrid_save(&entries, None).await
    }

    /// Advisory pre-submit check for an existing confirmation by the same guest.
    pub async fn check_duplicate(&self, name: &str, cohort: &str) -> Option<RsvpEntry> {
        if !self.options.check_duplicates || name.trim().is_empty() || cohort.trim().is_empty() {
            return None;
        }

        if self.is_online() {
            self.remote.find_entry_by_identity(name, cohort).await
        } else {
            find_by_identity(&self.cache.load_entries(), name, cohort).cloned()
        }
    }

    pub fn entries(&self) -> Vec<RsvpEntry> {
        self.cache.load_entries()
    }

    pub fn current_user(&self) -> Option<RsvpEntry> {
        self.cache.load_current_user()
    }

    pub fn stats(&self) -> RsvpStats {
        RsvpStats::from_entries(&self.cache.load_entries())
    }

    // ===== Connectivity and polling =====

    /// Record a connectivity change. Coming back online triggers a load.
    pub async fn set_online(&self, online: bool) -> Option<LoadOutcome> {
        let was_online = self.online.swap(online, Ordering::SeqCst);

        if !online {
            info!("Connection lost, remote sync suspended");
            self.set_status(SyncStatus::Offline);
            return None;
        }

        if was_online {
            return None;
        }

        info!("Connection restored, reloading");
        Some(self.hybrid_load().await)
    }

    /// Reload every `refresh_interval` until the handle is aborted.
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let period = this.options.refresh_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                if !this.is_online() {
                    continue;
                }
                if let Some(outcome) = this.refresh().await {
                    debug!(count = outcome.entries.len(), source = ?outcome.source, "Auto refresh");
                }
            }
        })
    }
}
