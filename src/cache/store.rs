use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::RsvpEntry;
use crate::sync::PendingChange;

const ENTRIES_KEY: &str = "entries";
const CURRENT_USER_KEY: &str = "current_user";
const PENDING_KEY: &str = "pending";
const DEVICE_ID_FILE: &str = "device_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// File-backed key/value store holding this device's RSVP state.
///
/// Loaders never fail: unreadable or corrupt values are reported as absent.
pub struct LocalCache {
    cache_dir: PathBuf,
}

impl LocalCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn load_or_absent<T: DeserializeOwned>(&self, name: &str) -> Option<CachedData<T>> {
        match self.load(name) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(cache = name, error = %e, "Treating unreadable cache as empty");
                None
            }
        }
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(name), contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.cache_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", name))?;
        }
        Ok(())
    }

    // ===== Collection =====

    pub fn save_entries(&self, entries: &[RsvpEntry]) -> Result<()> {
        self.save(ENTRIES_KEY, &entries)
    }

    pub fn load_entries(&self) -> Vec<RsvpEntry> {
        self.load_or_absent::<Vec<RsvpEntry>>(ENTRIES_KEY)
            .map(|cached| cached.data)
            .unwrap_or_default()
    }

    // ===== Current user =====

    /// Write this device's own entry, or clear the slot with `None`.
    pub fn save_current_user(&self, entry: Option<&RsvpEntry>) -> Result<()> {
        match entry {
            Some(entry) => self.save(CURRENT_USER_KEY, entry),
            None => self.remove(CURRENT_USER_KEY),
        }
    }

    pub fn load_current_user(&self) -> Option<RsvpEntry> {
        self.load_or_absent::<RsvpEntry>(CURRENT_USER_KEY)
            .map(|cached| cached.data)
    }

    // ===== Unconfirmed change =====

    /// Record the change the server has not confirmed yet, or clear it with `None`.
    pub fn save_pending(&self, change: Option<&PendingChange>) -> Result<()> {
        match change {
            Some(change) => self.save(PENDING_KEY, change),
            None => self.remove(PENDING_KEY),
        }
    }

    pub fn load_pending(&self) -> Option<PendingChange> {
        self.load_or_absent::<PendingChange>(PENDING_KEY)
            .map(|cached| cached.data)
    }

    // ===== Device identifier =====

    /// Return this device's identifier, generating and persisting one on first use.
    pub fn device_id(&self) -> String {
        let path = self.cache_dir.join(DEVICE_ID_FILE);

        if let Ok(stored) = std::fs::read_to_string(&path) {
            let stored = stored.trim();
            if !stored.is_empty() {
                return stored.to_string();
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        match std::fs::write(&path, &id) {
            Ok(()) => debug!(device_id = %id, "Generated device identifier"),
            Err(e) => warn!(error = %e, "Failed to persist device identifier"),
        }
        id
    }

    // ===== Maintenance =====

    /// Remove the cached collection, current user and unconfirmed change.
    /// The device id is kept.
    pub fn clear_all(&self) -> Result<()> {
        self.remove(ENTRIES_KEY)?;
        self.remove(CURRENT_USER_KEY)?;
        self.remove(PENDING_KEY)
    }

    pub fn is_first_visit(&self) -> bool {
        !self.cache_path(ENTRIES_KEY).exists()
    }

    /// Age of the cached collection, e.g. "5m ago".
    pub fn last_cached(&self) -> Option<String> {
        match self.load::<serde_json::Value>(ENTRIES_KEY) {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Failed to load cache for age display");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::Duration;
    use tempfile::TempDir;

    fn cache() -> (LocalCache, TempDir) {
        let dir = TempDir::new().unwrap();
        (LocalCache::new(dir.path().join("rsvp")).unwrap(), dir)
    }

    fn entry(id: &str) -> RsvpEntry {
        RsvpEntry {
            id: id.to_string(),
            name: "Ahmad Fauzi".to_string(),
            address: "Jl. Sudirman".to_string(),
            cohort: "2010".to_string(),
            status: AttendanceStatus::Attending,
            timestamp: Utc::now(),
            avatar: None,
        }
    }

    #[test]
    fn test_entries_absent_is_empty() {
        let (cache, _dir) = cache();
        assert!(cache.load_entries().is_empty());
        assert!(cache.is_first_visit());
        assert!(cache.last_cached().is_none());
    }

    #[test]
    fn test_entries_overwrite() {
        let (cache, _dir) = cache();
        cache.save_entries(&[entry("1"), entry("2")]).unwrap();
        cache.save_entries(&[entry("3")]).unwrap();

        let loaded = cache.load_entries();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "3");
        assert!(!cache.is_first_visit());
        assert_eq!(cache.last_cached().as_deref(), Some("just now"));
    }

    #[test]
    fn test_corrupt_entries_treated_as_absent() {
        let (cache, _dir) = cache();
        std::fs::write(cache.cache_path(ENTRIES_KEY), "{not json").unwrap();
        assert!(cache.load_entries().is_empty());
    }

    #[test]
    fn test_current_user_save_and_clear() {
        let (cache, _dir) = cache();
        assert!(cache.load_current_user().is_none());

        cache.save_current_user(Some(&entry("me"))).unwrap();
        assert_eq!(cache.load_current_user().map(|e| e.id), Some("me".to_string()));

        cache.save_current_user(None).unwrap();
        assert!(cache.load_current_user().is_none());
        // Clearing an already empty slot is fine
        cache.save_current_user(None).unwrap();
    }

    #[test]
    fn test_corrupt_current_user_treated_as_none() {
        let (cache, _dir) = cache();
        std::fs::write(cache.cache_path(CURRENT_USER_KEY), "[]").unwrap();
        assert!(cache.load_current_user().is_none());
    }

    #[test]
    fn test_device_id_is_stable() {
        let (cache, dir) = cache();
        let first = cache.device_id();
        assert!(!first.is_empty());
        assert_eq!(cache.device_id(), first);

        // Survives a new handle on the same directory
        let reopened = LocalCache::new(dir.path().join("rsvp")).unwrap();
        assert_eq!(reopened.device_id(), first);
    }

    #[test]
    fn test_clear_all_keeps_device_id() {
        let (cache, _dir) = cache();
        let id = cache.device_id();
        cache.save_entries(&[entry("1")]).unwrap();
        cache.save_current_user(Some(&entry("1"))).unwrap();
        cache
            .save_pending(Some(&PendingChange::Remove("1".to_string())))
            .unwrap();

        cache.clear_all().unwrap();

        assert!(cache.load_entries().is_empty());
        assert!(cache.load_current_user().is_none());
        assert!(cache.load_pending().is_none());
        assert_eq!(cache.device_id(), id);
    }

    #[test]
    fn test_pending_change_survives_reopen() {
        let (cache, dir) = cache();
        assert!(cache.load_pending().is_none());

        let change = PendingChange::Upsert(entry("me"));
        cache.save_pending(Some(&change)).unwrap();

        let reopened = LocalCache::new(dir.path().join("rsvp")).unwrap();
        assert_eq!(reopened.load_pending(), Some(change));

        reopened.save_pending(None).unwrap();
        assert!(cache.load_pending().is_none());
    }

    #[test]
    fn test_cached_data_age_display() {
        let fresh = CachedData::new(1);
        assert_eq!(fresh.age_display(), "just now");

        let mut old = CachedData::new(1);
        old.cached_at = Utc::now() - Duration::minutes(90);
        assert_eq!(old.age_display(), "1h ago");

        old.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(old.age_display(), "3d ago");
    }
}
