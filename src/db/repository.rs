//! Database repository for the shared RSVP collection.
//!
//! The collection is only ever replaced wholesale; every replacement bumps the revision.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{AttendanceStatus, LogicalIdentity, RsvpEntry};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    // ==================== ENTRY OPERATIONS ====================

    /// List the collection in stored display order.
    pub async fn list_entries(&self) -> Result<Vec<RsvpEntry>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, address, angkatan, status, timestamp, avatar FROM entries ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Replace the whole collection and return the new revision.
    ///
    /// When `expected_revision` is given and differs from the stored revision the
    /// write is rejected with a conflict and nothing changes.
    pub async fn replace_entries(
        &self,
        entries: &[RsvpEntry],
        expected_revision: Option<i64>,
    ) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        // Bumping first takes the write lock, so concurrent writers are serialized
        // and each sees its own revision.
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        let new_revision: i64 = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?
            .get("revision_id");
        let current = new_revision - 1;

        if let Some(expected) = expected_revision {
            if expected != current {
                tx.rollback().await?;
                return Err(AppError::Conflict {
                    message: format!(
                        "Revision mismatch: expected {}, current {}",
                        expected, current
                    ),
                    current_revision: current,
                });
            }
        }

        sqlx::query("DELETE FROM entries").execute(&mut *tx).await?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO entries (position, id, name, address, angkatan, status, timestamp, avatar) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
            )
            .bind(position as i64)
            .bind(&entry.id)
            .bind(&entry.name)
            .bind(&entry.address)
            .bind(&entry.cohort)
            .bind(entry.status.as_str())
            .bind(entry.timestamp.to_rfc3339())
            .bind(&entry.avatar)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(new_revision)
    }

    /// Find the first entry matching a guest's logical identity.
    pub async fn find_by_identity(
        &self,
        name: &str,
        cohort: &str,
    ) -> Result<Option<RsvpEntry>, AppError> {
        // Case folding happens in Rust; SQLite's lower() only folds ASCII.
        let identity = LogicalIdentity::new(name, cohort);
        let entries = self.list_entries().await?;
        Ok(entries.into_iter().find(|e| e.matches_identity(&identity)))
    }

    // ==================== USER OPERATIONS ====================

    /// Store the per-device "my entry" record, keyed by the entry id.
    pub async fn save_user(&self, user: &RsvpEntry) -> Result<(), AppError> {
        let payload = serde_json::to_string(user)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, payload, updated_at) VALUES (?, ?, ?) ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at"
        )
        .bind(&user.id)
        .bind(&payload)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a per-device record by id.
    pub async fn load_user(&self, id: &str) -> Result<Option<RsvpEntry>, AppError> {
        let row = sqlx::query("SELECT payload FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.get("payload");
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }
}

// Helper functions for row conversion

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RsvpEntry, AppError> {
    let status: String = row.get("status");
    let timestamp: String = row.get("timestamp");

    let status = AttendanceStatus::parse(&status)
        .ok_or_else(|| AppError::Internal(format!("Unknown attendance status: {}", status)))?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| AppError::Internal(format!("Invalid stored timestamp {}: {}", timestamp, e)))?
        .with_timezone(&Utc);

    Ok(RsvpEntry {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        cohort: row.get("angkatan"),
        status,
        timestamp,
        avatar: row.get("avatar"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    fn entry(id: &str, name: &str, cohort: &str) -> RsvpEntry {
        RsvpEntry {
            id: id.to_string(),
            name: name.to_string(),
            address: "Jakarta".to_string(),
            cohort: cohort.to_string(),
            status: AttendanceStatus::Attending,
            timestamp: Utc::now(),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_empty_on_start() {
        let (repo, _dir) = repo().await;
        assert!(repo.list_entries().await.unwrap().is_empty());
        assert_eq!(repo.get_revision_id().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replace_preserves_order_and_bumps_revision() {
        let (repo, _dir) = repo().await;
        let entries = vec![entry("b", "Budi", "2012"), entry("a", "Ani", "2010")];

        let revision = repo.replace_entries(&entries, None).await.unwrap();
        assert_eq!(revision, 1);

        let stored = repo.list_entries().await.unwrap();
        let ids: Vec<_> = stored.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let revision = repo.replace_entries(&entries[..1], None).await.unwrap();
        assert_eq!(revision, 2);
        assert_eq!(repo.list_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_rejects_stale_revision() {
        let (repo, _dir) = repo().await;
        repo.replace_entries(&[entry("a", "Ani", "2010")], None)
            .await
            .unwrap();

        let result = repo
            .replace_entries(&[entry("b", "Budi", "2012")], Some(0))
            .await;
        assert!(matches!(
            result,
            Err(AppError::Conflict {
                current_revision: 1,
                ..
            })
        ));

        // Unchanged after the rejected write
        let stored = repo.list_entries().await.unwrap();
        assert_eq!(stored[0].id, "a");
        assert_eq!(repo.get_revision_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_get_their_own_revision() {
        let (repo, _dir) = repo().await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let e = entry(&format!("id-{}", i), &format!("Guest {}", i), "2010");
                    repo.replace_entries(&[e], None).await.unwrap()
                })
            })
            .collect();

        let mut revisions = Vec::new();
        for handle in handles {
            revisions.push(handle.await.unwrap());
        }
        revisions.sort();
        assert_eq!(revisions, (1..=8).collect::<Vec<i64>>());
        assert_eq!(repo.get_revision_id().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_concurrent_guarded_writers_only_one_wins() {
        let (repo, _dir) = repo().await;

        let first = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.replace_entries(&[entry("a", "Ani", "2010")], Some(0))
                    .await
            })
        };
        let second = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.replace_entries(&[entry("b", "Budi", "2012")], Some(0))
                    .await
            })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict { current_revision: 1, .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 1);

        assert_eq!(repo.get_revision_id().await.unwrap(), 1);
        assert_eq!(repo.list_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_stored() {
        let (repo, _dir) = repo().await;
        let entries = vec![entry("same", "Ani", "2010"), entry("same", "Budi", "2011")];
        repo.replace_entries(&entries, None).await.unwrap();
        assert_eq!(repo.list_entries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_identity() {
        let (repo, _dir) = repo().await;
        repo.replace_entries(&[entry("a", "Ahmad Fauzi", "2010")], None)
            .await
            .unwrap();

        let found = repo.find_by_identity(" ahmad fauzi", "2010").await.unwrap();
        assert_eq!(found.map(|e| e.id), Some("a".to_string()));
        assert!(repo
            .find_by_identity("ahmad fauzi", "2011")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_user_upsert() {
        let (repo, _dir) = repo().await;
        assert!(repo.load_user("device-1").await.unwrap().is_none());

        let mut user = entry("device-1", "Ani", "2010");
        repo.save_user(&user).await.unwrap();
        user.status = AttendanceStatus::NotAttending;
        repo.save_user(&user).await.unwrap();

        let loaded = repo.load_user("device-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, AttendanceStatus::NotAttending);
    }
}
