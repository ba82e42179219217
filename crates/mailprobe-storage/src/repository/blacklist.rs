//! Blacklist repository

use crate::db::DatabasePool;
use crate::models::BlacklistEntry;
use async_trait::async_trait;
use chrono::Utc;
use mailprobe_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Blacklist repository trait
#[async_trait]
pub trait BlacklistRepository: Send + Sync {
    /// Look up an address, falling back to its domain
    async fn find(&self, email: &str, domain: &str) -> Result<Option<BlacklistEntry>>;

    /// Add an address or domain
    async fn add(&self, value: &str, reason: &str) -> Result<BlacklistEntry>;

    /// Remove an address or domain
    async fn remove(&self, value: &str) -> Result<bool>;
}

/// Database blacklist repository
pub struct DbBlacklistRepository {
    pool: DatabasePool,
}

impl DbBlacklistRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistRepository for DbBlacklistRepository {
    async fn find(&self, email: &str, domain: &str) -> Result<Option<BlacklistEntry>> {
        // Exact address wins over the domain entry
        sqlx::query_as::<_, BlacklistEntry>(
            r#"
            SELECT * FROM email_blacklist
            WHERE value = $1 OR value = $2
            ORDER BY (value = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(email.to_lowercase())
        .bind(domain.to_lowercase())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn add(&self, value: &str, reason: &str) -> Result<BlacklistEntry> {
        sqlx::query_as::<_, BlacklistEntry>(
            r#"
            INSERT INTO email_blacklist (id, value, reason, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (value) DO UPDATE SET reason = EXCLUDED.reason
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(value.to_lowercase())
        .bind(reason)
        .bind(Utc::now())
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn remove(&self, value: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM email_blacklist WHERE value = $1")
            .bind(value.to_lowercase())
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-memory blacklist repository
#[derive(Clone, Default)]
pub struct MemoryBlacklistRepository {
    entries: Arc<RwLock<HashMap<String, BlacklistEntry>>>,
}

impl MemoryBlacklistRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlacklistRepository for MemoryBlacklistRepository {
    async fn find(&self, email: &str, domain: &str) -> Result<Option<BlacklistEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&email.to_lowercase())
            .or_else(|| entries.get(&domain.to_lowercase()))
            .cloned())
    }

    async fn add(&self, value: &str, reason: &str) -> Result<BlacklistEntry> {
        let value = value.to_lowercase();
        let entry = BlacklistEntry {
            id: Uuid::now_v7(),
            value: value.clone(),
            reason: reason.to_string(),
            created_at: Utc::now(),
        };
        self.entries.write().await.insert(value, entry.clone());
        Ok(entry)
    }

    async fn remove(&self, value: &str) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .await
            .remove(&value.to_lowercase())
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_address_entry_wins_over_domain() {
        let repo = MemoryBlacklistRepository::new();
        repo.add("spam.test", "blocked").await.unwrap();
        repo.add("Trap@Spam.test", "spamtrap").await.unwrap();

        let hit = repo.find("trap@spam.test", "spam.test").await.unwrap().unwrap();
        assert_eq!(hit.reason, "spamtrap");

        let hit = repo.find("other@spam.test", "spam.test").await.unwrap().unwrap();
        assert_eq!(hit.reason, "blocked");
    }

    #[tokio::test]
    async fn test_miss_and_remove() {
        let repo = MemoryBlacklistRepository::new();
        assert!(repo.find("a@b.test", "b.test").await.unwrap().is_none());

        repo.add("b.test", "abuse").await.unwrap();
        assert!(repo.remove("B.TEST").await.unwrap());
        assert!(repo.find("a@b.test", "b.test").await.unwrap().is_none());
    }
}
