//! MX skip-list repository

use crate::db::DatabasePool;
use crate::models::{SkipListEntry, UpsertSkipListEntry};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mailprobe_common::types::normalize_host;
use mailprobe_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Skip-list repository trait
#[async_trait]
pub trait SkipListRepository: Send + Sync {
    /// Fetch the entry for a host
    async fn get(&self, mx_host: &str) -> Result<Option<SkipListEntry>>;

    /// True when an entry exists and has not expired
    async fn is_active(&self, mx_host: &str) -> Result<bool>;

    /// Record a failure, creating the entry or bumping its failure count
    async fn upsert(&self, input: UpsertSkipListEntry) -> Result<SkipListEntry>;

    /// Delete the entry for a host
    async fn remove(&self, mx_host: &str) -> Result<bool>;

    /// All entries, most recent failure first
    async fn list(&self) -> Result<Vec<SkipListEntry>>;

    /// Delete non-manual entries past their expiry; returns the number deleted
    async fn cleanup_expired(&self) -> Result<u64>;
}

/// Longest automatic exclusion that will be recorded, in days
const MAX_EXPIRY_DAYS: i64 = 3650;

fn expiry_for(input: &UpsertSkipListEntry, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if input.is_manual {
        None
    } else {
        let days = input.expires_days.clamp(-MAX_EXPIRY_DAYS, MAX_EXPIRY_DAYS);
        Some(now + Duration::days(days))
    }
}

/// Database skip-list repository
pub struct DbSkipListRepository {
    pool: DatabasePool,
}

impl DbSkipListRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SkipListRepository for DbSkipListRepository {
    async fn get(&self, mx_host: &str) -> Result<Option<SkipListEntry>> {
        sqlx::query_as::<_, SkipListEntry>("SELECT * FROM mx_skip_list WHERE mx_host = $1")
            .bind(normalize_host(mx_host))
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn is_active(&self, mx_host: &str) -> Result<bool> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM mx_skip_list
                WHERE mx_host = $1 AND (expires_at IS NULL OR expires_at > NOW())
            )
            "#,
        )
        .bind(normalize_host(mx_host))
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.0)
    }

    async fn upsert(&self, input: UpsertSkipListEntry) -> Result<SkipListEntry> {
        let now = Utc::now();
        let expires_at = expiry_for(&input, now);

        let entry = sqlx::query_as::<_, SkipListEntry>(
            r#"
            INSERT INTO mx_skip_list
                (id, mx_host, reason, response_snippet, failure_count, is_manual,
                 expires_at, last_failed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 1, $5, $6, $7, $7, $7)
            ON CONFLICT (mx_host) DO UPDATE SET
                reason = EXCLUDED.reason,
                response_snippet = COALESCE(EXCLUDED.response_snippet, mx_skip_list.response_snippet),
                failure_count = mx_skip_list.failure_count + 1,
                is_manual = mx_skip_list.is_manual OR EXCLUDED.is_manual,
                expires_at = CASE
                    WHEN mx_skip_list.is_manual OR EXCLUDED.is_manual THEN NULL
                    ELSE EXCLUDED.expires_at
                END,
                last_failed_at = EXCLUDED.last_failed_at,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(normalize_host(&input.mx_host))
        .bind(&input.reason)
        .bind(&input.response_snippet)
        .bind(input.is_manual)
        .bind(expires_at)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        debug!(
            mx_host = %entry.mx_host,
            failure_count = entry.failure_count,
            "Skip-list entry recorded"
        );
        Ok(entry)
    }

    async fn remove(&self, mx_host: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mx_skip_list WHERE mx_host = $1")
            .bind(normalize_host(mx_host))
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<SkipListEntry>> {
        sqlx::query_as::<_, SkipListEntry>(
            "SELECT * FROM mx_skip_list ORDER BY last_failed_at DESC",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM mx_skip_list WHERE is_manual = FALSE AND expires_at <= NOW()",
        )
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        let deleted = result.rows_affected();
        info!(deleted, "Expired skip-list entries removed");
        Ok(deleted)
    }
}

/// In-memory skip-list repository, safe to share between concurrent probes
#[derive(Clone, Default)]
pub struct MemorySkipListRepository {
    entries: Arc<RwLock<HashMap<String, SkipListEntry>>>,
}

impl MemorySkipListRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SkipListRepository for MemorySkipListRepository {
    async fn get(&self, mx_host: &str) -> Result<Option<SkipListEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&normalize_host(mx_host)).cloned())
    }

    async fn is_active(&self, mx_host: &str) -> Result<bool> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(&normalize_host(mx_host))
            .is_some_and(|entry| entry.is_active_at(now)))
    }

    async fn upsert(&self, input: UpsertSkipListEntry) -> Result<SkipListEntry> {
        let now = Utc::now();
        let host = normalize_host(&input.mx_host);
        let mut entries = self.entries.write().await;

        let entry = match entries.get_mut(&host) {
            Some(existing) => {
                existing.reason = input.reason.clone();
                if input.response_snippet.is_some() {
                    existing.response_snippet = input.response_snippet.clone();
                }
                existing.failure_count += 1;
                existing.is_manual = existing.is_manual || input.is_manual;
                existing.expires_at = if existing.is_manual {
                    None
                } else {
                    expiry_for(&input, now)
                };
                existing.last_failed_at = now;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let entry = SkipListEntry {
                    id: Uuid::now_v7(),
                    mx_host: host.clone(),
                    reason: input.reason.clone(),
                    response_snippet: input.response_snippet.clone(),
                    failure_count: 1,
                    is_manual: input.is_manual,
                    expires_at: expiry_for(&input, now),
                    last_failed_at: now,
                    created_at: now,
                    updated_at: now,
                };
                entries.insert(host, entry.clone());
                entry
            }
        };

        debug!(
            mx_host = %entry.mx_host,
            failure_count = entry.failure_count,
            "Skip-list entry recorded"
        );
        Ok(entry)
    }

    async fn remove(&self, mx_host: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&normalize_host(mx_host)).is_some())
    }

    async fn list(&self) -> Result<Vec<SkipListEntry>> {
        let entries = self.entries.read().await;
        let mut list: Vec<SkipListEntry> = entries.values().cloned().collect();
        list.sort_by(|a, b| b.last_failed_at.cmp(&a.last_failed_at));
        Ok(list)
    }

    async fn cleanup_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let deleted = (before - entries.len()) as u64;

        info!(deleted, "Expired skip-list entries removed");
        Ok(deleted)
    }
}
