//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// MX host excluded from probing.
///
/// Manual entries never expire. Automatic entries carry an expiry and their
/// `failure_count` grows with every repeated failure against the same host.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SkipListEntry {
    pub id: Uuid,
    /// Lowercased host name, unique
    pub mx_host: String,
    pub reason: String,
    pub response_snippet: Option<String>,
    pub failure_count: i32,
    pub is_manual: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_failed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SkipListEntry {
    /// Whether the entry still excludes its host at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }

    /// Whether periodic cleanup may delete the entry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_manual && matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

/// Input for recording a failure against an MX host
#[derive(Debug, Clone)]
pub struct UpsertSkipListEntry {
    pub mx_host: String,
    pub reason: String,
    pub response_snippet: Option<String>,
    pub is_manual: bool,
    /// Days until expiry; ignored for manual entries
    pub expires_days: i64,
}

impl UpsertSkipListEntry {
    /// Longest stored response excerpt
    pub const MAX_SNIPPET_LEN: usize = 255;

    pub fn new(mx_host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            mx_host: mx_host.into(),
            reason: reason.into(),
            response_snippet: None,
            is_manual: false,
            expires_days: 1,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        let response: String = response.into();
        self.response_snippet = Some(response.chars().take(Self::MAX_SNIPPET_LEN).collect());
        self
    }

    pub fn manual(mut self) -> Self {
        self.is_manual = true;
        self
    }

    pub fn expires_in_days(mut self, days: i64) -> Self {
        self.expires_days = days;
        self
    }
}

/// Blacklisted address or domain
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: Uuid,
    /// Full address or bare domain, lowercased
    pub value: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
