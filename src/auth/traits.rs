//! Collaborator seams consumed by [`AuthService`](super::AuthService).
//!
//! Concrete SQLite implementations live in [`crate::store`]; tests substitute
//! their own.

use super::model::{Profile, RefreshToken, User};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use crate::clock::Clock;

/// Read access to accounts and their profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>>;
}

/// Durable, hash-indexed refresh-token storage.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Hash `raw_token`, insert a new record and return it as stored.
    async fn create(
        &self,
        raw_token: &str,
        subject_id: &str,
        expires_at: DateTime<Utc>,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<RefreshToken>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>>;

    /// Mark a token revoked, optionally linking its replacement.
    ///
    /// Only an unrevoked row transitions. Returns `true` if this call revoked
    /// it, `false` if it was already revoked or does not exist.
    async fn revoke(&self, id: &str, replaced_by: Option<&str>) -> Result<bool>;

    /// Revoke every unrevoked token of a subject. Returns how many changed.
    async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<u64>;

    /// Delete rows whose expiry has passed. Returns how many were removed.
    async fn purge_expired(&self) -> Result<u64>;

    /// Currently valid tokens of a subject, newest first.
    async fn list_active_for_subject(&self, subject_id: &str) -> Result<Vec<RefreshToken>>;
}
