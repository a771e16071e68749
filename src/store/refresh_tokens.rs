use super::Database;
use crate::auth::model::RefreshToken;
use crate::auth::refresh::hash_refresh_token;
use crate::auth::traits::RefreshTokenStore;
use crate::clock::{from_epoch_secs, Clock};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use uuid::Uuid;

const COLUMNS: &str =
    "id, user_id, token_hash, expires_at, revoked_at, replaced_by, created_at, user_agent, ip_address";

/// Refresh-token records in the `refresh_tokens` table.
pub struct SqliteRefreshTokenStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteRefreshTokenStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl RefreshTokenStore for SqliteRefreshTokenStore {
    async fn create(
        &self,
        raw_token: &str,
        subject_id: &str,
        expires_at: DateTime<Utc>,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<RefreshToken> {
        let id = Uuid::new_v4().to_string();
        let token_hash = hash_refresh_token(raw_token);
        let now = self.clock.now().timestamp();

        let conn = self.db.lock();
        conn.query_row(
            &format!(
                "INSERT INTO refresh_tokens
                    (id, user_id, token_hash, expires_at, created_at, user_agent, ip_address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {COLUMNS}"
            ),
            params![
                id,
                subject_id,
                token_hash,
                expires_at.timestamp(),
                now,
                user_agent,
                ip_address,
            ],
            row_to_token,
        )
        .optional()?
        .context("Refresh token insert returned no row")
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let conn = self.db.lock();
        let token = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = ?1"),
                params![token_hash],
                row_to_token,
            )
            .optional()?;
        Ok(token)
    }

    async fn revoke(&self, id: &str, replaced_by: Option<&str>) -> Result<bool> {
        let now = self.clock.now().timestamp();
        let conn = self.db.lock();
        let updated = conn.execute(
            "UPDATE refresh_tokens SET revoked_at = ?1, replaced_by = ?2
             WHERE id = ?3 AND revoked_at IS NULL",
            params![now, replaced_by, id],
        )?;
        Ok(updated > 0)
    }

    async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<u64> {
        let now = self.clock.now().timestamp();
        let conn = self.db.lock();
        let updated = conn.execute(
            "UPDATE refresh_tokens SET revoked_at = ?1
             WHERE user_id = ?2 AND revoked_at IS NULL",
            params![now, subject_id],
        )?;
        Ok(updated as u64)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = self.clock.now().timestamp();
        let conn = self.db.lock();
        let deleted = conn.execute(
            "DELETE FROM refresh_tokens WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(deleted as u64)
    }

    async fn list_active_for_subject(&self, subject_id: &str) -> Result<Vec<RefreshToken>> {
        let now = self.clock.now().timestamp();
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM refresh_tokens
             WHERE user_id = ?1 AND revoked_at IS NULL AND expires_at > ?2
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let tokens = stmt
            .query_map(params![subject_id, now], row_to_token)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens)
    }
}

fn row_to_token(row: &Row<'_>) -> rusqlite::Result<RefreshToken> {
    Ok(RefreshToken {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        token_hash: row.get(2)?,
        expires_at: from_epoch_secs(row.get(3)?),
        revoked_at: row.get::<_, Option<i64>>(4)?.map(from_epoch_secs),
        replaced_by: row.get(5)?,
        created_at: from_epoch_secs(row.get(6)?),
        user_agent: row.get(7)?,
        ip_address: row.get(8)?,
    })
}

// ── Tests ───────────────────────────────────────────────────────────
