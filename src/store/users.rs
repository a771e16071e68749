use super::Database;
use crate::auth::model::{NewUser, Profile, User, DEFAULT_ROLE};
use crate::auth::password::hash_password;
use crate::auth::traits::UserDirectory;
use crate::clock::{from_epoch_secs, Clock};
use anyhow::{bail, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";
const PROFILE_COLUMNS: &str =
    "id, full_name, email, bio, avatar_url, status, created_at, updated_at";

/// Accounts and profiles in the `users` / `profiles` tables.
pub struct SqliteUserStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteUserStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Create a user and its profile in a single transaction.
    pub fn create_user_with_profile(&self, new_user: NewUser) -> Result<(User, Profile)> {
        let email = new_user.email.trim();
        if email.is_empty() {
            bail!("Email cannot be empty");
        }
        if new_user.password.is_empty() {
            bail!("Password cannot be empty");
        }

        let id = Uuid::new_v4().to_string();
        let password_hash = hash_password(&new_user.password)?;
        let role = new_user
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE);
        let now = self.clock.now().timestamp();

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let inserted = tx.query_row(
            &format!(
                "INSERT INTO users (id, email, password_hash, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 RETURNING {USER_COLUMNS}"
            ),
            params![id, email, password_hash, role, now],
            row_to_user,
        );
        let user = match inserted {
            Ok(user) => user,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                bail!("Email '{}' is already registered", email)
            }
            Err(e) => return Err(e.into()),
        };

        let profile = tx.query_row(
            &format!(
                "INSERT INTO profiles (id, full_name, email, bio, avatar_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 RETURNING {PROFILE_COLUMNS}"
            ),
            params![
                user.id,
                new_user.full_name,
                email,
                new_user.bio,
                new_user.avatar_url,
                now,
            ],
            row_to_profile,
        )?;

        tx.commit()?;
        tracing::info!(user_id = %user.id, role = %user.role, "User provisioned");
        Ok((user, profile))
    }

    /// Replace a user's password. Returns `false` if the user does not exist.
    pub fn set_password(&self, user_id: &str, password: &str) -> Result<bool> {
        if password.is_empty() {
            bail!("Password cannot be empty");
        }
        let password_hash = hash_password(password)?;
        let now = self.clock.now().timestamp();

        let conn = self.db.lock();
        let updated = conn.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, now, user_id],
        )?;
        Ok(updated > 0)
    }
}

#[async_trait]
impl UserDirectory for SqliteUserStore {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.db.lock();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.lock();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email.trim()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let conn = self.db.lock();
        let profile = conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        created_at: from_epoch_secs(row.get(4)?),
        updated_at: from_epoch_secs(row.get(5)?),
    })
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        bio: row.get(3)?,
        avatar_url: row.get(4)?,
        status: row.get(5)?,
        created_at: from_epoch_secs(row.get(6)?),
        updated_at: from_epoch_secs(row.get(7)?),
    })
}

// ── Tests ───────────────────────────────────────────────────────────
