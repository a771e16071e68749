use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to accounts created without an explicit one.
pub const DEFAULT_ROLE: &str = "user";

// ── Identity ────────────────────────────────────────────────────

/// A registered account as seen by the credential store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    /// Argon2 PHC string. `None` for accounts that cannot sign in with a password.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public profile linked one-to-one with a [`User`] (same id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for provisioning a user together with its profile.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

// ── Refresh tokens ──────────────────────────────────────────────

/// Persisted refresh-token record. The raw bearer value is never stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: String,
    pub subject_id: String,
    /// Hex SHA-256 of the raw token.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Token that superseded this one through rotation.
    pub replaced_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RefreshToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Valid iff not revoked and `now < expires_at`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }
}

// ── Sessions ────────────────────────────────────────────────────

/// Result of a successful login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub profile: Profile,
    pub access_token: String,
    pub refresh_token: String,
}
