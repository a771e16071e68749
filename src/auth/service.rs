//! Login, refresh-token rotation and logout.
//!
//! Refresh tokens are single-use: every successful refresh issues a new token
//! and revokes the presented one with a forward link. Presenting a token that
//! is already revoked is treated as theft and revokes every token of the
//! subject.

use super::error::AuthError;
use super::model::{AuthSession, Profile, RefreshToken, User};
use super::password::{burn_verification, verify_password};
use super::refresh::{generate_refresh_token, hash_refresh_token};
use super::token::{AccessClaims, TokenCodec};
use super::traits::{RefreshTokenStore, UserDirectory};
use crate::clock::Clock;
use chrono::TimeDelta;
use std::sync::Arc;

pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    tokens: Arc<dyn RefreshTokenStore>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    refresh_token_ttl: TimeDelta,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tokens: Arc<dyn RefreshTokenStore>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
        refresh_token_ttl: TimeDelta,
    ) -> Self {
        Self {
            users,
            tokens,
            codec,
            clock,
            refresh_token_ttl,
        }
    }

    pub fn access_token_ttl(&self) -> TimeDelta {
        self.codec.ttl()
    }

    pub fn refresh_token_ttl(&self) -> TimeDelta {
        self.refresh_token_ttl
    }

    /// Authenticate with email + password and open a new session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let Some(user) = self.users.get_user_by_email(email).await? else {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        };

        let Some(stored_hash) = user.password_hash.as_deref() else {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, stored_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let profile = self
            .users
            .get_profile_by_id(&user.id)
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        let (session, record) = self
            .open_session(user, profile, user_agent, ip_address)
            .await?;
        tracing::info!(subject = %record.subject_id, token_id = %record.id, "Login succeeded");
        Ok(session)
    }

    /// Exchange a refresh token for a fresh access + refresh pair.
    pub async fn refresh_tokens(
        &self,
        raw_token: &str,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let presented = self
            .tokens
            .find_by_hash(&hash_refresh_token(raw_token))
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        if presented.is_revoked() {
            tracing::warn!(
                subject = %presented.subject_id,
                token_id = %presented.id,
                "Revoked refresh token presented; revoking all sessions for subject"
            );
            self.tokens
                .revoke_all_for_subject(&presented.subject_id)
                .await?;
            return Err(AuthError::RefreshTokenRevoked);
        }

        if presented.is_expired(self.clock.now()) {
            return Err(AuthError::RefreshTokenExpired);
        }

        let user = self
            .users
            .get_user_by_id(&presented.subject_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let profile = self
            .users
            .get_profile_by_id(&user.id)
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        let (session, replacement) = self
            .open_session(user, profile, user_agent, ip_address)
            .await?;

        let consumed = self
            .tokens
            .revoke(&presented.id, Some(&replacement.id))
            .await?;
        if !consumed {
            // Another request rotated this token between our read and write.
            tracing::warn!(
                subject = %presented.subject_id,
                token_id = %presented.id,
                "Refresh token consumed concurrently; revoking all sessions for subject"
            );
            self.tokens
                .revoke_all_for_subject(&presented.subject_id)
                .await?;
            return Err(AuthError::RefreshTokenRevoked);
        }

        tracing::info!(
            subject = %replacement.subject_id,
            old_token_id = %presented.id,
            new_token_id = %replacement.id,
            "Refresh token rotated"
        );
        Ok(session)
    }

    /// Revoke the presented refresh token, if any. Never fails.
    pub async fn logout(&self, raw_token: Option<&str>) {
        let Some(raw_token) = raw_token.filter(|t| !t.is_empty()) else {
            return;
        };

        match self.tokens.find_by_hash(&hash_refresh_token(raw_token)).await {
            Ok(Some(token)) => match self.tokens.revoke(&token.id, None).await {
                Ok(true) => {
                    tracing::info!(subject = %token.subject_id, token_id = %token.id, "Logged out");
                }
                Ok(false) => tracing::debug!(token_id = %token.id, "Logout with already revoked token"),
                Err(e) => tracing::warn!("Logout revoke failed: {e:#}"),
            },
            Ok(None) => tracing::debug!("Logout with unknown refresh token"),
            Err(e) => tracing::warn!("Logout lookup failed: {e:#}"),
        }
    }

    /// Verify an access token presented to a protected operation.
    pub fn authenticate(&self, access_token: &str) -> Result<AccessClaims, AuthError> {
        self.codec.verify(access_token)
    }

    /// Sign a subject out everywhere. Returns how many tokens were revoked.
    pub async fn revoke_all_sessions(&self, subject_id: &str) -> Result<u64, AuthError> {
        let revoked = self.tokens.revoke_all_for_subject(subject_id).await?;
        tracing::info!(subject = %subject_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    /// Currently valid refresh tokens of a subject.
    pub async fn active_sessions(&self, subject_id: &str) -> Result<Vec<RefreshToken>, AuthError> {
        Ok(self.tokens.list_active_for_subject(subject_id).await?)
    }

    async fn open_session(
        &self,
        user: User,
        profile: Profile,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<(AuthSession, RefreshToken), AuthError> {
        let access_token = self.codec.issue(&user.id, &user.role)?;

        let refresh_token = generate_refresh_token();
        let expires_at = self.clock.now() + self.refresh_token_ttl;
        let record = self
            .tokens
            .create(&refresh_token, &user.id, expires_at, user_agent, ip_address)
            .await?;

        Ok((
            AuthSession {
                user,
                profile,
                access_token,
                refresh_token,
            },
            record,
        ))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
