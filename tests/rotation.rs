//! End-to-end refresh-token lifecycle over the SQLite stores.

use chrono::TimeDelta;
use std::sync::Arc;
use tempfile::TempDir;
use tokenvault::auth::refresh::hash_refresh_token;
use tokenvault::auth::{AuthError, NewUser, RefreshToken, RefreshTokenStore};
use tokenvault::{
    AuthService, Clock, Database, ManualClock, SqliteRefreshTokenStore, SqliteUserStore,
    TokenCodec,
};

fn refresh_ttl() -> TimeDelta {
    TimeDelta::days(7)
}

struct Backend {
    _tmp: TempDir,
    clock: Arc<ManualClock>,
    tokens: Arc<SqliteRefreshTokenStore>,
    auth: AuthService,
    user_id: String,
}

fn backend() -> Backend {
    let tmp = TempDir::new().unwrap();
    let db = Database::open(&tmp.path().join("tokenvault.db")).unwrap();
    let clock = Arc::new(ManualClock::starting_now());

    let users = Arc::new(SqliteUserStore::new(db.clone(), clock.clone()));
    let tokens = Arc::new(SqliteRefreshTokenStore::new(db, clock.clone()));
    let (user, _) = users
        .create_user_with_profile(NewUser {
            email: "u@x.com".into(),
            password: "p1".into(),
            full_name: Some("U".into()),
            ..NewUser::default()
        })
        .unwrap();

    let codec = TokenCodec::new("integration-secret", TimeDelta::minutes(60), clock.clone()).unwrap();
    let auth = AuthService::new(users, tokens.clone(), codec, clock.clone(), refresh_ttl());

    Backend {
        _tmp: tmp,
        clock,
        tokens,
        auth,
        user_id: user.id,
    }
}

async fn row(b: &Backend, raw: &str) -> RefreshToken {
    b.tokens
        .find_by_hash(&hash_refresh_token(raw))
        .await
        .unwrap()
        .expect("refresh token row")
}

#[tokio::test]
async fn login_scenario() {
    let b = backend();
    let session = b.auth.login("u@x.com", "p1", None, None).await.unwrap();

    let claims = b.auth.authenticate(&session.access_token).unwrap();
    assert_eq!(claims.sub, b.user_id);
    assert_eq!(claims.role, "user");

    let stored = row(&b, &session.refresh_token).await;
    assert!(stored.revoked_at.is_none());
    assert_eq!(stored.expires_at, b.clock.now() + refresh_ttl());
}

#[tokio::test]
async fn unused_token_stays_valid_until_expiry_then_single_use() {
    let b = backend();
    let session = b.auth.login("u@x.com", "p1", None, None).await.unwrap();

    b.clock.advance(refresh_ttl() - TimeDelta::seconds(1));
    assert!(row(&b, &session.refresh_token).await.is_valid(b.clock.now()));

    let rotated = b
        .auth
        .refresh_tokens(&session.refresh_token, None, None)
        .await
        .unwrap();
    assert_eq!(row(&b, &rotated.refresh_token).await.subject_id, b.user_id);

    let again = b.auth.refresh_tokens(&session.refresh_token, None, None).await;
    assert!(matches!(again, Err(AuthError::RefreshTokenRevoked)));
}

#[tokio::test]
async fn replay_of_original_revokes_the_rotated_token_too() {
    let b = backend();
    let original = b.auth.login("u@x.com", "p1", None, None).await.unwrap();

    let first = b
        .auth
        .refresh_tokens(&original.refresh_token, None, None)
        .await
        .unwrap();

    let replay = b.auth.refresh_tokens(&original.refresh_token, None, None).await;
    assert!(matches!(replay, Err(AuthError::RefreshTokenRevoked)));

    let rotated = row(&b, &first.refresh_token).await;
    assert!(rotated.revoked_at.is_some());
    assert!(rotated.replaced_by.is_none());

    let follow_up = b.auth.refresh_tokens(&first.refresh_token, None, None).await;
    assert!(matches!(follow_up, Err(AuthError::RefreshTokenRevoked)));
}

#[tokio::test]
async fn rotation_chain_links_forward() {
    let b = backend();
    let mut current = b.auth.login("u@x.com", "p1", None, None).await.unwrap();
    let mut previous = Vec::new();

    for _ in 0..3 {
        let next = b
            .auth
            .refresh_tokens(&current.refresh_token, None, None)
            .await
            .unwrap();
        previous.push((current.refresh_token.clone(), next.refresh_token.clone()));
        current = next;
    }

    for (old, new) in previous {
        let old_row = row(&b, &old).await;
        let new_row = row(&b, &new).await;
        assert_eq!(old_row.replaced_by, Some(new_row.id));
    }
    assert_eq!(b.auth.active_sessions(&b.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn never_issued_token_is_not_found() {
    let b = backend();
    let result = b
        .auth
        .refresh_tokens("Zm9yZ2VkLWJ1dC1wbGF1c2libGUtbG9va2luZy10b2tlbg", None, None)
        .await;
    assert!(matches!(result, Err(AuthError::RefreshTokenNotFound)));
}

#[tokio::test]
async fn expired_token_is_distinct_from_revoked() {
    let b = backend();
    let stale = b.auth.login("u@x.com", "p1", None, None).await.unwrap();
    b.clock.advance(refresh_ttl());
    let fresh = b.auth.login("u@x.com", "p1", None, None).await.unwrap();

    let result = b.auth.refresh_tokens(&stale.refresh_token, None, None).await;
    assert!(matches!(result, Err(AuthError::RefreshTokenExpired)));
    assert!(row(&b, &fresh.refresh_token).await.revoked_at.is_none());
}

#[tokio::test]
async fn logout_only_mutates_for_known_tokens() {
    let b = backend();
    let session = b.auth.login("u@x.com", "p1", None, None).await.unwrap();

    b.auth.logout(None).await;
    b.auth.logout(Some("unknown")).await;
    assert!(row(&b, &session.refresh_token).await.revoked_at.is_none());

    b.auth.logout(Some(&session.refresh_token)).await;
    let revoked = row(&b, &session.refresh_token).await;
    assert!(revoked.revoked_at.is_some());
    assert!(revoked.replaced_by.is_none());
}

#[tokio::test]
async fn purge_removes_expired_history() {
    let b = backend();
    let session = b.auth.login("u@x.com", "p1", None, None).await.unwrap();
    b.auth
        .refresh_tokens(&session.refresh_token, None, None)
        .await
        .unwrap();

    b.clock.advance(refresh_ttl());
    assert_eq!(b.tokens.purge_expired().await.unwrap(), 2);
    let gone = b
        .tokens
        .find_by_hash(&hash_refresh_token(&session.refresh_token))
        .await
        .unwrap();
    assert!(gone.is_none());
}
