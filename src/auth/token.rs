//! Short-lived signed access tokens (HS256 JWT).

use super::error::AuthError;
use crate::clock::Clock;
use anyhow::{bail, Result};
use chrono::TimeDelta;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies access tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Result<Self> {
        if secret.trim().is_empty() {
            bail!("Access token signing secret must not be empty");
        }
        if ttl <= TimeDelta::zero() {
            bail!("Access token lifetime must be positive");
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            clock,
        })
    }

    /// Lifetime stamped into every issued token.
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn issue(&self, subject_id: &str, role: &str) -> Result<String> {
        let now = self.clock.now();
        let claims = AccessClaims {
            sub: subject_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature, expiry and payload shape.
    ///
    /// Expiry is judged against the injected clock with no leeway.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<AccessClaims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Access token rejected");
            AuthError::InvalidToken
        })?;

        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn codec(secret: &str, clock: Arc<ManualClock>) -> TokenCodec {
        TokenCodec::new(secret, TimeDelta::minutes(60), clock).unwrap()
    }

    #[test]
    fn issued_token_verifies_with_subject_and_role() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec("test-secret-key-for-jwt-testing", clock.clone());

        let token = codec
            .issue("123e4567-e89b-12d3-a456-426614174000", "user")
            .unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "123e4567-e89b-12d3-a456-426614174000");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_expires_after_ttl() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec("secret", clock.clone());
        let token = codec.issue("u1", "admin").unwrap();

        clock.advance(TimeDelta::minutes(59));
        assert!(codec.verify(&token).is_ok());

        clock.advance(TimeDelta::minutes(1));
        assert!(matches!(codec.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let clock = Arc::new(ManualClock::starting_now());
        let token = codec("secret-a", clock.clone()).issue("u1", "user").unwrap();
        let result = codec("secret-b", clock).verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn garbage_is_rejected() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec("secret", clock);
        assert!(codec.verify("invalid-token").is_err());
        assert!(codec.verify("not.a.valid.token.format").is_err());
        assert!(codec.verify("").is_err());
    }

    #[test]
    fn payload_without_role_is_rejected() {
        #[derive(Serialize)]
        struct SubjectOnly {
            sub: String,
            exp: i64,
        }

        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec("secret", clock.clone());
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &SubjectOnly {
                sub: "u1".into(),
                exp: (clock.now() + TimeDelta::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(codec.verify(&forged), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn payload_without_subject_is_rejected() {
        #[derive(Serialize)]
        struct RoleOnly {
            role: String,
            exp: i64,
        }

        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec("secret", clock.clone());
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &RoleOnly {
                role: "admin".into(),
                exp: (clock.now() + TimeDelta::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(codec.verify(&forged), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn empty_secret_is_refused() {
        let clock = Arc::new(ManualClock::starting_now());
        assert!(TokenCodec::new("", TimeDelta::minutes(5), clock.clone()).is_err());
        assert!(TokenCodec::new("  ", TimeDelta::minutes(5), clock).is_err());
    }
}
