//! Password hashing primitives (Argon2id, PHC string format).

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash burned on unknown-account logins so they cost the same as real ones.
/// Must carry the same parameters as `Argon2::default()`.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}"))
}

/// Check a plaintext password against a stored PHC hash.
///
/// A malformed stored hash never verifies.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Run a verification whose result is discarded.
pub(crate) fn burn_verification(plain: &str) {
    let _ = verify_password(plain, DUMMY_HASH);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("p1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("p1", &hash));
        assert!(!verify_password("p2", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("correct horse").unwrap();
        let b = hash_password("correct horse").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn dummy_hash_parses_with_current_parameters() {
        assert!(PasswordHash::new(DUMMY_HASH).is_ok());
        assert!(!verify_password("timing-equalizer", DUMMY_HASH));

        let params = |h: &str| h.split('$').take(4).collect::<Vec<_>>().join("$");
        let real = hash_password("p1").unwrap();
        assert_eq!(params(&real), params(DUMMY_HASH));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("p1", "not-a-phc-string"));
        assert!(!verify_password("p1", ""));
    }
}
