//! Email/password authentication with rotating refresh tokens.
//!
//! Provides:
//! - Access tokens: HS256 JWTs carrying `{sub, role}`, minutes-scale lifetime
//! - Refresh tokens: opaque base64url values, stored only as SHA-256 digests,
//!   single-use (rotated on every refresh), days-scale lifetime
//! - Reuse detection: presenting an already-revoked refresh token revokes every
//!   token of that subject
//! - Passwords: Argon2id PHC strings
//!
//! The core ([`AuthService`]) depends only on the traits in [`traits`];
//! SQLite implementations live in [`crate::store`].

pub mod error;
pub mod model;
pub mod password;
pub mod refresh;
pub mod service;
pub mod sweep;
pub mod token;
pub mod traits;

pub use error::{AuthError, ErrorBody};
pub use model::{AuthSession, NewUser, Profile, RefreshToken, User};
pub use service::AuthService;
pub use token::{AccessClaims, TokenCodec};
pub use traits::{RefreshTokenStore, UserDirectory};
