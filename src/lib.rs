//! tokenvault: email/password authentication with rotating refresh tokens.
//!
//! - [`auth`]: the auth core (login, refresh rotation, logout), access-token
//!   codec, password primitives and the collaborator traits it consumes
//! - [`store`]: SQLite implementations of those traits
//! - [`config`]: process-wide settings, loaded once at startup
//! - [`clock`]: injectable time source

pub mod auth;
pub mod clock;
pub mod config;
pub mod store;

pub use auth::{AuthError, AuthService, AuthSession, TokenCodec};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use store::{Database, SqliteRefreshTokenStore, SqliteUserStore};
