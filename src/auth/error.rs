//! Typed failures raised by the auth core.
//!
//! Every variant carries an HTTP-style status and a machine-readable code; the
//! transport boundary decides how to render them. Unanticipated collaborator
//! failures travel unchanged inside [`AuthError::Internal`].

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email, passwordless account or wrong password. Deliberately uniform.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Profile not found for authenticated user")]
    ProfileNotFound,
    #[error("Refresh token not found")]
    RefreshTokenNotFound,
    #[error("Refresh token has been revoked")]
    RefreshTokenRevoked,
    #[error("Refresh token has expired")]
    RefreshTokenExpired,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid or expired access token")]
    InvalidToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ProfileNotFound => 404,
            Self::Internal(_) => 500,
            Self::InvalidCredentials
            | Self::RefreshTokenNotFound
            | Self::RefreshTokenRevoked
            | Self::RefreshTokenExpired
            | Self::UserNotFound
            | Self::InvalidToken => 401,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            Self::ProfileNotFound => "AUTH_PROFILE_NOT_FOUND",
            Self::RefreshTokenNotFound => "AUTH_REFRESH_TOKEN_NOT_FOUND",
            Self::RefreshTokenRevoked => "AUTH_REFRESH_TOKEN_REVOKED",
            Self::RefreshTokenExpired => "AUTH_REFRESH_TOKEN_EXPIRED",
            Self::UserNotFound => "AUTH_USER_NOT_FOUND",
            Self::InvalidToken => "AUTH_INVALID_TOKEN",
            Self::Internal(_) => "SERVER_001",
        }
    }

    /// Expected auth outcome, as opposed to a server fault.
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Wire representation. Internal details are replaced by a generic message.
    pub fn to_body(&self) -> ErrorBody {
        let message = if self.is_operational() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        };
        ErrorBody {
            message,
            code: self.code(),
            status_code: self.status_code(),
        }
    }
}

/// Serializable error payload handed to the transport boundary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
    pub status_code: u16,
}
