use auth::JwtError;
use thiserror::Error;

use crate::domain::user::errors::UserError;

/// Failures of login, refresh rotation and logout.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Refresh token is malformed")]
    Malformed,

    #[error("Refresh token not found")]
    NotFound,

    #[error("Refresh token has expired")]
    Expired,

    /// A rotated or revoked token was presented again; the lineage has been revoked.
    #[error("Refresh token reuse detected")]
    Reused,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Failed to sign access token: {0}")]
    Signing(#[from] JwtError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
