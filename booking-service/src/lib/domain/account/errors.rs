use thiserror::Error;

use crate::domain::session::errors::SessionError;
use crate::domain::token::errors::OpaqueTokenError;
use crate::domain::user::errors::PasswordStrengthError;
use crate::domain::user::errors::UserError;

/// Failures of password reset and email verification.
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    #[error("Invalid token: {0}")]
    InvalidToken(OpaqueTokenError),

    #[error("No account for {0}")]
    UserNotFound(String),

    #[error("Email address is already verified")]
    AlreadyVerified,

    #[error("Weak password: {0}")]
    WeakPassword(#[from] PasswordStrengthError),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OpaqueTokenError> for AccountError {
    fn from(err: OpaqueTokenError) -> Self {
        match err {
            OpaqueTokenError::DatabaseError(e) => AccountError::DatabaseError(e),
            other => AccountError::InvalidToken(other),
        }
    }
}
