use thiserror::Error;

use crate::domain::token::models::TokenPurpose;

/// Failures of single-use token validation and storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpaqueTokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token not found")]
    NotFound,

    #[error("Token has expired")]
    Expired,

    #[error("Token has already been used")]
    AlreadyConsumed,

    #[error("Token issued for {actual}, expected {expected}")]
    WrongPurpose {
        expected: TokenPurpose,
        actual: TokenPurpose,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}
