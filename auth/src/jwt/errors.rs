use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is expired")]
    Expired,

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Signing key '{kid}' is too short: minimum {min} bytes, got {actual}")]
    WeakKey {
        kid: String,
        min: usize,
        actual: usize,
    },

    #[error("Active signing key '{0}' is not in the key ring")]
    UnknownActiveKey(String),
}
