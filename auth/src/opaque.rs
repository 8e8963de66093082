//! High-entropy bearer tokens that carry no claims.
//!
//! Only the SHA-256 digest of a token is ever persisted; lookups hash the
//! presented value and compare digests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;
use uuid::Uuid;

/// Random bytes behind a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Encoded length of a refresh token (base64url, no padding).
pub const REFRESH_TOKEN_LENGTH: usize = 43;

/// Generate a refresh token: 256 random bits, base64url encoded.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a single-use token in UUID form (122 random bits).
pub fn generate_opaque_token() -> String {
    Uuid::new_v4().to_string()
}

/// Hex-encoded SHA-256 digest used as the storage key of a token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Structural check for refresh tokens, applied before any lookup.
pub fn is_well_formed_refresh_token(token: &str) -> bool {
    token.len() == REFRESH_TOKEN_LENGTH
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Structural check for UUID-formatted single-use tokens.
pub fn is_well_formed_opaque_token(token: &str) -> bool {
    Uuid::parse_str(token).is_ok()
}
