//! Token and credential primitives shared by services.
//!
//! Provides:
//! - An injectable [`Clock`](clock::Clock) for every expiry decision
//! - Signed access tokens (HS256 JWT) with a versioned [`KeyRing`]
//! - Opaque bearer tokens (refresh, single-use) and their storage digests
//! - A [`PasswordHasher`] capability with an Argon2id implementation
//!
//! Services define their own session and token semantics on top of these.
//!
//! # Examples
//!
//! ## Access tokens
//! ```
//! use std::sync::Arc;
//!
//! use auth::clock::SystemClock;
//! use auth::{AccessClaims, JwtCodec, KeyRing};
//! use chrono::{Duration, Utc};
//!
//! let keys = KeyRing::new("2024-01", b"secret_key_at_least_32_bytes_long!").unwrap();
//! let codec = JwtCodec::new(keys, Arc::new(SystemClock), 5);
//!
//! let claims = AccessClaims::new("user123", vec!["USER".into()], false, Utc::now(), Duration::minutes(15));
//! let token = codec.issue(&claims).unwrap();
//! assert_eq!(codec.verify(&token).unwrap(), claims);
//! ```
//!
//! ## Password hashing
//! ```
//! use auth::{Argon2Hasher, PasswordHasher};
//!
//! let hasher = Argon2Hasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Opaque tokens
//! ```
//! let token = auth::opaque::generate_refresh_token();
//! let stored = auth::opaque::hash_token(&token);
//! assert_eq!(stored.len(), 64);
//! ```

pub mod clock;
pub mod jwt;
pub mod opaque;
pub mod password;

// Re-export commonly used items
pub use clock::Clock;
pub use jwt::AccessClaims;
pub use jwt::JwtCodec;
pub use jwt::JwtError;
pub use jwt::KeyRing;
pub use password::Argon2Hasher;
pub use password::PasswordError;
pub use password::PasswordHasher;
