use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried inside a signed access token.
///
/// Timestamps are Unix seconds, as required by RFC 7519.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user identifier)
    pub sub: String,

    /// Role names granted to the subject
    #[serde(default)]
    pub roles: Vec<String>,

    /// Set for accounts created implicitly by a guest booking
    #[serde(default)]
    pub guest: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    /// Build claims for a subject issued at `issued_at` and valid for `ttl`.
    ///
    /// # Arguments
    /// * `subject` - Unique user identifier
    /// * `roles` - Role names to embed
    /// * `guest` - Whether the subject is a guest account
    /// * `issued_at` - Issuance instant (usually the injected clock's `now`)
    /// * `ttl` - Lifetime of the token
    pub fn new(
        subject: impl ToString,
        roles: Vec<String>,
        guest: bool,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            roles,
            guest,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// True when `now` is past the expiry, allowing `leeway_seconds` of clock skew.
    pub fn is_expired(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        now.timestamp() >= self.exp + leeway_seconds
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
