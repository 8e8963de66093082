use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::booking::models::BookingId;
use crate::domain::token::errors::OpaqueTokenError;
use crate::domain::user::models::UserId;

/// Workflow a single-use token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    PasswordReset,
    EmailVerification,
    GuestBookingAccess,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::PasswordReset => "PASSWORD_RESET",
            TokenPurpose::EmailVerification => "EMAIL_VERIFICATION",
            TokenPurpose::GuestBookingAccess => "GUEST_BOOKING_ACCESS",
        }
    }
}

impl FromStr for TokenPurpose {
    type Err = OpaqueTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASSWORD_RESET" => Ok(TokenPurpose::PasswordReset),
            "EMAIL_VERIFICATION" => Ok(TokenPurpose::EmailVerification),
            "GUEST_BOOKING_ACCESS" => Ok(TokenPurpose::GuestBookingAccess),
            other => Err(OpaqueTokenError::DatabaseError(format!(
                "unknown token purpose: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a non-consuming read treats a token that was already consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeekMode {
    /// Consumed tokens fail with `AlreadyConsumed`, exactly as consumption would.
    Unconsumed,
    /// Consumed tokens still resolve to their owner until they expire.
    AllowConsumed,
}

/// Non-owning reference to the entity a token acts on.
///
/// A user id for password reset and verification, a booking id for guest
/// access; the purpose tells which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(pub Uuid);

impl From<UserId> for OwnerId {
    fn from(id: UserId) -> Self {
        Self(id.0)
    }
}

impl From<BookingId> for OwnerId {
    fn from(id: BookingId) -> Self {
        Self(id.0)
    }
}

impl From<OwnerId> for UserId {
    fn from(owner: OwnerId) -> Self {
        UserId(owner.0)
    }
}

impl From<OwnerId> for BookingId {
    fn from(owner: OwnerId) -> Self {
        BookingId(owner.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stored single-use token. Only the digest of the token value is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueToken {
    pub id: Uuid,
    pub token_hash: String,
    pub purpose: TokenPurpose,
    pub owner: OwnerId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl OpaqueToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Unconsumed and unexpired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_consumed() && !self.is_expired(now)
    }
}

/// Plaintext token handed to the caller exactly once, at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}
