use std::collections::BTreeSet;
use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::user::models::Role;
use crate::domain::user::models::UserId;

/// Identity of one login session; stable across refresh rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineageId(pub Uuid);

impl LineageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshTokenId(pub Uuid);

impl fmt::Display for RefreshTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a refresh record.
///
/// `Active` records can be rotated once. `Rotated` records have a successor.
/// `Revoked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Rotated,
    Revoked,
}

/// One link in a refresh-token lineage.
///
/// At most one record per lineage is `Active` at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub lineage_id: LineageId,
    pub token_hash: String,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub predecessor_id: Option<RefreshTokenId>,
}

impl RefreshTokenRecord {
    /// First record of a new lineage.
    pub fn first(
        user_id: UserId,
        token_hash: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: RefreshTokenId(Uuid::new_v4()),
            lineage_id: LineageId::new(),
            token_hash,
            user_id,
            issued_at: now,
            expires_at: now + ttl,
            consumed_at: None,
            revoked_at: None,
            predecessor_id: None,
        }
    }

    /// Record that replaces `self` in the same lineage.
    pub fn successor(&self, token_hash: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: RefreshTokenId(Uuid::new_v4()),
            lineage_id: self.lineage_id,
            token_hash,
            user_id: self.user_id,
            issued_at: now,
            expires_at: now + ttl,
            consumed_at: None,
            revoked_at: None,
            predecessor_id: Some(self.id),
        }
    }

    pub fn state(&self) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if self.consumed_at.is_some() {
            RefreshTokenState::Rotated
        } else {
            RefreshTokenState::Active
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.state() == RefreshTokenState::Active && !self.is_expired(now)
    }
}

/// Freshly minted credentials returned by login and rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub lineage_id: LineageId,
}

/// Identity resolved for a single request from verified access-token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: BTreeSet<Role>,
    pub guest: bool,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Why a presented access token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Malformed,
    InvalidSignature,
    Expired,
    InvalidSubject,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RejectReason::Malformed => "malformed",
            RejectReason::InvalidSignature => "invalid_signature",
            RejectReason::Expired => "expired",
            RejectReason::InvalidSubject => "invalid_subject",
        };
        f.write_str(reason)
    }
}

/// Result of authenticating a request.
///
/// The router decides per endpoint whether `Anonymous` is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Anonymous,
    Rejected(RejectReason),
}

/// Credentials presented at login.
#[derive(Debug)]
pub struct LoginCommand {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_state_transitions() {
        let now = Utc::now();
        let mut record =
            RefreshTokenRecord::first(UserId::new(), "hash".to_string(), now, Duration::days(7));
        assert_eq!(record.state(), RefreshTokenState::Active);
        assert!(record.is_usable(now));

        record.consumed_at = Some(now);
        assert_eq!(record.state(), RefreshTokenState::Rotated);
        assert!(!record.is_usable(now));

        record.revoked_at = Some(now);
        assert_eq!(record.state(), RefreshTokenState::Revoked);
    }

    #[test]
    fn test_successor_stays_in_lineage() {
        let now = Utc::now();
        let first =
            RefreshTokenRecord::first(UserId::new(), "h1".to_string(), now, Duration::days(7));
        let later = now + Duration::hours(1);
        let next = first.successor("h2".to_string(), later, Duration::days(7));

        assert_eq!(next.lineage_id, first.lineage_id);
        assert_eq!(next.user_id, first.user_id);
        assert_eq!(next.predecessor_id, Some(first.id));
        assert_eq!(next.expires_at, later + Duration::days(7));
        assert_ne!(next.id, first.id);
    }
}
