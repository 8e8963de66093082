use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::LineageId;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::TokenPair;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Port for session operations exposed to inbound adapters.
#[async_trait]
pub trait SessionServicePort: Send + Sync + 'static {
    /// Authenticate with username and password and open a new session lineage.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown user, guest account or wrong password
    /// * `EmailNotVerified` - Password matched but the email is unverified
    async fn login(&self, command: LoginCommand) -> Result<(User, TokenPair), SessionError>;

    /// Rotate a refresh token.
    ///
    /// # Errors
    /// * `Malformed` - Token is not structurally valid
    /// * `NotFound` - Token unknown
    /// * `Expired` - Token past its expiry
    /// * `Reused` - Token already rotated or revoked; its lineage is now revoked
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;

    /// Revoke the lineage of the presented refresh token. Unknown tokens are ignored.
    async fn logout(&self, refresh_token: Option<&str>) -> Result<(), SessionError>;

    /// Number of usable refresh records (one per open session) for a user.
    async fn active_session_count(&self, user_id: &UserId) -> Result<u64, SessionError>;
}

/// Revocation of every session a user holds.
#[async_trait]
pub trait SessionRevoker: Send + Sync + 'static {
    /// # Returns
    /// Number of records revoked
    async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<u64, SessionError>;
}

/// Persistence operations for refresh-token lineages.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    /// Persist the first record of a lineage.
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), SessionError>;

    /// Retrieve a record by token digest.
    ///
    /// # Returns
    /// Optional record (None if not found)
    async fn find_by_hash(&self, token_hash: &str)
        -> Result<Option<RefreshTokenRecord>, SessionError>;

    /// Atomically mark `current` consumed and insert `successor`.
    ///
    /// The update applies only while `current` is still active (neither consumed
    /// nor revoked). Either both writes happen or neither does.
    ///
    /// # Returns
    /// `true` if the rotation committed, `false` if `current` was no longer active
    async fn rotate(
        &self,
        current: &RefreshTokenId,
        successor: RefreshTokenRecord,
        at: DateTime<Utc>,
    ) -> Result<bool, SessionError>;

    /// Revoke every non-revoked record of a lineage.
    ///
    /// # Returns
    /// Number of records revoked
    async fn revoke_lineage(&self, lineage_id: &LineageId, at: DateTime<Utc>)
        -> Result<u64, SessionError>;

    /// Revoke every non-revoked record owned by a user.
    async fn revoke_all_for_user(&self, user_id: &UserId, at: DateTime<Utc>)
        -> Result<u64, SessionError>;

    /// Count records of a user that are active and unexpired at `now`.
    async fn count_active_for_user(&self, user_id: &UserId, now: DateTime<Utc>)
        -> Result<u64, SessionError>;

    /// Delete records that expired before `cutoff`.
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError>;
}
