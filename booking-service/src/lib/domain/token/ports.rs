use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::token::errors::OpaqueTokenError;
use crate::domain::token::models::OpaqueToken;
use crate::domain::token::models::OwnerId;
use crate::domain::token::models::TokenPurpose;

/// Persistence operations for single-use tokens.
#[async_trait]
pub trait OpaqueTokenRepository: Send + Sync + 'static {
    /// Persist a freshly created token.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn insert(&self, token: OpaqueToken) -> Result<(), OpaqueTokenError>;

    /// Retrieve a token by the digest of its value.
    ///
    /// # Returns
    /// Optional token (None if not found)
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<OpaqueToken>, OpaqueTokenError>;

    /// Mark a token consumed if and only if it is not consumed yet.
    ///
    /// # Returns
    /// `true` when this call consumed the token, `false` when another caller got there first
    async fn mark_consumed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, OpaqueTokenError>;

    /// Delete every token of `purpose` owned by `owner`.
    ///
    /// # Returns
    /// Number of deleted tokens
    async fn delete_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
    ) -> Result<u64, OpaqueTokenError>;

    /// Tokens of `purpose` owned by `owner` that are unconsumed and unexpired at `now`,
    /// newest first.
    async fn find_live_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OpaqueToken>, OpaqueTokenError>;

    /// Delete tokens that expired before `cutoff`.
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, OpaqueTokenError>;
}
