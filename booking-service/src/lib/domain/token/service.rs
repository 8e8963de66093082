use std::sync::Arc;

use auth::opaque;
use auth::Clock;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::token::errors::OpaqueTokenError;
use crate::domain::token::models::IssuedToken;
use crate::domain::token::models::OpaqueToken;
use crate::domain::token::models::OwnerId;
use crate::domain::token::models::PeekMode;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::OpaqueTokenRepository;

/// Single-use token engine shared by password reset, email verification and
/// guest booking access.
///
/// Token values are UUID v4 strings handed out once; the repository only ever
/// sees their SHA-256 digest. Consumption is a conditional update, so two
/// concurrent validations of one token cannot both succeed.
pub struct OpaqueTokenStore<TR>
where
    TR: OpaqueTokenRepository,
{
    repository: Arc<TR>,
    clock: Arc<dyn Clock>,
}

impl<TR> OpaqueTokenStore<TR>
where
    TR: OpaqueTokenRepository,
{
    pub fn new(repository: Arc<TR>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Create a token valid for `ttl` from now.
    pub async fn create(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
        ttl: Duration,
    ) -> Result<IssuedToken, OpaqueTokenError> {
        let expires_at = self.clock.now() + ttl;
        self.create_until(purpose, owner, expires_at).await
    }

    /// Create a token valid until an absolute instant.
    pub async fn create_until(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, OpaqueTokenError> {
        let value = opaque::generate_opaque_token();
        let token = OpaqueToken {
            id: Uuid::new_v4(),
            token_hash: opaque::hash_token(&value),
            purpose,
            owner,
            issued_at: self.clock.now(),
            expires_at,
            consumed_at: None,
        };

        self.repository.insert(token).await?;

        tracing::debug!(purpose = %purpose, owner = %owner, %expires_at, "Opaque token created");

        Ok(IssuedToken { value, expires_at })
    }

    /// Validate a presented token and consume it in the same atomic step.
    ///
    /// Checks run in order: format, existence, purpose, expiry, consumption.
    ///
    /// # Returns
    /// The owner the token was issued for
    ///
    /// # Errors
    /// * `Malformed` - Not a UUID-formatted value; no lookup is made
    /// * `NotFound` - No token with this value
    /// * `WrongPurpose` - Token belongs to another workflow
    /// * `Expired` - Past its expiry, consumed or not
    /// * `AlreadyConsumed` - Used before, including by a concurrent caller
    pub async fn validate_and_consume(
        &self,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<OwnerId, OpaqueTokenError> {
        let record = self.load_valid(purpose, token, PeekMode::Unconsumed).await?;
        let now = self.clock.now();

        if !self.repository.mark_consumed(record.id, now).await? {
            tracing::warn!(purpose = %purpose, owner = %record.owner, "Concurrent consumption of opaque token");
            return Err(OpaqueTokenError::AlreadyConsumed);
        }

        tracing::info!(purpose = %purpose, owner = %record.owner, "Opaque token consumed");
        Ok(record.owner)
    }

    /// Resolve a token's owner without consuming it.
    ///
    /// `PeekMode::Unconsumed` runs exactly the checks of `validate_and_consume`.
    /// `PeekMode::AllowConsumed` also accepts a consumed token that has not yet
    /// expired, for reads that stay available after the one-time action.
    /// Never use it to authorize the single-use state change itself.
    pub async fn peek(
        &self,
        purpose: TokenPurpose,
        token: &str,
        mode: PeekMode,
    ) -> Result<OwnerId, OpaqueTokenError> {
        self.load_valid(purpose, token, mode)
            .await
            .map(|record| record.owner)
    }

    /// Delete every outstanding token of `purpose` for `owner`.
    pub async fn revoke_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
    ) -> Result<u64, OpaqueTokenError> {
        let deleted = self.repository.delete_for_owner(purpose, owner).await?;
        if deleted > 0 {
            tracing::debug!(purpose = %purpose, owner = %owner, deleted, "Outstanding tokens revoked");
        }
        Ok(deleted)
    }

    /// Newest live token of `purpose` for `owner`, if any.
    pub async fn live_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
    ) -> Result<Option<OpaqueToken>, OpaqueTokenError> {
        let now = self.clock.now();
        Ok(self
            .repository
            .find_live_for_owner(purpose, owner, now)
            .await?
            .into_iter()
            .next())
    }

    /// Delete tokens that expired more than `retention` ago.
    pub async fn cleanup_expired(&self, retention: Duration) -> Result<u64, OpaqueTokenError> {
        let cutoff = self.clock.now() - retention;
        self.repository.delete_expired_before(cutoff).await
    }

    async fn load_valid(
        &self,
        purpose: TokenPurpose,
        token: &str,
        mode: PeekMode,
    ) -> Result<OpaqueToken, OpaqueTokenError> {
        if !opaque::is_well_formed_opaque_token(token) {
            return Err(OpaqueTokenError::Malformed);
        }

        let record = self
            .repository
            .find_by_hash(&opaque::hash_token(token))
            .await?
            .ok_or(OpaqueTokenError::NotFound)?;

        if record.purpose != purpose {
            tracing::warn!(expected = %purpose, actual = %record.purpose, "Opaque token presented for the wrong workflow");
            return Err(OpaqueTokenError::WrongPurpose {
                expected: purpose,
                actual: record.purpose,
            });
        }

        if record.is_expired(self.clock.now()) {
            tracing::warn!(purpose = %purpose, owner = %record.owner, "Expired opaque token presented");
            return Err(OpaqueTokenError::Expired);
        }

        if record.is_consumed() && mode == PeekMode::Unconsumed {
            tracing::warn!(purpose = %purpose, owner = %record.owner, "Consumed opaque token presented again");
            return Err(OpaqueTokenError::AlreadyConsumed);
        }

        Ok(record)
    }
}
