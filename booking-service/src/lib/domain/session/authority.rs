use std::sync::Arc;

use async_trait::async_trait;
use auth::opaque;
use auth::AccessClaims;
use auth::Clock;
use auth::JwtCodec;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::LineageId;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::RefreshTokenState;
use crate::domain::session::models::TokenPair;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::SessionRevoker;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;

/// Lifetimes of the two credentials in a pair.
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

/// Issues access/refresh pairs, rotates refresh tokens and revokes lineages.
///
/// Refresh tokens are single-use. Presenting one that was already rotated or
/// revoked is treated as theft: the whole lineage is revoked and the caller
/// gets `Reused`.
pub struct TokenAuthority<RR, UR>
where
    RR: RefreshTokenRepository,
    UR: UserRepository,
{
    refresh_tokens: Arc<RR>,
    users: Arc<UR>,
    codec: Arc<JwtCodec>,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
}

impl<RR, UR> TokenAuthority<RR, UR>
where
    RR: RefreshTokenRepository,
    UR: UserRepository,
{
    pub fn new(
        refresh_tokens: Arc<RR>,
        users: Arc<UR>,
        codec: Arc<JwtCodec>,
        clock: Arc<dyn Clock>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            refresh_tokens,
            users,
            codec,
            clock,
            lifetimes,
        }
    }

    /// Open a new lineage for `user` and return its first pair.
    pub async fn issue_pair(&self, user: &User) -> Result<TokenPair, SessionError> {
        let now = self.clock.now();
        let refresh_token = opaque::generate_refresh_token();
        let record = RefreshTokenRecord::first(
            user.id,
            opaque::hash_token(&refresh_token),
            now,
            self.lifetimes.refresh,
        );
        let lineage_id = record.lineage_id;
        let refresh_expires_at = record.expires_at;

        self.refresh_tokens.insert(record).await?;
        let (access_token, access_expires_at) = self.sign_access_token(user, now)?;

        tracing::info!(user_id = %user.id, lineage_id = %lineage_id, "Session opened");

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
            lineage_id,
        })
    }

    /// Exchange a refresh token for a new pair in the same lineage.
    ///
    /// A committed rotation is final: if the response is lost, the client must
    /// re-authenticate. An unknown token yields `NotFound`, not `Reused`: with no
    /// record there is no lineage to revoke.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, SessionError> {
        if !opaque::is_well_formed_refresh_token(presented) {
            return Err(SessionError::Malformed);
        }

        let record = self
            .refresh_tokens
            .find_by_hash(&opaque::hash_token(presented))
            .await?
            .ok_or(SessionError::NotFound)?;

        match record.state() {
            RefreshTokenState::Active => {}
            RefreshTokenState::Rotated | RefreshTokenState::Revoked => {
                self.revoke_on_reuse(&record).await?;
                return Err(SessionError::Reused);
            }
        }

        let now = self.clock.now();
        if record.is_expired(now) {
            tracing::debug!(lineage_id = %record.lineage_id, "Refresh token expired");
            return Err(SessionError::Expired);
        }

        let user = match self.users.find_by_id(&record.user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = %record.user_id, "Refresh token owner no longer exists");
                self.revoke(&record.lineage_id).await?;
                return Err(SessionError::NotFound);
            }
        };

        let refresh_token = opaque::generate_refresh_token();
        let successor =
            record.successor(opaque::hash_token(&refresh_token), now, self.lifetimes.refresh);
        let refresh_expires_at = successor.expires_at;

        if !self.refresh_tokens.rotate(&record.id, successor, now).await? {
            // Lost the race against another presentation of the same token.
            self.revoke_on_reuse(&record).await?;
            return Err(SessionError::Reused);
        }

        let (access_token, access_expires_at) = self.sign_access_token(&user, now)?;

        tracing::debug!(user_id = %user.id, lineage_id = %record.lineage_id, "Refresh token rotated");

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
            lineage_id: record.lineage_id,
        })
    }

    /// Revoke every record of a lineage.
    pub async fn revoke(&self, lineage_id: &LineageId) -> Result<u64, SessionError> {
        let revoked = self
            .refresh_tokens
            .revoke_lineage(lineage_id, self.clock.now())
            .await?;
        tracing::info!(lineage_id = %lineage_id, revoked, "Session lineage revoked");
        Ok(revoked)
    }

    /// Revoke the lineage a presented refresh token belongs to.
    ///
    /// Malformed or unknown tokens are ignored so that logout always succeeds.
    pub async fn revoke_presented(&self, presented: &str) -> Result<(), SessionError> {
        if !opaque::is_well_formed_refresh_token(presented) {
            tracing::debug!("Ignoring malformed refresh token on logout");
            return Ok(());
        }

        match self
            .refresh_tokens
            .find_by_hash(&opaque::hash_token(presented))
            .await?
        {
            Some(record) => self.revoke(&record.lineage_id).await.map(|_| ()),
            None => {
                tracing::debug!("Ignoring unknown refresh token on logout");
                Ok(())
            }
        }
    }

    pub async fn active_session_count(&self, user_id: &UserId) -> Result<u64, SessionError> {
        self.refresh_tokens
            .count_active_for_user(user_id, self.clock.now())
            .await
    }

    /// Delete records that expired more than `retention` ago.
    pub async fn cleanup_expired(&self, retention: Duration) -> Result<u64, SessionError> {
        let cutoff = self.clock.now() - retention;
        let deleted = self.refresh_tokens.delete_expired_before(cutoff).await?;
        tracing::info!(deleted, %cutoff, "Expired refresh tokens cleaned up");
        Ok(deleted)
    }

    fn sign_access_token(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), SessionError> {
        let claims = AccessClaims::new(
            user.id,
            vec![user.role.as_str().to_string()],
            user.is_guest,
            now,
            self.lifetimes.access,
        );
        let token = self.codec.issue(&claims)?;
        Ok((token, now + self.lifetimes.access))
    }

    /// Revoke the lineage of a replayed record, retrying once.
    ///
    /// A lineage that could not be revoked is still live, so the storage error
    /// is returned instead of `Reused`.
    async fn revoke_on_reuse(&self, record: &RefreshTokenRecord) -> Result<(), SessionError> {
        tracing::error!(
            user_id = %record.user_id,
            lineage_id = %record.lineage_id,
            record_id = %record.id,
            "Refresh token reuse detected, revoking lineage"
        );

        let first = self
            .refresh_tokens
            .revoke_lineage(&record.lineage_id, self.clock.now())
            .await;
        if let Err(e) = first {
            tracing::warn!(lineage_id = %record.lineage_id, error = %e, "Lineage revocation failed, retrying");
            if let Err(e) = self
                .refresh_tokens
                .revoke_lineage(&record.lineage_id, self.clock.now())
                .await
            {
                tracing::error!(
                    lineage_id = %record.lineage_id,
                    error = %e,
                    "Failed to revoke lineage after reuse"
                );
                return Err(e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<RR, UR> SessionRevoker for TokenAuthority<RR, UR>
where
    RR: RefreshTokenRepository,
    UR: UserRepository,
{
    async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<u64, SessionError> {
        let revoked = self
            .refresh_tokens
            .revoke_all_for_user(user_id, self.clock.now())
            .await?;
        tracing::info!(user_id = %user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use auth::clock::ManualClock;
    use auth::KeyRing;

    use super::*;
    use crate::domain::session::models::RefreshTokenId;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::Role;
    use crate::domain::user::models::Username;
    use crate::outbound::repositories::memory::InMemoryRefreshTokenRepository;
    use crate::outbound::repositories::memory::InMemoryUserRepository;

    type Authority = TokenAuthority<InMemoryRefreshTokenRepository, InMemoryUserRepository>;

    struct Fixture {
        authority: Arc<Authority>,
        refresh_tokens: Arc<InMemoryRefreshTokenRepository>,
        codec: Arc<JwtCodec>,
        clock: Arc<ManualClock>,
        user: User,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = Arc::new(JwtCodec::new(
            KeyRing::new("k1", b"test-secret-key-for-jwt-signing-at-least-32-bytes").unwrap(),
            clock.clone(),
            5,
        ));
        let refresh_tokens = Arc::new(InMemoryRefreshTokenRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());

        let user = User {
            id: UserId::new(),
            username: Username::new("alice".to_string()).unwrap(),
            email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
            password_hash: "$argon2id$test_hash".to_string(),
            role: Role::Provider,
            is_guest: false,
            email_verified: true,
            created_at: clock.now(),
        };
        users.create(user.clone()).await.unwrap();

        let authority = Arc::new(TokenAuthority::new(
            Arc::clone(&refresh_tokens),
            users,
            Arc::clone(&codec),
            clock.clone(),
            TokenLifetimes {
                access: Duration::minutes(15),
                refresh: Duration::days(7),
            },
        ));

        Fixture {
            authority,
            refresh_tokens,
            codec,
            clock,
            user,
        }
    }

    #[tokio::test]
    async fn test_issue_pair_signs_user_claims() {
        let f = fixture().await;

        let pair = f.authority.issue_pair(&f.user).await.unwrap();
        let claims = f.codec.verify(&pair.access_token).unwrap();

        assert_eq!(claims.sub, f.user.id.to_string());
        assert_eq!(claims.roles, vec!["PROVIDER".to_string()]);
        assert!(!claims.guest);
        assert_eq!(pair.refresh_expires_at, f.clock.now() + Duration::days(7));
        assert_eq!(f.authority.active_session_count(&f.user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rotate_issues_new_pair_in_same_lineage() {
        let f = fixture().await;
        let first = f.authority.issue_pair(&f.user).await.unwrap();

        f.clock.advance(Duration::minutes(20));
        let second = f.authority.rotate(&first.refresh_token).await.unwrap();

        assert_eq!(second.lineage_id, first.lineage_id);
        assert_ne!(second.refresh_token, first.refresh_token);
        assert!(f.codec.verify(&second.access_token).is_ok());
        assert_eq!(f.authority.active_session_count(&f.user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reuse_revokes_whole_lineage() {
        let f = fixture().await;
        let first = f.authority.issue_pair(&f.user).await.unwrap();
        let second = f.authority.rotate(&first.refresh_token).await.unwrap();

        let replay = f.authority.rotate(&first.refresh_token).await;
        assert!(matches!(replay, Err(SessionError::Reused)));

        let after = f.authority.rotate(&second.refresh_token).await;
        assert!(matches!(after, Err(SessionError::Reused)));
        assert_eq!(f.authority.active_session_count(&f.user.id).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotation_has_single_winner() {
        let f = fixture().await;
        let pair = f.authority.issue_pair(&f.user).await.unwrap();

        let a = {
            let authority = Arc::clone(&f.authority);
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { authority.rotate(&token).await })
        };
        let b = {
            let authority = Arc::clone(&f.authority);
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { authority.rotate(&token).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let reused = results
            .iter()
            .filter(|r| matches!(r, Err(SessionError::Reused)))
            .count();

        assert_eq!(winners.len(), 1);
        assert_eq!(reused, 1);

        let winner_token = winners[0].refresh_token.clone();
        assert!(matches!(
            f.authority.rotate(&winner_token).await,
            Err(SessionError::Reused)
        ));
        assert_eq!(f.authority.active_session_count(&f.user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_does_not_revoke_lineage() {
        let f = fixture().await;
        let pair = f.authority.issue_pair(&f.user).await.unwrap();

        f.clock.advance(Duration::days(7));
        assert!(matches!(
            f.authority.rotate(&pair.refresh_token).await,
            Err(SessionError::Expired)
        ));

        let record = f
            .refresh_tokens
            .find_by_hash(&opaque::hash_token(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.state(), RefreshTokenState::Active);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_tokens() {
        let f = fixture().await;

        assert!(matches!(
            f.authority.rotate("definitely not a token").await,
            Err(SessionError::Malformed)
        ));
        assert!(matches!(
            f.authority.rotate(&opaque::generate_refresh_token()).await,
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_revoke_presented_ends_session() {
        let f = fixture().await;
        let pair = f.authority.issue_pair(&f.user).await.unwrap();

        f.authority.revoke_presented(&pair.refresh_token).await.unwrap();

        assert!(matches!(
            f.authority.rotate(&pair.refresh_token).await,
            Err(SessionError::Reused)
        ));
        assert!(f.authority.revoke_presented("garbage").await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_all_for_user_kills_every_lineage() {
        let f = fixture().await;
        let laptop = f.authority.issue_pair(&f.user).await.unwrap();
        let phone = f.authority.issue_pair(&f.user).await.unwrap();
        assert_eq!(f.authority.active_session_count(&f.user.id).await.unwrap(), 2);

        assert_eq!(f.authority.revoke_all_for_user(&f.user.id).await.unwrap(), 2);

        for token in [laptop.refresh_token, phone.refresh_token] {
            assert!(f.authority.rotate(&token).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_cleanup_removes_long_expired_records() {
        let f = fixture().await;
        f.authority.issue_pair(&f.user).await.unwrap();

        f.clock.advance(Duration::days(7 + 29));
        assert_eq!(f.authority.cleanup_expired(Duration::days(30)).await.unwrap(), 0);

        f.clock.advance(Duration::days(2));
        assert_eq!(f.authority.cleanup_expired(Duration::days(30)).await.unwrap(), 1);
    }

    /// Delegates to the in-memory repository but fails the first
    /// `failures` lineage revocations.
    struct UnreliableRevocation {
        inner: InMemoryRefreshTokenRepository,
        failures: AtomicUsize,
    }

    impl UnreliableRevocation {
        fn new(failures: usize) -> Self {
            Self {
                inner: InMemoryRefreshTokenRepository::new(),
                failures: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl RefreshTokenRepository for UnreliableRevocation {
        async fn insert(&self, record: RefreshTokenRecord) -> Result<(), SessionError> {
            self.inner.insert(record).await
        }

        async fn find_by_hash(
            &self,
            token_hash: &str,
        ) -> Result<Option<RefreshTokenRecord>, SessionError> {
            self.inner.find_by_hash(token_hash).await
        }

        async fn rotate(
            &self,
            current: &RefreshTokenId,
            successor: RefreshTokenRecord,
            at: DateTime<Utc>,
        ) -> Result<bool, SessionError> {
            self.inner.rotate(current, successor, at).await
        }

        async fn revoke_lineage(
            &self,
            lineage_id: &LineageId,
            at: DateTime<Utc>,
        ) -> Result<u64, SessionError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(SessionError::DatabaseError("connection reset".to_string()));
            }
            self.inner.revoke_lineage(lineage_id, at).await
        }

        async fn revoke_all_for_user(
            &self,
            user_id: &UserId,
            at: DateTime<Utc>,
        ) -> Result<u64, SessionError> {
            self.inner.revoke_all_for_user(user_id, at).await
        }

        async fn count_active_for_user(
            &self,
            user_id: &UserId,
            now: DateTime<Utc>,
        ) -> Result<u64, SessionError> {
            self.inner.count_active_for_user(user_id, now).await
        }

        async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError> {
            self.inner.delete_expired_before(cutoff).await
        }
    }

    async fn unreliable_authority(
        failures: usize,
    ) -> (TokenAuthority<UnreliableRevocation, InMemoryUserRepository>, User) {
        let f = fixture().await;
        let users = Arc::new(InMemoryUserRepository::new());
        users.create(f.user.clone()).await.unwrap();

        let authority = TokenAuthority::new(
            Arc::new(UnreliableRevocation::new(failures)),
            users,
            f.codec,
            f.clock,
            TokenLifetimes {
                access: Duration::minutes(15),
                refresh: Duration::days(7),
            },
        );
        (authority, f.user)
    }

    #[tokio::test]
    async fn test_reuse_revocation_is_retried_once() {
        let (authority, user) = unreliable_authority(1).await;
        let first = authority.issue_pair(&user).await.unwrap();
        let second = authority.rotate(&first.refresh_token).await.unwrap();

        assert!(matches!(
            authority.rotate(&first.refresh_token).await,
            Err(SessionError::Reused)
        ));
        assert_eq!(authority.active_session_count(&user.id).await.unwrap(), 0);
        assert!(authority.rotate(&second.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_reuse_surfaces_revocation_failure() {
        let (authority, user) = unreliable_authority(2).await;
        let first = authority.issue_pair(&user).await.unwrap();
        authority.rotate(&first.refresh_token).await.unwrap();

        assert!(matches!(
            authority.rotate(&first.refresh_token).await,
            Err(SessionError::DatabaseError(_))
        ));
    }
}
