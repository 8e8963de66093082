//! In-process adapters for every repository port.
//!
//! Each conditional update runs under a single lock acquisition, which gives
//! the same compare-and-swap guarantees as the Postgres adapters. Used by the
//! test suites and by local runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::booking::errors::BookingError;
use crate::domain::booking::models::Booking;
use crate::domain::booking::models::BookingId;
use crate::domain::booking::models::BookingStatus;
use crate::domain::booking::ports::BookingRepository;
use crate::domain::session::errors::SessionError;
use crate::domain::session::models::LineageId;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::token::errors::OpaqueTokenError;
use crate::domain::token::models::OpaqueToken;
use crate::domain::token::models::OwnerId;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::OpaqueTokenRepository;
use crate::domain::user::errors::UserError;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserRepository;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(UserError::UsernameAlreadyExists(
                user.username.as_str().to_string(),
            ));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(UserError::EmailAlreadyExists(user.email.as_str().to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| &u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), UserError> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(UserError::NotFound(id.to_string())),
        }
    }

    async fn mark_email_verified(&self, id: &UserId) -> Result<(), UserError> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.email_verified = true;
                Ok(())
            }
            None => Err(UserError::NotFound(id.to_string())),
        }
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    records: Mutex<HashMap<RefreshTokenId, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), SessionError> {
        self.records.lock().await.insert(record.id, record);
        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, SessionError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn rotate(
        &self,
        current: &RefreshTokenId,
        successor: RefreshTokenRecord,
        at: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let mut records = self.records.lock().await;

        match records.get_mut(current) {
            Some(record) if record.consumed_at.is_none() && record.revoked_at.is_none() => {
                record.consumed_at = Some(at);
            }
            _ => return Ok(false),
        }

        records.insert(successor.id, successor);
        Ok(true)
    }

    async fn revoke_lineage(
        &self,
        lineage_id: &LineageId,
        at: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        let mut records = self.records.lock().await;
        let mut revoked = 0;

        for record in records
            .values_mut()
            .filter(|r| &r.lineage_id == lineage_id && r.revoked_at.is_none())
        {
            record.revoked_at = Some(at);
            revoked += 1;
        }

        Ok(revoked)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        let mut records = self.records.lock().await;
        let mut revoked = 0;

        for record in records
            .values_mut()
            .filter(|r| &r.user_id == user_id && r.revoked_at.is_none())
        {
            record.revoked_at = Some(at);
            revoked += 1;
        }

        Ok(revoked)
    }

    async fn count_active_for_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| &r.user_id == user_id && r.is_usable(now))
            .count() as u64)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, r| r.expires_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryOpaqueTokenRepository {
    tokens: Mutex<HashMap<Uuid, OpaqueToken>>,
}

impl InMemoryOpaqueTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OpaqueTokenRepository for InMemoryOpaqueTokenRepository {
    async fn insert(&self, token: OpaqueToken) -> Result<(), OpaqueTokenError> {
        self.tokens.lock().await.insert(token.id, token);
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<OpaqueToken>, OpaqueTokenError> {
        Ok(self
            .tokens
            .lock()
            .await
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn mark_consumed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, OpaqueTokenError> {
        match self.tokens.lock().await.get_mut(&id) {
            Some(token) if token.consumed_at.is_none() => {
                token.consumed_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
    ) -> Result<u64, OpaqueTokenError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, t| !(t.purpose == purpose && t.owner == owner));
        Ok((before - tokens.len()) as u64)
    }

    async fn find_live_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OpaqueToken>, OpaqueTokenError> {
        let mut live: Vec<OpaqueToken> = self
            .tokens
            .lock()
            .await
            .values()
            .filter(|t| t.purpose == purpose && t.owner == owner && t.is_live(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(live)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, OpaqueTokenError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= cutoff);
        Ok((before - tokens.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, BookingError> {
        Ok(self.bookings.read().await.get(id).cloned())
    }

    async fn insert(&self, booking: Booking) -> Result<Booking, BookingError> {
        self.bookings.write().await.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn transition(
        &self,
        id: &BookingId,
        from: BookingStatus,
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        match self.bookings.write().await.get_mut(id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                booking.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
