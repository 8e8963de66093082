use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use chrono::Duration;

use crate::domain::account::errors::AccountError;
use crate::domain::account::ports::PasswordResetServicePort;
use crate::domain::notification::events::NotificationEvent;
use crate::domain::notification::events::PasswordResetRequested;
use crate::domain::notification::links::LinkBuilder;
use crate::domain::notification::ports::publish_detached;
use crate::domain::notification::ports::NotificationSink;
use crate::domain::session::ports::SessionRevoker;
use crate::domain::token::models::OwnerId;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::OpaqueTokenRepository;
use crate::domain::token::service::OpaqueTokenStore;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewPassword;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;

const PURPOSE: TokenPurpose = TokenPurpose::PasswordReset;

pub struct PasswordResetService<UR, TR, SR, N>
where
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    SR: SessionRevoker,
    N: NotificationSink,
{
    users: Arc<UR>,
    tokens: Arc<OpaqueTokenStore<TR>>,
    sessions: Arc<SR>,
    notifications: Arc<N>,
    password_hasher: Arc<dyn PasswordHasher>,
    ttl: Duration,
    links: LinkBuilder,
}

impl<UR, TR, SR, N> PasswordResetService<UR, TR, SR, N>
where
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    SR: SessionRevoker,
    N: NotificationSink,
{
    pub fn new(
        users: Arc<UR>,
        tokens: Arc<OpaqueTokenStore<TR>>,
        sessions: Arc<SR>,
        notifications: Arc<N>,
        password_hasher: Arc<dyn PasswordHasher>,
        ttl: Duration,
        links: LinkBuilder,
    ) -> Self {
        Self {
            users,
            tokens,
            sessions,
            notifications,
            password_hasher,
            ttl,
            links,
        }
    }
}

#[async_trait]
impl<UR, TR, SR, N> PasswordResetServicePort for PasswordResetService<UR, TR, SR, N>
where
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    SR: SessionRevoker,
    N: NotificationSink,
{
    async fn request(&self, email: &EmailAddress) -> Result<(), AccountError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) if !user.is_guest => user,
            _ => return Err(AccountError::UserNotFound(email.to_string())),
        };

        let owner = OwnerId::from(user.id);
        self.tokens.revoke_for_owner(PURPOSE, owner).await?;
        let issued = self.tokens.create(PURPOSE, owner, self.ttl).await?;

        let link = self.links.password_reset(&issued.value);
        let event =
            NotificationEvent::PasswordResetRequested(PasswordResetRequested::new(&user, &issued, link));
        publish_detached(&self.notifications, event);

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    async fn complete(&self, token: &str, new_password: &str) -> Result<(), AccountError> {
        let password = NewPassword::new(new_password.to_string())?;

        let user_id = UserId::from(self.tokens.validate_and_consume(PURPOSE, token).await?);

        let password_hash = self
            .password_hasher
            .hash(password.expose())
            .map_err(|e| AccountError::HashingFailed(e.to_string()))?;
        self.users.update_password(&user_id, &password_hash).await?;

        let revoked = self.sessions.revoke_all_for_user(&user_id).await?;

        tracing::info!(user_id = %user_id, revoked_sessions = revoked, "Password reset completed");
        Ok(())
    }
}
