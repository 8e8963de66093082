use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::account::errors::AccountError;
use crate::domain::account::ports::EmailVerificationServicePort;
use crate::domain::notification::events::EmailVerificationRequested;
use crate::domain::notification::events::NotificationEvent;
use crate::domain::notification::links::LinkBuilder;
use crate::domain::notification::ports::publish_detached;
use crate::domain::notification::ports::NotificationSink;
use crate::domain::token::models::IssuedToken;
use crate::domain::token::models::OwnerId;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::OpaqueTokenRepository;
use crate::domain::token::service::OpaqueTokenStore;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;

const PURPOSE: TokenPurpose = TokenPurpose::EmailVerification;

/// Email verification. Only the most recently issued token of a user is valid.
pub struct EmailVerificationService<UR, TR, N>
where
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    N: NotificationSink,
{
    users: Arc<UR>,
    tokens: Arc<OpaqueTokenStore<TR>>,
    notifications: Arc<N>,
    ttl: Duration,
    links: LinkBuilder,
}

impl<UR, TR, N> EmailVerificationService<UR, TR, N>
where
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    N: NotificationSink,
{
    pub fn new(
        users: Arc<UR>,
        tokens: Arc<OpaqueTokenStore<TR>>,
        notifications: Arc<N>,
        ttl: Duration,
        links: LinkBuilder,
    ) -> Self {
        Self {
            users,
            tokens,
            notifications,
            ttl,
            links,
        }
    }
}

#[async_trait]
impl<UR, TR, N> EmailVerificationServicePort for EmailVerificationService<UR, TR, N>
where
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    N: NotificationSink,
{
    async fn issue(&self, user: &User) -> Result<IssuedToken, AccountError> {
        let owner = OwnerId::from(user.id);
        self.tokens.revoke_for_owner(PURPOSE, owner).await?;
        let issued = self.tokens.create(PURPOSE, owner, self.ttl).await?;

        let link = self.links.email_verification(&issued.value);
        let event = NotificationEvent::EmailVerificationRequested(EmailVerificationRequested::new(
            user, &issued, link,
        ));
        publish_detached(&self.notifications, event);

        tracing::info!(user_id = %user.id, "Email verification issued");
        Ok(issued)
    }

    async fn resend(&self, email: &EmailAddress) -> Result<(), AccountError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) if !user.is_guest => user,
            _ => return Err(AccountError::UserNotFound(email.to_string())),
        };

        if user.email_verified {
            return Err(AccountError::AlreadyVerified);
        }

        self.issue(&user).await.map(|_| ())
    }

    async fn complete(&self, token: &str) -> Result<User, AccountError> {
        let user_id = UserId::from(self.tokens.validate_and_consume(PURPOSE, token).await?);

        let mut user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))?;

        if !user.email_verified {
            self.users.mark_email_verified(&user_id).await?;
            user.email_verified = true;
            tracing::info!(user_id = %user_id, "Email verified");
        }

        Ok(user)
    }
}
