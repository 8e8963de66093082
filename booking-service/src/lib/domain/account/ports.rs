use async_trait::async_trait;

use crate::domain::account::errors::AccountError;
use crate::domain::token::models::IssuedToken;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;

/// Port for the forgot-password workflow.
#[async_trait]
pub trait PasswordResetServicePort: Send + Sync + 'static {
    /// Issue a reset token for the account registered under `email` and mail it.
    /// Earlier reset tokens of the account stop working.
    ///
    /// # Errors
    /// * `UserNotFound` - No registered (non-guest) account uses this email
    async fn request(&self, email: &EmailAddress) -> Result<(), AccountError>;

    /// Consume a reset token, set the new password and revoke every session.
    ///
    /// # Errors
    /// * `WeakPassword` - Checked before the token is consumed
    /// * `InvalidToken` - Token malformed, unknown, expired, consumed or for another workflow
    async fn complete(&self, token: &str, new_password: &str) -> Result<(), AccountError>;
}

/// Port for the email-verification workflow.
#[async_trait]
pub trait EmailVerificationServicePort: Send + Sync + 'static {
    /// Issue a verification token for `user` and mail it.
    /// Earlier verification tokens of the user stop working.
    async fn issue(&self, user: &User) -> Result<IssuedToken, AccountError>;

    /// Issue a fresh verification token for the account registered under `email`.
    ///
    /// # Errors
    /// * `UserNotFound` - No registered (non-guest) account uses this email
    /// * `AlreadyVerified` - Nothing to verify
    async fn resend(&self, email: &EmailAddress) -> Result<(), AccountError>;

    /// Consume a verification token and mark the owner's email verified.
    ///
    /// # Errors
    /// * `InvalidToken` - Token not usable
    /// * `UserNotFound` - Owner no longer exists
    async fn complete(&self, token: &str) -> Result<User, AccountError>;
}
