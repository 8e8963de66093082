use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use chrono::Utc;

use crate::domain::account::ports::EmailVerificationServicePort;
use crate::domain::user::errors::UserError;
use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::domain::user::ports::UserServicePort;

/// Domain service implementation for user operations.
///
/// Concrete implementation of UserServicePort with dependency injection.
pub struct UserService<UR, EV>
where
    UR: UserRepository,
    EV: EmailVerificationServicePort,
{
    repository: Arc<UR>,
    email_verification: Arc<EV>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl<UR, EV> UserService<UR, EV>
where
    UR: UserRepository,
    EV: EmailVerificationServicePort,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `email_verification` - Issues the verification mail after registration
    /// * `password_hasher` - Password hashing capability
    pub fn new(
        repository: Arc<UR>,
        email_verification: Arc<EV>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            repository,
            email_verification,
            password_hasher,
        }
    }
}

#[async_trait]
impl<UR, EV> UserServicePort for UserService<UR, EV>
where
    UR: UserRepository,
    EV: EmailVerificationServicePort,
{
    async fn create_user(&self, command: CreateUserCommand) -> Result<User, UserError> {
        let password_hash = self
            .password_hasher
            .hash(command.password.expose())
            .map_err(|e| UserError::HashingFailed(e.to_string()))?;

        let user = User {
            id: UserId::new(),
            username: command.username,
            email: command.email,
            password_hash,
            role: Role::User,
            is_guest: false,
            email_verified: false,
            created_at: Utc::now(),
        };

        let created_user = self.repository.create(user).await?;

        if let Err(e) = self.email_verification.issue(&created_user).await {
            tracing::error!(
                user_id = %created_user.id,
                error = %e,
                "Failed to issue email verification"
            );
        }

        tracing::info!(user_id = %created_user.id, "User registered");
        Ok(created_user)
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use auth::Argon2Hasher;
    use chrono::Duration;
    use mockall::mock;

    use super::*;
    use crate::domain::account::errors::AccountError;
    use crate::domain::token::models::IssuedToken;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::NewPassword;
    use crate::domain::user::models::Username;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
            async fn find_by_username(&self, username: &Username) -> Result<Option<User>, UserError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;
            async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), UserError>;
            async fn mark_email_verified(&self, id: &UserId) -> Result<(), UserError>;
        }
    }

    mock! {
        pub TestEmailVerification {}

        #[async_trait]
        impl EmailVerificationServicePort for TestEmailVerification {
            async fn issue(&self, user: &User) -> Result<IssuedToken, AccountError>;
            async fn resend(&self, email: &EmailAddress) -> Result<(), AccountError>;
            async fn complete(&self, token: &str) -> Result<User, AccountError>;
        }
    }

    fn command(username: &str, email: &str) -> CreateUserCommand {
        CreateUserCommand::new(
            Username::new(username.to_string()).unwrap(),
            EmailAddress::new(email.to_string()).unwrap(),
            NewPassword::new("password123".to_string()).unwrap(),
        )
    }

    fn issued() -> IssuedToken {
        IssuedToken {
            value: uuid::Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::days(3),
        }
    }

    fn service(
        repository: MockTestUserRepository,
        verification: MockTestEmailVerification,
    ) -> UserService<MockTestUserRepository, MockTestEmailVerification> {
        UserService::new(
            Arc::new(repository),
            Arc::new(verification),
            Arc::new(Argon2Hasher),
        )
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let mut repository = MockTestUserRepository::new();
        let mut verification = MockTestEmailVerification::new();

        repository
            .expect_create()
            .withf(|user| {
                user.username.as_str() == "testuser"
                    && user.email.as_str() == "test@example.com"
                    && user.password_hash.starts_with("$argon2")
                    && user.role == Role::User
                    && !user.is_guest
                    && !user.email_verified
            })
            .times(1)
            .returning(|user| Ok(user));

        verification
            .expect_issue()
            .withf(|user| user.username.as_str() == "testuser")
            .times(1)
            .returning(|_| Ok(issued()));

        let result = service(repository, verification)
            .create_user(command("testuser", "test@example.com"))
            .await;

        let user = result.unwrap();
        assert_eq!(user.username.as_str(), "testuser");
        assert!(!user.email_verified);
    }

    #[tokio::test]
    async fn test_create_user_survives_verification_failure() {
        let mut repository = MockTestUserRepository::new();
        let mut verification = MockTestEmailVerification::new();

        repository.expect_create().times(1).returning(|user| Ok(user));
        verification
            .expect_issue()
            .times(1)
            .returning(|_| Err(AccountError::DatabaseError("down".to_string())));

        let result = service(repository, verification)
            .create_user(command("testuser", "test@example.com"))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username() {
        let mut repository = MockTestUserRepository::new();
        let mut verification = MockTestEmailVerification::new();

        repository.expect_create().times(1).returning(|user| {
            Err(UserError::UsernameAlreadyExists(
                user.username.as_str().to_string(),
            ))
        });
        verification.expect_issue().times(0);

        let result = service(repository, verification)
            .create_user(command("testuser", "test2@example.com"))
            .await;

        assert!(matches!(
            result.unwrap_err(),
            UserError::UsernameAlreadyExists(_)
        ));
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email() {
        let mut repository = MockTestUserRepository::new();
        let mut verification = MockTestEmailVerification::new();

        repository.expect_create().times(1).returning(|user| {
            Err(UserError::EmailAlreadyExists(user.email.as_str().to_string()))
        });
        verification.expect_issue().times(0);

        let result = service(repository, verification)
            .create_user(command("user2", "test@example.com"))
            .await;

        assert!(matches!(
            result.unwrap_err(),
            UserError::EmailAlreadyExists(_)
        ));
    }

    #[tokio::test]
    async fn test_get_user_success() {
        let mut repository = MockTestUserRepository::new();

        let user_id = UserId::new();
        let expected_user = User {
            id: user_id,
            username: Username::new("testuser".to_string()).unwrap(),
            email: EmailAddress::new("test@example.com".to_string()).unwrap(),
            password_hash: "$argon2id$test_hash".to_string(),
            role: Role::Provider,
            is_guest: false,
            email_verified: true,
            created_at: Utc::now(),
        };

        let returned_user = expected_user.clone();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(returned_user.clone())));

        let user = service(repository, MockTestEmailVerification::new())
            .get_user(&user_id)
            .await
            .unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::Provider);
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let result = service(repository, MockTestEmailVerification::new())
            .get_user(&UserId::new())
            .await;

        assert!(matches!(result.unwrap_err(), UserError::NotFound(_)));
    }
}
