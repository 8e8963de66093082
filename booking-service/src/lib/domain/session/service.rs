use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;

use crate::domain::session::authority::TokenAuthority;
use crate::domain::session::errors::SessionError;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::TokenPair;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::SessionServicePort;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserRepository;

/// Domain service implementation for session operations.
pub struct SessionService<UR, RR>
where
    UR: UserRepository,
    RR: RefreshTokenRepository,
{
    users: Arc<UR>,
    authority: Arc<TokenAuthority<RR, UR>>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl<UR, RR> SessionService<UR, RR>
where
    UR: UserRepository,
    RR: RefreshTokenRepository,
{
    pub fn new(
        users: Arc<UR>,
        authority: Arc<TokenAuthority<RR, UR>>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            authority,
            password_hasher,
        }
    }

    async fn check_credentials(&self, command: &LoginCommand) -> Result<User, SessionError> {
        let username =
            Username::new(command.username.clone()).map_err(|_| SessionError::InvalidCredentials)?;

        let user = self
            .users
            .find_by_username(&username)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        if user.is_guest {
            tracing::debug!(user_id = %user.id, "Login attempted for guest account");
            return Err(SessionError::InvalidCredentials);
        }

        let matches = self
            .password_hasher
            .verify(&command.password, &user.password_hash)
            .unwrap_or_else(|e| {
                tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
                false
            });

        if !matches {
            return Err(SessionError::InvalidCredentials);
        }

        Ok(user)
    }
}

#[async_trait]
impl<UR, RR> SessionServicePort for SessionService<UR, RR>
where
    UR: UserRepository,
    RR: RefreshTokenRepository,
{
    async fn login(&self, command: LoginCommand) -> Result<(User, TokenPair), SessionError> {
        let user = self.check_credentials(&command).await?;

        if !user.email_verified {
            return Err(SessionError::EmailNotVerified);
        }

        let pair = self.authority.issue_pair(&user).await?;
        Ok((user, pair))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        self.authority.rotate(refresh_token).await
    }

    async fn logout(&self, refresh_token: Option<&str>) -> Result<(), SessionError> {
        match refresh_token {
            Some(token) => self.authority.revoke_presented(token).await,
            None => Ok(()),
        }
    }

    async fn active_session_count(&self, user_id: &UserId) -> Result<u64, SessionError> {
        self.authority.active_session_count(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use auth::clock::ManualClock;
    use auth::Clock;
    use auth::JwtCodec;
    use auth::KeyRing;
    use auth::PasswordError;
    use chrono::Duration;
    use chrono::Utc;
    use mockall::mock;

    use super::*;
    use crate::domain::session::authority::TokenLifetimes;
    use crate::domain::user::errors::UserError;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::Role;
    use crate::outbound::repositories::memory::InMemoryRefreshTokenRepository;

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

    /// Hasher that accepts exactly `"hash:" + password`.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, PasswordError> {
            Ok(format!("hash:{}", password))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
            Ok(hash == format!("hash:{}", password))
        }
    }

    fn user(verified: bool, guest: bool) -> User {
        User {
            id: UserId::new(),
            username: Username::new("alice".to_string()).unwrap(),
            email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
            password_hash: "hash:password123".to_string(),
            role: Role::User,
            is_guest: guest,
            email_verified: verified,
            created_at: Utc::now(),
        }
    }

    fn service(
        repository: MockTestUserRepository,
    ) -> SessionService<MockTestUserRepository, InMemoryRefreshTokenRepository> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
        let codec = Arc::new(JwtCodec::new(
            KeyRing::new("k1", b"test-secret-key-for-jwt-signing-at-least-32-bytes").unwrap(),
            Arc::clone(&clock),
            5,
        ));
        let users = Arc::new(repository);
        let authority = Arc::new(TokenAuthority::new(
            Arc::new(InMemoryRefreshTokenRepository::new()),
            Arc::clone(&users),
            codec,
            clock,
            TokenLifetimes {
                access: Duration::minutes(15),
                refresh: Duration::days(7),
            },
        ));

        SessionService::new(users, authority, Arc::new(PlainHasher))
    }

    fn login(password: &str) -> LoginCommand {
        LoginCommand {
            username: "alice".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut repository = MockTestUserRepository::new();
        let alice = user(true, false);
        let returned = alice.clone();
        repository
            .expect_find_by_username()
            .withf(|username| username.as_str() == "alice")
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));

        let service = service(repository);
        let (logged_in, pair) = service.login(login("password123")).await.unwrap();

        assert_eq!(logged_in.id, alice.id);
        assert!(!pair.access_token.is_empty());
        assert_eq!(service.active_session_count(&alice.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut repository = MockTestUserRepository::new();
        let alice = user(true, false);
        repository
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(alice.clone())));

        let result = service(repository).login(login("wrong-password")).await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_username()
            .times(1)
            .returning(|_| Ok(None));

        let result = service(repository).login(login("password123")).await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_invalid_username_skips_lookup() {
        let mut repository = MockTestUserRepository::new();
        repository.expect_find_by_username().times(0);

        let command = LoginCommand {
            username: "a b".to_string(),
            password: "password123".to_string(),
        };
        let result = service(repository).login(command).await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unverified_email() {
        let mut repository = MockTestUserRepository::new();
        let alice = user(false, false);
        repository
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(alice.clone())));

        let result = service(repository).login(login("password123")).await;
        assert!(matches!(result, Err(SessionError::EmailNotVerified)));
    }

    #[tokio::test]
    async fn test_login_guest_account_rejected() {
        let mut repository = MockTestUserRepository::new();
        let guest = user(true, true);
        repository
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(guest.clone())));

        let result = service(repository).login(login("password123")).await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_then_logout() {
        let mut repository = MockTestUserRepository::new();
        let alice = user(true, false);
        let by_name = alice.clone();
        let by_id = alice.clone();
        repository
            .expect_find_by_username()
            .returning(move |_| Ok(Some(by_name.clone())));
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(by_id.clone())));

        let service = service(repository);
        let (_, first) = service.login(login("password123")).await.unwrap();
        let second = service.refresh(&first.refresh_token).await.unwrap();

        service.logout(Some(&second.refresh_token)).await.unwrap();

        assert!(matches!(
            service.refresh(&second.refresh_token).await,
            Err(SessionError::Reused)
        ));
        assert_eq!(service.active_session_count(&alice.id).await.unwrap(), 0);
        assert!(service.logout(None).await.is_ok());
    }
}
