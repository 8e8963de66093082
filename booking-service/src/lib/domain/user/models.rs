use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::user::errors::EmailError;
use crate::domain::user::errors::PasswordStrengthError;
use crate::domain::user::errors::RoleError;
use crate::domain::user::errors::UserIdError;
use crate::domain::user::errors::UsernameError;

/// User aggregate entity.
///
/// Guest accounts are created implicitly when a booking is made without
/// registering; they have no usable password and cannot log in.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: EmailAddress,
    pub password_hash: String,
    pub role: Role,
    pub is_guest: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    const GUEST_PREFIX_MAX: usize = 17;

    /// Implicit account for someone booking without registering.
    ///
    /// # Arguments
    /// * `email` - Address the booking was made with
    /// * `now` - Creation instant
    ///
    /// # Returns
    /// Unverified guest with a `guest_<local part>_<suffix>` username and no password
    ///
    /// # Errors
    /// * `UsernameError` - Generated username failed validation
    pub fn guest(email: EmailAddress, now: DateTime<Utc>) -> Result<Self, UsernameError> {
        let local_part: String = email
            .as_str()
            .split('@')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .take(Self::GUEST_PREFIX_MAX)
            .collect();
        let suffix = Uuid::new_v4().simple().to_string();
        let username = Username::new(format!("guest_{}_{}", local_part, &suffix[..8]))?;

        Ok(Self {
            id: UserId::new(),
            username,
            email,
            password_hash: String::new(),
            role: Role::User,
            is_guest: true,
            email_verified: false,
            created_at: now,
        })
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    ///
    /// # Returns
    /// UserId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Arguments
    /// * `s` - UUID string to parse
    ///
    /// # Returns
    /// Parsed UserId
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Ensures username is 3-32 characters and contains only alphanumeric, underscore, and hyphen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 32;

    /// Create a new valid username.
    ///
    /// Validates length and character constraints.
    ///
    /// # Arguments
    /// * `username` - Raw username string
    ///
    /// # Returns
    /// Validated Username value object
    ///
    /// # Errors
    /// * `TooShort` - Username shorter than 3 characters
    /// * `TooLong` - Username longer than 32 characters
    /// * `InvalidCharacters` - Contains non-alphanumeric characters (except _ and -)
    pub fn new(username: String) -> Result<Self, UsernameError> {
        let username = Self::with_valid_length(username)?;
        let username = Self::with_valid_chars(username)?;
        Ok(Self(username))
    }

    fn with_valid_length(username: String) -> Result<String, UsernameError> {
        let length = username.len();
        if length < Self::MIN_LENGTH {
            Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(username)
        }
    }

    fn with_valid_chars(username: String) -> Result<String, UsernameError> {
        if username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            Ok(username)
        } else {
            Err(UsernameError::InvalidCharacters)
        }
    }

    /// Get username as string slice.
    ///
    /// # Returns
    /// Username string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Arguments
    /// * `email` - Raw email string
    ///
    /// # Returns
    /// Validated EmailAddress value object
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Get email as string slice.
    ///
    /// # Returns
    /// Email string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Platform role granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    User,
    Provider,
    Admin,
}

impl Role {
    /// Storage and claim name of the role.
    ///
    /// # Returns
    /// "USER", "PROVIDER" or "ADMIN"
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Provider => "PROVIDER",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "PROVIDER" => Ok(Role::Provider),
            "ADMIN" => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plaintext password that satisfies the strength policy.
///
/// Never logged or persisted; only its hash is stored.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    pub const MIN_LENGTH: usize = 8;

    /// Accept a plaintext password that meets the strength policy.
    ///
    /// # Arguments
    /// * `password` - Plaintext password as submitted
    ///
    /// # Returns
    /// NewPassword wrapping the plaintext
    ///
    /// # Errors
    /// * `TooShort` - Fewer than 8 characters
    pub fn new(password: String) -> Result<Self, PasswordStrengthError> {
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(PasswordStrengthError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }
        Ok(Self(password))
    }

    /// Plaintext for hashing. Keep it out of logs.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(***)")
    }
}

/// Command to register a new user with domain types
#[derive(Debug)]
pub struct CreateUserCommand {
    pub username: Username,
    pub email: EmailAddress,
    pub password: NewPassword,
}

impl CreateUserCommand {
    /// Construct a new create user command.
    ///
    /// # Arguments
    /// * `username` - Validated username
    /// * `email` - Validated email address
    /// * `password` - Plaintext password that passed the strength policy (hashed by the service)
    ///
    /// # Returns
    /// CreateUserCommand with validated fields
    pub fn new(username: Username, email: EmailAddress, password: NewPassword) -> Self {
        Self {
            username,
            email,
            password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(Username::new("alice".to_string()).is_ok());
        assert!(matches!(
            Username::new("al".to_string()),
            Err(UsernameError::TooShort { min: 3, actual: 2 })
        ));
        assert_eq!(
            Username::new("bad name".to_string()),
            Err(UsernameError::InvalidCharacters)
        );
    }

    #[test]
    fn test_guest_username_is_derived_from_email() {
        let email = EmailAddress::new("jane.doe+trips@example.com".to_string()).unwrap();
        let guest = User::guest(email, Utc::now()).unwrap();

        assert!(guest.is_guest);
        assert!(!guest.email_verified);
        assert!(guest.password_hash.is_empty());
        assert!(guest.username.as_str().starts_with("guest_janedoetrips_"));
        assert_eq!(guest.username.as_str().len(), "guest_janedoetrips_".len() + 8);
    }

    #[test]
    fn test_guest_username_stays_within_limit() {
        let email =
            EmailAddress::new("a-very-long-local-part-for-a-mailbox@example.com".to_string())
                .unwrap();
        let guest = User::guest(email, Utc::now()).unwrap();

        assert_eq!(guest.username.as_str().len(), 32);
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::User, Role::Provider, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("ROOT".parse::<Role>().is_err());
    }

    #[test]
    fn test_new_password_requires_minimum_length() {
        assert!(NewPassword::new("longenough".to_string()).is_ok());
        assert_eq!(
            NewPassword::new("short".to_string()),
            Err(PasswordStrengthError::TooShort { min: 8, actual: 5 })
        );
    }

    #[test]
    fn test_new_password_debug_is_redacted() {
        let password = NewPassword::new("supersecret".to_string()).unwrap();
        assert!(!format!("{:?}", password).contains("supersecret"));
    }
}
