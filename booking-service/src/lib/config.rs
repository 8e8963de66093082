use std::collections::HashMap;
use std::env;

use auth::JwtError;
use auth::KeyRing;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub tokens: TokenConfig,
    pub links: LinksConfig,
    pub kafka: KafkaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Signing keys and credential lifetimes.
///
/// `keys` maps key id to secret. Every key verifies; only `active_key_id` signs.
#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub active_key_id: String,
    pub keys: HashMap<String, String>,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub leeway_seconds: i64,
}

impl JwtConfig {
    pub fn key_ring(&self) -> Result<KeyRing, JwtError> {
        KeyRing::from_secrets(
            &self.active_key_id,
            self.keys
                .iter()
                .map(|(kid, secret)| (kid.as_str(), secret.as_bytes())),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_minutes)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_days)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("active_key_id", &self.active_key_id)
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

/// Attributes of the refresh-token cookie.
#[derive(Debug, Deserialize, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    /// `strict`, `lax` or `none`
    pub same_site: String,
    pub path: String,
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub password_reset_hours: i64,
    pub email_verification_days: i64,
    /// Guest tokens stay valid this long after the booking window ends.
    pub guest_grace_days: i64,
}

impl TokenConfig {
    pub fn password_reset_ttl(&self) -> Duration {
        Duration::hours(self.password_reset_hours)
    }

    pub fn email_verification_ttl(&self) -> Duration {
        Duration::days(self.email_verification_days)
    }

    pub fn guest_grace(&self) -> Duration {
        Duration::days(self.guest_grace_days)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LinksConfig {
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__ACTIVE_KEY_ID, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject configurations that would weaken or break token handling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.jwt.keys.contains_key(&self.jwt.active_key_id) {
            return Err(ConfigError::Message(format!(
                "jwt.active_key_id '{}' is not among jwt.keys",
                self.jwt.active_key_id
            )));
        }

        for (kid, secret) in &self.jwt.keys {
            if secret.len() < KeyRing::MIN_SECRET_BYTES {
                return Err(ConfigError::Message(format!(
                    "jwt key '{}' must be at least {} bytes",
                    kid,
                    KeyRing::MIN_SECRET_BYTES
                )));
            }
        }

        let lifetimes = [
            ("jwt.access_token_minutes", self.jwt.access_token_minutes),
            ("jwt.refresh_token_days", self.jwt.refresh_token_days),
            ("tokens.password_reset_hours", self.tokens.password_reset_hours),
            ("tokens.email_verification_days", self.tokens.email_verification_days),
        ];
        for (name, value) in lifetimes {
            if value <= 0 {
                return Err(ConfigError::Message(format!("{} must be positive", name)));
            }
        }

        if self.jwt.leeway_seconds < 0 || self.tokens.guest_grace_days < 0 {
            return Err(ConfigError::Message(
                "jwt.leeway_seconds and tokens.guest_grace_days must not be negative".to_string(),
            ));
        }

        if !matches!(
            self.cookie.same_site.to_ascii_lowercase().as_str(),
            "strict" | "lax" | "none"
        ) {
            return Err(ConfigError::Message(format!(
                "cookie.same_site '{}' must be strict, lax or none",
                self.cookie.same_site
            )));
        }

        Ok(())
    }
}
