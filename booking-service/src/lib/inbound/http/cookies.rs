use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::cookie::SameSite;

use crate::config::CookieConfig;

/// Writes and reads the refresh-token cookie.
///
/// The cookie is http-only so scripts never see the refresh token, and it is
/// scoped to the auth routes through its path.
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    name: String,
    secure: bool,
    same_site: SameSite,
    path: String,
    domain: Option<String>,
    max_age: time::Duration,
}

impl RefreshCookie {
    pub fn new(config: &CookieConfig, refresh_ttl: chrono::Duration) -> Self {
        Self {
            name: config.name.clone(),
            secure: config.secure,
            same_site: parse_same_site(&config.same_site),
            path: config.path.clone(),
            domain: config.domain.clone(),
            max_age: time::Duration::seconds(refresh_ttl.num_seconds()),
        }
    }

    pub fn read(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn set(&self, jar: CookieJar, refresh_token: String) -> CookieJar {
        jar.add(self.build(refresh_token, self.max_age))
    }

    /// Overwrite the cookie with an empty value that expires immediately.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(String::new(), time::Duration::ZERO))
    }

    fn build(&self, value: String, max_age: time::Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path(self.path.clone())
            .max_age(max_age);

        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}

fn parse_same_site(value: &str) -> SameSite {
    match value.to_ascii_lowercase().as_str() {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    }
}
