/// Builds the frontend links mailed to users.
///
/// Tokens go into the URL fragment, which browsers never send to a server,
/// so they do not show up in access logs.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    frontend_url: String,
}

impl LinkBuilder {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        let frontend_url = frontend_url.into().trim_end_matches('/').to_string();
        Self { frontend_url }
    }

    pub fn password_reset(&self, token: &str) -> String {
        self.with_token("reset-password", token)
    }

    pub fn email_verification(&self, token: &str) -> String {
        self.with_token("verify-email", token)
    }

    pub fn guest_booking(&self, token: &str) -> String {
        self.with_token("guest-booking", token)
    }

    fn with_token(&self, page: &str, token: &str) -> String {
        format!("{}/{}#token={}", self.frontend_url, page, token)
    }
}
