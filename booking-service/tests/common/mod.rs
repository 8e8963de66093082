use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use auth::clock::ManualClock;
use auth::Argon2Hasher;
use auth::Clock;
use auth::JwtCodec;
use auth::KeyRing;
use auth::PasswordHasher;
use booking_service::config::CookieConfig;
use booking_service::domain::account::email_verification::EmailVerificationService;
use booking_service::domain::account::password_reset::PasswordResetService;
use booking_service::domain::booking::models::Booking;
use booking_service::domain::booking::ports::BookingRepository;
use booking_service::domain::booking::ports::GuestBookingServicePort;
use booking_service::domain::booking::service::GuestAccessService;
use booking_service::domain::notification::errors::NotificationError;
use booking_service::domain::notification::events::NotificationEvent;
use booking_service::domain::notification::links::LinkBuilder;
use booking_service::domain::notification::ports::NotificationSink;
use booking_service::domain::session::authority::TokenAuthority;
use booking_service::domain::session::authority::TokenLifetimes;
use booking_service::domain::session::gateway::AuthenticationGateway;
use booking_service::domain::session::service::SessionService;
use booking_service::domain::token::service::OpaqueTokenStore;
use booking_service::domain::user::models::EmailAddress;
use booking_service::domain::user::models::UserId;
use booking_service::domain::user::service::UserService;
use booking_service::inbound::http::cookies::RefreshCookie;
use booking_service::inbound::http::router::create_router;
use booking_service::inbound::http::router::AppState;
use booking_service::outbound::repositories::memory::InMemoryBookingRepository;
use booking_service::outbound::repositories::memory::InMemoryOpaqueTokenRepository;
use booking_service::outbound::repositories::memory::InMemoryRefreshTokenRepository;
use booking_service::outbound::repositories::memory::InMemoryUserRepository;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const PASSWORD: &str = "correct_horse_battery";

type GuestAccess = GuestAccessService<
    InMemoryBookingRepository,
    InMemoryUserRepository,
    InMemoryOpaqueTokenRepository,
    RecordingSink,
>;

/// Notification sink that keeps every published event for inspection.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    /// Events published so far. Publishing runs on detached tasks, so this
    /// first gives those tasks a moment to finish.
    pub async fn events(&self) -> Vec<NotificationEvent> {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        self.events.lock().unwrap().clone()
    }

    /// Token of the most recent event of `event_type` sent to `email`.
    pub async fn last_token(&self, event_type: &str, email: &str) -> Option<String> {
        self.events()
            .await
            .into_iter()
            .rev()
            .find(|e| e.event_type() == event_type && e.recipient() == email)
            .and_then(|e| e.token().map(str::to_string))
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Test application that spawns a real server over in-memory adapters.
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub clock: Arc<ManualClock>,
    pub notifications: Arc<RecordingSink>,
    pub bookings: Arc<InMemoryBookingRepository>,
    pub guest_bookings: Arc<GuestAccess>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let codec = Arc::new(JwtCodec::new(
            KeyRing::new("test", JWT_SECRET).expect("valid key"),
            Arc::clone(&dyn_clock),
            0,
        ));
        let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new());
        let links = LinkBuilder::new("https://book.example.com");
        let notifications = Arc::new(RecordingSink::default());

        let users = Arc::new(InMemoryUserRepository::new());
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let opaque_tokens = Arc::new(OpaqueTokenStore::new(
            Arc::new(InMemoryOpaqueTokenRepository::new()),
            Arc::clone(&dyn_clock),
        ));
        let lifetimes = TokenLifetimes {
            access: Duration::minutes(15),
            refresh: Duration::days(7),
        };
        let authority = Arc::new(TokenAuthority::new(
            Arc::new(InMemoryRefreshTokenRepository::new()),
            Arc::clone(&users),
            Arc::clone(&codec),
            Arc::clone(&dyn_clock),
            lifetimes,
        ));

        let email_verification = Arc::new(EmailVerificationService::new(
            Arc::clone(&users),
            Arc::clone(&opaque_tokens),
            Arc::clone(&notifications),
            Duration::days(3),
            links.clone(),
        ));
        let guest_bookings = Arc::new(GuestAccessService::new(
            Arc::clone(&bookings),
            Arc::clone(&users),
            Arc::clone(&opaque_tokens),
            Arc::clone(&notifications),
            Arc::clone(&dyn_clock),
            Duration::days(1),
            links.clone(),
        ));

        let state = AppState {
            user_service: Arc::new(UserService::new(
                Arc::clone(&users),
                Arc::clone(&email_verification),
                Arc::clone(&password_hasher),
            )),
            session_service: Arc::new(SessionService::new(
                Arc::clone(&users),
                Arc::clone(&authority),
                Arc::clone(&password_hasher),
            )),
            password_reset: Arc::new(PasswordResetService::new(
                Arc::clone(&users),
                Arc::clone(&opaque_tokens),
                Arc::clone(&authority),
                Arc::clone(&notifications),
                password_hasher,
                Duration::hours(2),
                links,
            )),
            email_verification,
            guest_bookings: guest_bookings.clone(),
            gateway: Arc::new(AuthenticationGateway::new(codec)),
            refresh_cookie: RefreshCookie::new(
                &CookieConfig {
                    name: "refresh_token".to_string(),
                    secure: false,
                    same_site: "strict".to_string(),
                    path: "/api/auth".to_string(),
                    domain: None,
                },
                lifetimes.refresh,
            ),
        };

        let router = create_router(state);

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
            clock,
            notifications,
            bookings,
            guest_bookings,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register `username` and return the verification token that was mailed.
    pub async fn register(&self, username: &str) -> String {
        let email = email_for(username);
        let response = self
            .post("/api/auth/register")
            .json(&json!({
                "username": username,
                "email": email,
                "password": PASSWORD
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        self.notifications
            .last_token("email_verification_requested", &email)
            .await
            .expect("verification token mailed")
    }

    /// Register, verify and log in. Returns the access token; the refresh
    /// token sits in the client's cookie store.
    pub async fn signed_in(&self, username: &str) -> String {
        let token = self.register(username).await;
        let response = self
            .post("/api/auth/email/verify")
            .json(&json!({ "token": token }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        self.login(username, PASSWORD).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["data"]["token"]["access_token"]
            .as_str()
            .expect("access token in body")
            .to_string()
    }

    /// Seed a pending guest booking starting `starts_in` from now and return
    /// it with the guest token that was mailed.
    pub async fn guest_booking(&self, starts_in: Duration) -> (Booking, String) {
        let now = self.clock.now();
        let booking = Booking::pending(
            UserId::new(),
            EmailAddress::new("guest@example.com".to_string()).unwrap(),
            now + starts_in,
            now + starts_in + Duration::hours(2),
            now,
        );
        self.bookings
            .insert(booking.clone())
            .await
            .expect("booking stored");

        let issued = self
            .guest_bookings
            .issue_for_booking(&booking)
            .await
            .expect("guest token issued");
        (booking, issued.value)
    }
}

/// A second client with its own cookie store, for presenting stolen cookies.
pub fn fresh_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create reqwest client")
}

pub fn email_for(username: &str) -> String {
    format!("{}@example.com", username)
}

/// Extract the refresh cookie value from a `Set-Cookie` header.
pub fn refresh_cookie(response: &reqwest::Response) -> Option<String> {
    let cookies: HashMap<String, String> = response
        .cookies()
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect();
    cookies.get("refresh_token").cloned()
}
