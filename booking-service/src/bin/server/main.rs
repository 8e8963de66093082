use std::sync::Arc;

use auth::clock::SystemClock;
use auth::Argon2Hasher;
use auth::Clock;
use auth::JwtCodec;
use auth::PasswordHasher;
use booking_service::config::Config;
use booking_service::domain::account::email_verification::EmailVerificationService;
use booking_service::domain::account::password_reset::PasswordResetService;
use booking_service::domain::booking::service::GuestAccessService;
use booking_service::domain::notification::links::LinkBuilder;
use booking_service::domain::session::authority::TokenAuthority;
use booking_service::domain::session::authority::TokenLifetimes;
use booking_service::domain::session::gateway::AuthenticationGateway;
use booking_service::domain::session::service::SessionService;
use booking_service::domain::token::service::OpaqueTokenStore;
use booking_service::domain::user::service::UserService;
use booking_service::inbound::http::cookies::RefreshCookie;
use booking_service::inbound::http::router::create_router;
use booking_service::inbound::http::router::AppState;
use booking_service::outbound::events::producer::KafkaNotificationProducer;
use booking_service::outbound::repositories::booking::PostgresBookingRepository;
use booking_service::outbound::repositories::opaque_token::PostgresOpaqueTokenRepository;
use booking_service::outbound::repositories::refresh_token::PostgresRefreshTokenRepository;
use booking_service::outbound::repositories::user::PostgresUserRepository;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const HOUSEKEEPING_PERIOD: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking_service=debug,auth=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "booking-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        jwt = ?config.jwt,
        kafka_brokers = %config.kafka.brokers,
        kafka_topic = %config.kafka.topic,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = Arc::new(JwtCodec::new(
        config.jwt.key_ring()?,
        Arc::clone(&clock),
        config.jwt.leeway_seconds,
    ));
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new());
    let links = LinkBuilder::new(&config.links.frontend_url);

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let refresh_repository = Arc::new(PostgresRefreshTokenRepository::new(pg_pool.clone()));
    let opaque_repository = Arc::new(PostgresOpaqueTokenRepository::new(pg_pool.clone()));
    let booking_repository = Arc::new(PostgresBookingRepository::new(pg_pool));
    let notifications = Arc::new(KafkaNotificationProducer::new(&config)?);

    let opaque_tokens = Arc::new(OpaqueTokenStore::new(
        opaque_repository,
        Arc::clone(&clock),
    ));
    let authority = Arc::new(TokenAuthority::new(
        refresh_repository,
        Arc::clone(&user_repository),
        Arc::clone(&codec),
        Arc::clone(&clock),
        TokenLifetimes {
            access: config.jwt.access_ttl(),
            refresh: config.jwt.refresh_ttl(),
        },
    ));

    let email_verification = Arc::new(EmailVerificationService::new(
        Arc::clone(&user_repository),
        Arc::clone(&opaque_tokens),
        Arc::clone(&notifications),
        config.tokens.email_verification_ttl(),
        links.clone(),
    ));
    let user_service = Arc::new(UserService::new(
        Arc::clone(&user_repository),
        Arc::clone(&email_verification),
        Arc::clone(&password_hasher),
    ));
    let session_service = Arc::new(SessionService::new(
        Arc::clone(&user_repository),
        Arc::clone(&authority),
        Arc::clone(&password_hasher),
    ));
    let password_reset = Arc::new(PasswordResetService::new(
        Arc::clone(&user_repository),
        Arc::clone(&opaque_tokens),
        Arc::clone(&authority),
        Arc::clone(&notifications),
        password_hasher,
        config.tokens.password_reset_ttl(),
        links.clone(),
    ));
    let guest_bookings = Arc::new(GuestAccessService::new(
        booking_repository,
        Arc::clone(&user_repository),
        Arc::clone(&opaque_tokens),
        notifications,
        Arc::clone(&clock),
        config.tokens.guest_grace(),
        links,
    ));

    let housekeeping_authority = Arc::clone(&authority);
    let housekeeping_tokens = Arc::clone(&opaque_tokens);
    tokio::spawn(async move {
        let retention = Duration::days(30);
        let mut interval = tokio::time::interval(HOUSEKEEPING_PERIOD);
        loop {
            interval.tick().await;
            match housekeeping_authority.cleanup_expired(retention).await {
                Ok(deleted) => tracing::info!(deleted, "Expired refresh tokens removed"),
                Err(e) => tracing::error!(error = %e, "Refresh token cleanup failed"),
            }
            match housekeeping_tokens.cleanup_expired(retention).await {
                Ok(deleted) => tracing::info!(deleted, "Expired single-use tokens removed"),
                Err(e) => tracing::error!(error = %e, "Single-use token cleanup failed"),
            }
        }
    });

    let state = AppState {
        user_service,
        session_service,
        password_reset,
        email_verification,
        guest_bookings,
        gateway: Arc::new(AuthenticationGateway::new(codec)),
        refresh_cookie: RefreshCookie::new(&config.cookie, config.jwt.refresh_ttl()),
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, create_router(state)).await?;

    Ok(())
}
