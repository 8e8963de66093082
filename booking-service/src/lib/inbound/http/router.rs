use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::cookies::RefreshCookie;
use super::handlers::email_verification::resend_verification;
use super::handlers::email_verification::verify_email;
use super::handlers::get_current_user::get_current_user;
use super::handlers::guest_booking::cancel_guest_booking;
use super::handlers::guest_booking::confirm_guest_booking;
use super::handlers::guest_booking::create_guest_booking;
use super::handlers::guest_booking::view_guest_booking;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::password_reset::forgot_password;
use super::handlers::password_reset::reset_password;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::middleware::require_authenticated;
use crate::domain::account::ports::EmailVerificationServicePort;
use crate::domain::account::ports::PasswordResetServicePort;
use crate::domain::booking::ports::GuestBookingServicePort;
use crate::domain::session::gateway::AuthenticationGateway;
use crate::domain::session::ports::SessionServicePort;
use crate::domain::user::ports::UserServicePort;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServicePort>,
    pub session_service: Arc<dyn SessionServicePort>,
    pub password_reset: Arc<dyn PasswordResetServicePort>,
    pub email_verification: Arc<dyn EmailVerificationServicePort>,
    pub guest_bookings: Arc<dyn GuestBookingServicePort>,
    pub gateway: Arc<AuthenticationGateway>,
    pub refresh_cookie: RefreshCookie,
}

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/password/forgot", post(forgot_password))
        .route("/api/auth/password/reset", post(reset_password))
        .route("/api/auth/email/verify", post(verify_email))
        .route("/api/auth/email/resend", post(resend_verification))
        .route("/api/bookings/guest", post(create_guest_booking))
        .route("/api/bookings/guest/view", post(view_guest_booking))
        .route("/api/bookings/guest/confirm", post(confirm_guest_booking))
        .route("/api/bookings/guest/cancel", post(cancel_guest_booking));

    let protected_routes = Router::new()
        .route("/api/users/me", get(get_current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_authenticated,
        ));

    // Headers stay out of the span: they carry bearer tokens and cookies.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
