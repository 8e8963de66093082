use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::session::models::AuthOutcome;
use crate::inbound::http::router::AppState;

/// Middleware for routes that need a signed-in caller.
///
/// On success the [`Principal`](crate::domain::session::models::Principal) is
/// stored in the request extensions for handlers to extract.
pub async fn require_authenticated(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    match state.gateway.authenticate(header) {
        AuthOutcome::Authenticated(principal) => {
            tracing::debug!(user_id = %principal.user_id, "Request authenticated");
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        AuthOutcome::Anonymous => Err(ApiError::Unauthorized(
            "Missing bearer token".to_string(),
        )),
        AuthOutcome::Rejected(reason) => {
            tracing::warn!(%reason, "Access token rejected");
            Err(ApiError::Unauthorized(
                "Invalid or expired token".to_string(),
            ))
        }
    }
}
