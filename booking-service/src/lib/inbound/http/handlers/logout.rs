use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;

use super::ApiError;
use crate::inbound::http::router::AppState;

/// Revoke the session behind the cookie, if any, and clear it.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let presented = state.refresh_cookie.read(&jar);

    state.session_service.logout(presented.as_deref()).await?;

    Ok((state.refresh_cookie.clear(jar), StatusCode::NO_CONTENT))
}
