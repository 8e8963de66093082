use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;

use super::login::AccessTokenData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::errors::SessionError;
use crate::inbound::http::router::AppState;

/// Rotate the refresh token held in the cookie.
///
/// Any failure clears the cookie so the client stops presenting a dead token.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<AccessTokenData>), (CookieJar, ApiError)> {
    let cookie = &state.refresh_cookie;

    let Some(presented) = cookie.read(&jar) else {
        return Err((
            cookie.clear(jar),
            ApiError::from(SessionError::NotFound),
        ));
    };

    match state.session_service.refresh(&presented).await {
        Ok(pair) => {
            let data = AccessTokenData::from(&pair);
            Ok((
                cookie.set(jar, pair.refresh_token),
                ApiSuccess::new(StatusCode::OK, data),
            ))
        }
        Err(e) => {
            tracing::info!(error = %e, "Refresh rejected");
            Err((cookie.clear(jar), ApiError::from(e)))
        }
    }
}
