use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::register::UserData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::TokenPair;
use crate::inbound::http::router::AppState;

/// Exchange credentials for an access token; the refresh token goes into the cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequestBody>,
) -> Result<(CookieJar, ApiSuccess<LoginResponseData>), ApiError> {
    let (user, pair) = state
        .session_service
        .login(LoginCommand {
            username: body.username,
            password: body.password,
        })
        .await?;

    let jar = state.refresh_cookie.set(jar, pair.refresh_token.clone());

    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::OK,
            LoginResponseData {
                user: (&user).into(),
                token: (&pair).into(),
            },
        ),
    ))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    username: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub user: UserData,
    pub token: AccessTokenData,
}

/// Access token as returned to the client. The refresh token never appears in a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessTokenData {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&TokenPair> for AccessTokenData {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access_token.clone(),
            token_type: "Bearer".to_string(),
            expires_at: pair.access_expires_at,
        }
    }
}
