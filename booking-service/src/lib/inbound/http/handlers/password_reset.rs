use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::domain::account::errors::AccountError;
use crate::domain::user::models::EmailAddress;
use crate::inbound::http::router::AppState;

const RESET_REQUESTED: &str = "If an account uses this email, a reset link has been sent";

/// Always answers 202 for a well-formed email so callers cannot tell which accounts exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let email = EmailAddress::new(body.email)
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    match state.password_reset.request(&email).await {
        Ok(()) => {}
        Err(AccountError::UserNotFound(_)) => {
            tracing::debug!("Password reset requested for unknown email");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(ApiSuccess::new(
        StatusCode::ACCEPTED,
        MessageData::new(RESET_REQUESTED),
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    state
        .password_reset
        .complete(&body.token, &body.new_password)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageData::new("Password updated; sign in again"),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForgotPasswordRequest {
    email: String,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequest {
    token: String,
    new_password: String,
}
