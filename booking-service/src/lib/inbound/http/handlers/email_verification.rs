use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::register::UserData;
use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::domain::account::errors::AccountError;
use crate::domain::user::models::EmailAddress;
use crate::inbound::http::router::AppState;

pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .email_verification
        .complete(&body.token)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}

/// Unknown emails get the same 202 as known ones.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationRequest>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let email = EmailAddress::new(body.email)
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    match state.email_verification.resend(&email).await {
        Ok(()) | Err(AccountError::UserNotFound(_)) => Ok(ApiSuccess::new(
            StatusCode::ACCEPTED,
            MessageData::new("If the account needs verification, a new link has been sent"),
        )),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyEmailRequest {
    token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResendVerificationRequest {
    email: String,
}
