use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::account::errors::AccountError;
use crate::domain::booking::errors::BookingError;
use crate::domain::session::errors::SessionError;
use crate::domain::user::errors::UserError;

pub mod email_verification;
pub mod get_current_user;
pub mod guest_booking;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod refresh;
pub mod register;

const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
const INVALID_TOKEN: &str = "Invalid or expired token";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => ApiError::NotFound(err.to_string()),
            UserError::UsernameAlreadyExists(_) | UserError::EmailAlreadyExists(_) => {
                ApiError::Conflict(err.to_string())
            }
            UserError::InvalidUsername(_)
            | UserError::InvalidEmail(_)
            | UserError::InvalidUserId(_)
            | UserError::WeakPassword(_) => ApiError::UnprocessableEntity(err.to_string()),
            UserError::InvalidRole(_)
            | UserError::HashingFailed(_)
            | UserError::DatabaseError(_)
            | UserError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

/// Every refresh failure looks the same to the caller.
impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Malformed
            | SessionError::NotFound
            | SessionError::Expired
            | SessionError::Reused => ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()),
            SessionError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            SessionError::EmailNotVerified => ApiError::Forbidden(err.to_string()),
            SessionError::User(e) => ApiError::from(e),
            SessionError::Signing(_) | SessionError::DatabaseError(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidToken(_) => ApiError::BadRequest(INVALID_TOKEN.to_string()),
            AccountError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            AccountError::AlreadyVerified => ApiError::Conflict(err.to_string()),
            AccountError::WeakPassword(_) => ApiError::UnprocessableEntity(err.to_string()),
            AccountError::User(e) => ApiError::from(e),
            AccountError::Session(e) => ApiError::from(e),
            AccountError::HashingFailed(_) | AccountError::DatabaseError(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidToken(_) => ApiError::BadRequest(INVALID_TOKEN.to_string()),
            BookingError::NotFound(_) => ApiError::NotFound(err.to_string()),
            BookingError::InvalidWindow(_) => ApiError::UnprocessableEntity(err.to_string()),
            BookingError::NotPending(_)
            | BookingError::StatusChanged(_)
            | BookingError::AlreadyExpired
            | BookingError::Cancelled
            | BookingError::EmailAlreadyRegistered
            | BookingError::Transition(_) => ApiError::Conflict(err.to_string()),
            BookingError::DatabaseError(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

/// Body for accepted requests that return nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::errors::OpaqueTokenError;

    #[test]
    fn test_refresh_failures_are_indistinguishable() {
        let responses: Vec<ApiError> = [
            SessionError::Malformed,
            SessionError::NotFound,
            SessionError::Expired,
            SessionError::Reused,
        ]
        .into_iter()
        .map(ApiError::from)
        .collect();

        for response in responses {
            assert_eq!(
                response,
                ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string())
            );
        }
    }

    #[test]
    fn test_token_failures_do_not_leak_reason() {
        for err in [
            OpaqueTokenError::NotFound,
            OpaqueTokenError::Expired,
            OpaqueTokenError::AlreadyConsumed,
        ] {
            assert_eq!(
                ApiError::from(BookingError::InvalidToken(err.clone())),
                ApiError::BadRequest(INVALID_TOKEN.to_string())
            );
            assert_eq!(
                ApiError::from(AccountError::InvalidToken(err)),
                ApiError::BadRequest(INVALID_TOKEN.to_string())
            );
        }
    }
}
