use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::booking::models::Booking;
use crate::domain::booking::models::CreateGuestBookingCommand;
use crate::domain::user::errors::EmailError;
use crate::domain::user::models::EmailAddress;
use crate::inbound::http::router::AppState;

/// Book without an account. The access link goes out by mail only, so the
/// response carries the booking and the link's expiry but not the token.
pub async fn create_guest_booking(
    State(state): State<AppState>,
    Json(body): Json<CreateGuestBookingRequest>,
) -> Result<ApiSuccess<GuestBookingCreatedData>, ApiError> {
    state
        .guest_bookings
        .create(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|(ref booking, issued)| {
            ApiSuccess::new(
                StatusCode::CREATED,
                GuestBookingCreatedData {
                    booking: booking.into(),
                    access_expires_at: issued.expires_at,
                },
            )
        })
}

/// Show the booking behind a guest link. The token stays usable.
pub async fn view_guest_booking(
    State(state): State<AppState>,
    Json(body): Json<GuestTokenRequest>,
) -> Result<ApiSuccess<BookingData>, ApiError> {
    state
        .guest_bookings
        .view(&body.token)
        .await
        .map_err(ApiError::from)
        .map(|ref booking| ApiSuccess::new(StatusCode::OK, booking.into()))
}

/// Confirm the booking behind a guest link. The token is spent.
pub async fn confirm_guest_booking(
    State(state): State<AppState>,
    Json(body): Json<GuestTokenRequest>,
) -> Result<ApiSuccess<BookingData>, ApiError> {
    state
        .guest_bookings
        .confirm(&body.token)
        .await
        .map_err(ApiError::from)
        .map(|ref booking| ApiSuccess::new(StatusCode::OK, booking.into()))
}

/// Cancel the booking behind a guest link, confirmed or not.
pub async fn cancel_guest_booking(
    State(state): State<AppState>,
    Json(body): Json<GuestTokenRequest>,
) -> Result<ApiSuccess<BookingData>, ApiError> {
    state
        .guest_bookings
        .cancel(&body.token)
        .await
        .map_err(ApiError::from)
        .map(|ref booking| ApiSuccess::new(StatusCode::OK, booking.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateGuestBookingRequest {
    email: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
enum ParseCreateGuestBookingRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),
}

impl CreateGuestBookingRequest {
    fn try_into_command(self) -> Result<CreateGuestBookingCommand, ParseCreateGuestBookingRequestError> {
        let email = EmailAddress::new(self.email)?;
        Ok(CreateGuestBookingCommand::new(email, self.start_time, self.end_time))
    }
}

impl From<ParseCreateGuestBookingRequestError> for ApiError {
    fn from(err: ParseCreateGuestBookingRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestTokenRequest {
    token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingData {
    pub id: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub customer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestBookingCreatedData {
    pub booking: BookingData,
    pub access_expires_at: DateTime<Utc>,
}

impl From<&Booking> for BookingData {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            status: booking.status.as_str().to_string(),
            start_time: booking.start_time,
            end_time: booking.end_time,
            customer_email: booking.customer_email.as_str().to_string(),
        }
    }
}
