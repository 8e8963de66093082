use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

use crate::domain::booking::models::BookingStatus;
use crate::domain::booking::state_machine::BookingEvent;
use crate::domain::token::errors::OpaqueTokenError;
use crate::domain::user::errors::UserError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot apply {event} to a {from} booking")]
    NotAllowed {
        from: BookingStatus,
        event: BookingEvent,
    },

    #[error("Cannot cancel a booking after {deadline}, 24 hours before its start")]
    CancellationClosed { deadline: DateTime<Utc> },
}

/// Failures of guest booking access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("Invalid guest token: {0}")]
    InvalidToken(OpaqueTokenError),

    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Booking is {0}, expected PENDING")]
    NotPending(BookingStatus),

    #[error("Booking window has already started")]
    AlreadyExpired,

    #[error("Booking has been cancelled")]
    Cancelled,

    /// A concurrent writer moved the booking between read and update.
    #[error("Booking changed concurrently and is now {0}")]
    StatusChanged(BookingStatus),

    #[error("Invalid booking window: {0}")]
    InvalidWindow(String),

    #[error("This email is already registered. Please log in to make a booking.")]
    EmailAlreadyRegistered,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OpaqueTokenError> for BookingError {
    fn from(err: OpaqueTokenError) -> Self {
        match err {
            OpaqueTokenError::DatabaseError(e) => BookingError::DatabaseError(e),
            other => BookingError::InvalidToken(other),
        }
    }
}

impl From<UserError> for BookingError {
    fn from(err: UserError) -> Self {
        BookingError::DatabaseError(err.to_string())
    }
}
