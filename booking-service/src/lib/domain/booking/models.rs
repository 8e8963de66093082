use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::booking::errors::BookingError;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::UserId;

/// Booking unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookingId(pub Uuid);

impl BookingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Booking lifecycle status.
///
/// The guest flows drive `Pending -> Confirmed`, `Pending -> Expired` and
/// guest cancellation; completion belongs to ordinary booking management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Expired => "EXPIRED",
            BookingStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "EXPIRED" => Ok(BookingStatus::Expired),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(BookingError::DatabaseError(format!(
                "unknown booking status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking aggregate, reduced to what guest confirmation needs.
///
/// The booking never references its guest token; the token points at the
/// booking through its owner id.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub customer_id: UserId,
    pub customer_email: EmailAddress,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// New pending booking for a customer.
    pub fn pending(
        customer_id: UserId,
        customer_email: EmailAddress,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookingId::new(),
            customer_id,
            customer_email,
            start_time,
            end_time,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Booking request from someone without an account.
#[derive(Debug, Clone)]
pub struct CreateGuestBookingCommand {
    pub email: EmailAddress,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl CreateGuestBookingCommand {
    pub fn new(email: EmailAddress, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            email,
            start_time,
            end_time,
        }
    }
}
