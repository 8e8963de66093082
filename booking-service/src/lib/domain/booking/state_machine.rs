use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::booking::errors::TransitionError;
use crate::domain::booking::models::BookingStatus;

/// Minimum notice, in hours, for a guest cancellation.
pub const CANCELLATION_NOTICE_HOURS: i64 = 24;

/// Events the guest flows apply to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    /// A guest presented and consumed a valid access token.
    GuestTokenConsumed,
    /// The booking window was observed to have started without confirmation.
    WindowElapsed,
    /// A guest asked to cancel through their access token.
    GuestCancelled,
}

impl fmt::Display for BookingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingEvent::GuestTokenConsumed => f.write_str("guest_token_consumed"),
            BookingEvent::WindowElapsed => f.write_str("window_elapsed"),
            BookingEvent::GuestCancelled => f.write_str("guest_cancelled"),
        }
    }
}

/// Apply `event` to a booking in state `from`.
///
/// | From      | Event              | To        | Guard                 |
/// |-----------|--------------------|-----------|-----------------------|
/// | Pending   | GuestTokenConsumed | Confirmed | `now < start`         |
/// | Pending   | GuestTokenConsumed | Expired   | `now >= start`        |
/// | Pending   | WindowElapsed      | Expired   | `now >= start`        |
/// | Pending   | GuestCancelled     | Cancelled | `now <= start - 24h`  |
/// | Confirmed | GuestCancelled     | Cancelled | `now <= start - 24h`  |
///
/// A cancellation that misses its guard fails with `CancellationClosed`.
/// Everything else is rejected.
pub fn transition(
    from: BookingStatus,
    event: BookingEvent,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<BookingStatus, TransitionError> {
    let started = now >= start_time;

    match (from, event) {
        (BookingStatus::Pending, BookingEvent::GuestTokenConsumed) if started => {
            Ok(BookingStatus::Expired)
        }
        (BookingStatus::Pending, BookingEvent::GuestTokenConsumed) => Ok(BookingStatus::Confirmed),
        (BookingStatus::Pending, BookingEvent::WindowElapsed) if started => {
            Ok(BookingStatus::Expired)
        }
        (BookingStatus::Pending | BookingStatus::Confirmed, BookingEvent::GuestCancelled) => {
            let deadline = start_time - Duration::hours(CANCELLATION_NOTICE_HOURS);
            if now > deadline {
                Err(TransitionError::CancellationClosed { deadline })
            } else {
                Ok(BookingStatus::Cancelled)
            }
        }
        _ => Err(TransitionError::NotAllowed { from, event }),
    }
}

/// Lazily expire a pending booking whose window has started.
///
/// Returns `None` when nothing changes.
pub fn lazy_expiry(
    status: BookingStatus,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<BookingStatus> {
    transition(status, BookingEvent::WindowElapsed, start_time, now).ok()
}
