use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::booking::errors::BookingError;
use crate::domain::booking::models::Booking;
use crate::domain::booking::models::BookingId;
use crate::domain::booking::models::BookingStatus;
use crate::domain::booking::models::CreateGuestBookingCommand;
use crate::domain::token::models::IssuedToken;
use crate::domain::token::models::OpaqueToken;

/// Port for guest booking access exposed to inbound adapters.
#[async_trait]
pub trait GuestBookingServicePort: Send + Sync + 'static {
    /// Book without an account: find or create the guest user, store a pending
    /// booking and mail its access link.
    ///
    /// # Returns
    /// The pending booking and the issued token (whose value only travels by mail)
    ///
    /// # Errors
    /// * `InvalidWindow` - Start not in the future or end not after start
    /// * `EmailAlreadyRegistered` - Email belongs to a registered account
    async fn create(
        &self,
        command: CreateGuestBookingCommand,
    ) -> Result<(Booking, IssuedToken), BookingError>;

    /// Issue a guest access token for a freshly created pending booking and
    /// notify the guest. Any earlier guest token for the booking is revoked.
    ///
    /// # Errors
    /// * `NotPending` - Booking is not pending
    async fn issue_for_booking(&self, booking: &Booking) -> Result<IssuedToken, BookingError>;

    /// Consume a guest token and confirm its booking.
    ///
    /// # Errors
    /// * `InvalidToken` - Token malformed, unknown, expired, consumed or for another workflow
    /// * `NotFound` - Booking no longer exists
    /// * `NotPending` - Booking is not pending, including when it changed under us
    /// * `AlreadyExpired` - Booking window started before confirmation; booking is now expired
    async fn confirm(&self, token: &str) -> Result<Booking, BookingError>;

    /// Show the booking behind a guest token without consuming it. A token
    /// already spent on confirmation keeps working until it expires.
    ///
    /// # Errors
    /// * `InvalidToken` - Token malformed, unknown, expired or for another workflow
    /// * `NotFound` - Booking no longer exists
    /// * `Cancelled` - Booking was cancelled
    async fn view(&self, token: &str) -> Result<Booking, BookingError>;

    /// Cancel the booking behind a guest token, confirmed or not, and notify
    /// the guest. The token is not consumed.
    ///
    /// # Errors
    /// * `InvalidToken` - Token malformed, unknown, expired or for another workflow
    /// * `Cancelled` - Booking was already cancelled
    /// * `Transition` - Less than 24 hours before start, or booking expired or completed
    /// * `StatusChanged` - Booking changed concurrently
    async fn cancel(&self, token: &str) -> Result<Booking, BookingError>;

    /// The live (unconsumed, unexpired) guest token of a booking, if any.
    async fn live_token_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<OpaqueToken>, BookingError>;
}

/// Persistence operations for bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync + 'static {
    /// Retrieve booking by identifier.
    ///
    /// # Returns
    /// Optional booking (None if not found)
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, BookingError>;

    /// Persist a new booking.
    async fn insert(&self, booking: Booking) -> Result<Booking, BookingError>;

    /// Move a booking from `from` to `to`, only if it is still in `from`.
    ///
    /// # Returns
    /// `true` if the status changed, `false` if the booking was no longer in `from`
    /// (or does not exist)
    async fn transition(
        &self,
        id: &BookingId,
        from: BookingStatus,
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BookingError>;
}
