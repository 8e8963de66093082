use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use chrono::Duration;

use crate::domain::booking::errors::BookingError;
use crate::domain::booking::models::Booking;
use crate::domain::booking::models::BookingId;
use crate::domain::booking::models::BookingStatus;
use crate::domain::booking::models::CreateGuestBookingCommand;
use crate::domain::booking::ports::BookingRepository;
use crate::domain::booking::ports::GuestBookingServicePort;
use crate::domain::booking::state_machine;
use crate::domain::booking::state_machine::BookingEvent;
use crate::domain::notification::events::GuestBookingAccessIssued;
use crate::domain::notification::events::GuestBookingCancelled;
use crate::domain::notification::events::NotificationEvent;
use crate::domain::notification::links::LinkBuilder;
use crate::domain::notification::ports::publish_detached;
use crate::domain::notification::ports::NotificationSink;
use crate::domain::token::models::IssuedToken;
use crate::domain::token::models::OpaqueToken;
use crate::domain::token::models::OwnerId;
use crate::domain::token::models::PeekMode;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::OpaqueTokenRepository;
use crate::domain::token::service::OpaqueTokenStore;
use crate::domain::user::errors::UserError;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::ports::UserRepository;

const PURPOSE: TokenPurpose = TokenPurpose::GuestBookingAccess;

/// Guest booking access: booking creation, token issuance, confirmation,
/// read-only view and cancellation.
///
/// A guest token stays valid until the end of the booking window plus a
/// grace period. Consuming it is what confirms the booking; viewing and
/// cancelling only read it. Every status change is a conditional update on
/// the status the decision was made from.
pub struct GuestAccessService<BR, UR, TR, N>
where
    BR: BookingRepository,
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    N: NotificationSink,
{
    bookings: Arc<BR>,
    users: Arc<UR>,
    tokens: Arc<OpaqueTokenStore<TR>>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
    grace: Duration,
    links: LinkBuilder,
}

impl<BR, UR, TR, N> GuestAccessService<BR, UR, TR, N>
where
    BR: BookingRepository,
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    N: NotificationSink,
{
    pub fn new(
        bookings: Arc<BR>,
        users: Arc<UR>,
        tokens: Arc<OpaqueTokenStore<TR>>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
        grace: Duration,
        links: LinkBuilder,
    ) -> Self {
        Self {
            bookings,
            users,
            tokens,
            notifications,
            clock,
            grace,
            links,
        }
    }

    async fn load(&self, id: &BookingId) -> Result<Booking, BookingError> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(id.to_string()))
    }

    /// Reuse the guest account of `email`, or create one.
    async fn find_or_create_guest(&self, email: &EmailAddress) -> Result<User, BookingError> {
        match self.users.find_by_email(email).await? {
            Some(user) if user.is_guest => return Ok(user),
            Some(_) => return Err(BookingError::EmailAlreadyRegistered),
            None => {}
        }

        let guest = User::guest(email.clone(), self.clock.now())
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        match self.users.create(guest).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Guest account created");
                Ok(user)
            }
            // Another request created an account for this email first.
            Err(UserError::EmailAlreadyExists(_)) => match self.users.find_by_email(email).await? {
                Some(user) if user.is_guest => Ok(user),
                _ => Err(BookingError::EmailAlreadyRegistered),
            },
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<BR, UR, TR, N> GuestBookingServicePort for GuestAccessService<BR, UR, TR, N>
where
    BR: BookingRepository,
    UR: UserRepository,
    TR: OpaqueTokenRepository,
    N: NotificationSink,
{
    async fn create(
        &self,
        command: CreateGuestBookingCommand,
    ) -> Result<(Booking, IssuedToken), BookingError> {
        let now = self.clock.now();
        if command.start_time <= now {
            return Err(BookingError::InvalidWindow(
                "start time must be in the future".to_string(),
            ));
        }
        if command.end_time <= command.start_time {
            return Err(BookingError::InvalidWindow(
                "end time must be after start time".to_string(),
            ));
        }

        let guest = self.find_or_create_guest(&command.email).await?;
        let booking = self
            .bookings
            .insert(Booking::pending(
                guest.id,
                guest.email.clone(),
                command.start_time,
                command.end_time,
                now,
            ))
            .await?;

        tracing::info!(booking_id = %booking.id, customer_id = %guest.id, "Guest booking created");

        let issued = self.issue_for_booking(&booking).await?;
        Ok((booking, issued))
    }

    async fn issue_for_booking(&self, booking: &Booking) -> Result<IssuedToken, BookingError> {
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::NotPending(booking.status));
        }

        let owner = OwnerId::from(booking.id);
        self.tokens.revoke_for_owner(PURPOSE, owner).await?;

        let issued = self
            .tokens
            .create_until(PURPOSE, owner, booking.end_time + self.grace)
            .await?;

        let link = self.links.guest_booking(&issued.value);
        let event =
            NotificationEvent::GuestBookingAccessIssued(GuestBookingAccessIssued::new(booking, &issued, link));
        publish_detached(&self.notifications, event);

        tracing::info!(booking_id = %booking.id, expires_at = %issued.expires_at, "Guest access token issued");

        Ok(issued)
    }

    async fn confirm(&self, token: &str) -> Result<Booking, BookingError> {
        let booking_id = BookingId::from(self.tokens.validate_and_consume(PURPOSE, token).await?);
        let mut booking = self.load(&booking_id).await?;

        if booking.status != BookingStatus::Pending {
            tracing::warn!(booking_id = %booking.id, status = %booking.status, "Guest confirmation for non-pending booking");
            return Err(BookingError::NotPending(booking.status));
        }

        let now = self.clock.now();
        let next = state_machine::transition(
            booking.status,
            BookingEvent::GuestTokenConsumed,
            booking.start_time,
            now,
        )?;

        if !self
            .bookings
            .transition(&booking.id, BookingStatus::Pending, next, now)
            .await?
        {
            let current = self.load(&booking.id).await?;
            tracing::warn!(booking_id = %booking.id, status = %current.status, "Booking left PENDING during guest confirmation");
            return Err(BookingError::NotPending(current.status));
        }

        booking.status = next;
        booking.updated_at = now;

        if booking.status == BookingStatus::Expired {
            tracing::info!(booking_id = %booking.id, "Guest confirmation arrived after start, booking expired");
            return Err(BookingError::AlreadyExpired);
        }

        tracing::info!(booking_id = %booking.id, "Booking confirmed by guest");
        Ok(booking)
    }

    async fn view(&self, token: &str) -> Result<Booking, BookingError> {
        let booking_id = BookingId::from(
            self.tokens
                .peek(PURPOSE, token, PeekMode::AllowConsumed)
                .await?,
        );
        let mut booking = self.load(&booking_id).await?;

        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::Cancelled);
        }

        let now = self.clock.now();
        if let Some(next) = state_machine::lazy_expiry(booking.status, booking.start_time, now) {
            if self
                .bookings
                .transition(&booking.id, booking.status, next, now)
                .await?
            {
                booking.status = next;
                booking.updated_at = now;
                tracing::info!(booking_id = %booking.id, "Pending booking expired on view");
            } else {
                booking = self.load(&booking_id).await?;
                if booking.status == BookingStatus::Cancelled {
                    return Err(BookingError::Cancelled);
                }
            }
        }

        Ok(booking)
    }

    async fn cancel(&self, token: &str) -> Result<Booking, BookingError> {
        let booking_id = BookingId::from(
            self.tokens
                .peek(PURPOSE, token, PeekMode::AllowConsumed)
                .await?,
        );
        let mut booking = self.load(&booking_id).await?;

        if booking.status == BookingStatus::Cancelled {
            tracing::warn!(booking_id = %booking.id, "Guest cancellation of a cancelled booking");
            return Err(BookingError::Cancelled);
        }

        let now = self.clock.now();
        let next = state_machine::transition(
            booking.status,
            BookingEvent::GuestCancelled,
            booking.start_time,
            now,
        )
        .map_err(|e| {
            tracing::warn!(booking_id = %booking.id, error = %e, "Guest cancellation refused");
            e
        })?;

        if !self
            .bookings
            .transition(&booking.id, booking.status, next, now)
            .await?
        {
            let current = self.load(&booking.id).await?;
            tracing::warn!(booking_id = %booking.id, status = %current.status, "Booking changed during guest cancellation");
            return Err(match current.status {
                BookingStatus::Cancelled => BookingError::Cancelled,
                status => BookingError::StatusChanged(status),
            });
        }

        booking.status = next;
        booking.updated_at = now;

        let event = NotificationEvent::GuestBookingCancelled(GuestBookingCancelled::new(&booking));
        publish_detached(&self.notifications, event);

        tracing::info!(booking_id = %booking.id, "Booking cancelled by guest");
        Ok(booking)
    }

    async fn live_token_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<OpaqueToken>, BookingError> {
        Ok(self
            .tokens
            .live_for_owner(PURPOSE, OwnerId::from(*booking_id))
            .await?)
    }
}
