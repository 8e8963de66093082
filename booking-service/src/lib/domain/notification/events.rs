use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::booking::models::Booking;
use crate::domain::token::models::IssuedToken;
use crate::domain::user::models::User;

/// Envelope for every outbound notification.
///
/// Each variant carries the recipient and, where the mail links back into a
/// token workflow, the plaintext token; downstream delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    PasswordResetRequested(PasswordResetRequested),
    EmailVerificationRequested(EmailVerificationRequested),
    GuestBookingAccessIssued(GuestBookingAccessIssued),
    GuestBookingCancelled(GuestBookingCancelled),
}

impl NotificationEvent {
    pub fn event_id(&self) -> &str {
        match self {
            NotificationEvent::PasswordResetRequested(e) => &e.event_id,
            NotificationEvent::EmailVerificationRequested(e) => &e.event_id,
            NotificationEvent::GuestBookingAccessIssued(e) => &e.event_id,
            NotificationEvent::GuestBookingCancelled(e) => &e.event_id,
        }
    }

    /// Get the event type name.
    ///
    /// # Returns
    /// "password_reset_requested", "email_verification_requested",
    /// "guest_booking_access_issued" or "guest_booking_cancelled"
    pub fn event_type(&self) -> &str {
        match self {
            NotificationEvent::PasswordResetRequested(_) => "password_reset_requested",
            NotificationEvent::EmailVerificationRequested(_) => "email_verification_requested",
            NotificationEvent::GuestBookingAccessIssued(_) => "guest_booking_access_issued",
            NotificationEvent::GuestBookingCancelled(_) => "guest_booking_cancelled",
        }
    }

    /// Partition key: the user or booking the notification concerns.
    pub fn subject_id(&self) -> &str {
        match self {
            NotificationEvent::PasswordResetRequested(e) => &e.user_id,
            NotificationEvent::EmailVerificationRequested(e) => &e.user_id,
            NotificationEvent::GuestBookingAccessIssued(e) => &e.booking_id,
            NotificationEvent::GuestBookingCancelled(e) => &e.booking_id,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            NotificationEvent::PasswordResetRequested(e) => &e.email,
            NotificationEvent::EmailVerificationRequested(e) => &e.email,
            NotificationEvent::GuestBookingAccessIssued(e) => &e.email,
            NotificationEvent::GuestBookingCancelled(e) => &e.email,
        }
    }

    /// Plaintext token delivered to the recipient, if the mail carries one.
    pub fn token(&self) -> Option<&str> {
        match self {
            NotificationEvent::PasswordResetRequested(e) => Some(&e.token),
            NotificationEvent::EmailVerificationRequested(e) => Some(&e.token),
            NotificationEvent::GuestBookingAccessIssued(e) => Some(&e.token),
            NotificationEvent::GuestBookingCancelled(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordResetRequested {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

impl PasswordResetRequested {
    pub fn new(user: &User, issued: &IssuedToken, link: String) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            token: issued.value.clone(),
            link,
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailVerificationRequested {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

impl EmailVerificationRequested {
    pub fn new(user: &User, issued: &IssuedToken, link: String) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            token: issued.value.clone(),
            link,
            expires_at: issued.expires_at,
        }
    }
}

/// Sent to the guest who made a booking without an account.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestBookingAccessIssued {
    pub event_id: String,
    pub booking_id: String,
    pub email: String,
    pub start_time: DateTime<Utc>,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

impl GuestBookingAccessIssued {
    pub fn new(booking: &Booking, issued: &IssuedToken, link: String) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            booking_id: booking.id.to_string(),
            email: booking.customer_email.as_str().to_string(),
            start_time: booking.start_time,
            token: issued.value.clone(),
            link,
            expires_at: issued.expires_at,
        }
    }
}

/// Sent once a guest cancels through their access link.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestBookingCancelled {
    pub event_id: String,
    pub booking_id: String,
    pub email: String,
    pub start_time: DateTime<Utc>,
    pub cancelled_at: DateTime<Utc>,
}

impl GuestBookingCancelled {
    pub fn new(booking: &Booking) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            booking_id: booking.id.to_string(),
            email: booking.customer_email.as_str().to_string(),
            start_time: booking.start_time,
            cancelled_at: booking.updated_at,
        }
    }
}
