use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::notification::events::EmailVerificationRequested;
use crate::domain::notification::events::GuestBookingAccessIssued;
use crate::domain::notification::events::GuestBookingCancelled;
use crate::domain::notification::events::NotificationEvent;
use crate::domain::notification::events::PasswordResetRequested;

/// Serializable envelope for all notification events.
///
/// Infrastructure representation consumed by the mail delivery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum NotificationMessage {
    PasswordResetRequested(AccountMailMessage),
    EmailVerificationRequested(AccountMailMessage),
    GuestBookingAccessIssued(GuestBookingMailMessage),
    GuestBookingCancelled(GuestCancellationMailMessage),
}

/// Mail addressed to a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMailMessage {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&PasswordResetRequested> for AccountMailMessage {
    fn from(event: &PasswordResetRequested) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            username: event.username.clone(),
            email: event.email.clone(),
            token: event.token.clone(),
            link: event.link.clone(),
            expires_at: event.expires_at,
        }
    }
}

impl From<&EmailVerificationRequested> for AccountMailMessage {
    fn from(event: &EmailVerificationRequested) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            username: event.username.clone(),
            email: event.email.clone(),
            token: event.token.clone(),
            link: event.link.clone(),
            expires_at: event.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestBookingMailMessage {
    pub event_id: String,
    pub booking_id: String,
    pub email: String,
    pub start_time: DateTime<Utc>,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&GuestBookingAccessIssued> for GuestBookingMailMessage {
    fn from(event: &GuestBookingAccessIssued) -> Self {
        Self {
            event_id: event.event_id.clone(),
            booking_id: event.booking_id.clone(),
            email: event.email.clone(),
            start_time: event.start_time,
            token: event.token.clone(),
            link: event.link.clone(),
            expires_at: event.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestCancellationMailMessage {
    pub event_id: String,
    pub booking_id: String,
    pub email: String,
    pub start_time: DateTime<Utc>,
    pub cancelled_at: DateTime<Utc>,
}

impl From<&GuestBookingCancelled> for GuestCancellationMailMessage {
    fn from(event: &GuestBookingCancelled) -> Self {
        Self {
            event_id: event.event_id.clone(),
            booking_id: event.booking_id.clone(),
            email: event.email.clone(),
            start_time: event.start_time,
            cancelled_at: event.cancelled_at,
        }
    }
}

impl From<&NotificationEvent> for NotificationMessage {
    fn from(event: &NotificationEvent) -> Self {
        match event {
            NotificationEvent::PasswordResetRequested(e) => {
                NotificationMessage::PasswordResetRequested(e.into())
            }
            NotificationEvent::EmailVerificationRequested(e) => {
                NotificationMessage::EmailVerificationRequested(e.into())
            }
            NotificationEvent::GuestBookingAccessIssued(e) => {
                NotificationMessage::GuestBookingAccessIssued(e.into())
            }
            NotificationEvent::GuestBookingCancelled(e) => {
                NotificationMessage::GuestBookingCancelled(e.into())
            }
        }
    }
}
