use thiserror::Error;

/// Error for notification publishing operations
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Failed to serialize notification: {0}")]
    SerializationFailed(String),

    #[error("Failed to publish notification to broker: {0}")]
    PublishFailed(String),

    #[error("Connection to event broker failed: {0}")]
    ConnectionFailed(String),

    #[error("Notification publishing timeout: {0}")]
    Timeout(String),
}
