use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::notification::errors::NotificationError;
use crate::domain::notification::events::NotificationEvent;

/// Outbound channel for user-facing notifications (mail delivery happens downstream).
///
/// Callers treat publishing as fire-and-forget: a failure is logged, never
/// propagated to the workflow that produced the event.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Publish a notification event.
    ///
    /// # Errors
    /// * `SerializationFailed` - Event serialization failed
    /// * `PublishFailed` - Failed to publish to broker
    /// * `ConnectionFailed` - Broker connection failed
    /// * `Timeout` - Publishing timed out
    async fn publish(&self, event: &NotificationEvent) -> Result<(), NotificationError>;
}

/// Publish on a background task and log on failure.
///
/// The caller never waits on the broker, so a slow or unreachable sink adds no
/// latency to the request that produced the event.
pub fn publish_detached<N: NotificationSink>(sink: &Arc<N>, event: NotificationEvent) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.publish(&event).await {
            tracing::error!(
                event_type = event.event_type(),
                subject_id = event.subject_id(),
                error = %e,
                "Failed to publish notification"
            );
        }
    });
}

/// Yield until the publishes detached so far have run on a current-thread runtime.
#[cfg(test)]
pub(crate) async fn drain_detached() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
