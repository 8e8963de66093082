use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use rdkafka::producer::FutureRecord;
use rdkafka::util::Timeout;

use crate::config::Config;
use crate::domain::notification::errors::NotificationError;
use crate::domain::notification::events::NotificationEvent;
use crate::domain::notification::ports::NotificationSink;
use crate::outbound::events::messages::NotificationMessage;

pub struct KafkaNotificationProducer {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaNotificationProducer {
    /// Create a Kafka producer for notification events with "at least once" delivery.
    ///
    /// # Notes:
    /// - `acks=all`: Wait for all in-sync replicas to acknowledge
    /// - `enable.idempotence=true`: Prevents duplicate messages during retries
    /// - `max.in.flight.requests.per.connection=5`: Allows pipelining with ordering guarantees
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        tracing::info!(
            brokers = %config.kafka.brokers,
            topic = %config.kafka.topic,
            "Initializing Kafka producer for notifications"
        );

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka.brokers)
            .set("message.timeout.ms", "30000")
            .set("queue.buffering.max.messages", "10000")
            .set("compression.type", "gzip")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("retries", "10")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retry.backoff.ms", "100")
            .create()?;

        Ok(Self {
            producer,
            topic: config.kafka.topic.to_string(),
            timeout: Duration::from_secs(30),
        })
    }
}

#[async_trait]
impl NotificationSink for KafkaNotificationProducer {
    /// Publish keyed by the user or booking id so events for one subject stay ordered.
    async fn publish(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        let message = NotificationMessage::from(event);
        let payload = serde_json::to_string(&message)
            .map_err(|e| NotificationError::SerializationFailed(e.to_string()))?;

        let record = FutureRecord::to(&self.topic)
            .key(event.subject_id())
            .payload(&payload);

        self.producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map(|_| {
                tracing::debug!(
                    topic = %self.topic,
                    event_type = event.event_type(),
                    subject_id = event.subject_id(),
                    "Notification published"
                );
            })
            .map_err(|(err, _)| NotificationError::PublishFailed(err.to_string()))
    }
}
