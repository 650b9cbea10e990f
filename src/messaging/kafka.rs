//! # Kafka Provider
//!
//! `FutureProducer` for publishing and a `StreamConsumer` with auto-commit
//! disabled for the relay. Offsets are committed explicitly through
//! [`EventConsumer::commit`] once the event is durable downstream.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, info};

use super::traits::{EventConsumer, EventPublisher};
use super::types::{BrokerMessage, MessagePosition, PublishReceipt};
use super::MessagingError;
use crate::config::BrokerConfig;

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

impl From<KafkaError> for MessagingError {
    fn from(error: KafkaError) -> Self {
        Self::transport(error.to_string())
    }
}

pub struct KafkaEventPublisher {
    producer: FutureProducer,
    publish_timeout: Duration,
}

impl std::fmt::Debug for KafkaEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaEventPublisher")
            .field("publish_timeout", &self.publish_timeout)
            .finish()
    }
}

impl KafkaEventPublisher {
    pub fn new(config: &BrokerConfig) -> Result<Self, MessagingError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("client.id", &config.client_id)
            .set(
                "message.timeout.ms",
                config.publish_timeout_ms.to_string(),
            )
            .create()
            .map_err(|e| MessagingError::configuration("kafka_producer", e.to_string()))?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            publish_timeout: config.publish_timeout(),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<PublishReceipt, MessagingError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(self.publish_timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(topic, partition, offset, "Published message");
                Ok(PublishReceipt { partition, offset })
            }
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut), _)) => {
                Err(MessagingError::Timeout {
                    topic: topic.to_string(),
                    timeout_ms: self.publish_timeout.as_millis() as u64,
                })
            }
            Err((error, _)) => Err(MessagingError::publish(topic, error.to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), MessagingError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(None, Timeout::After(METADATA_TIMEOUT))
                .map(|_| ())
        })
        .await
        .map_err(|e| MessagingError::transport(format!("metadata task failed: {e}")))?
        .map_err(MessagingError::from)
    }

    fn provider_name(&self) -> &'static str {
        "kafka"
    }
}

pub struct KafkaEventConsumer {
    consumer: StreamConsumer,
    group_id: String,
}

impl std::fmt::Debug for KafkaEventConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaEventConsumer")
            .field("group_id", &self.group_id)
            .finish()
    }
}

impl KafkaEventConsumer {
    pub fn new(config: &BrokerConfig) -> Result<Self, MessagingError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.group_id)
            .set("client.id", &config.client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set(
                "session.timeout.ms",
                config.session_timeout_ms.to_string(),
            )
            .create()
            .map_err(|e| MessagingError::configuration("kafka_consumer", e.to_string()))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| MessagingError::configuration("kafka_consumer", e.to_string()))?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            topic = %config.topic,
            group_id = %config.group_id,
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer,
            group_id: config.group_id.clone(),
        })
    }
}

#[async_trait]
impl EventConsumer for KafkaEventConsumer {
    async fn recv(&self) -> Result<BrokerMessage, MessagingError> {
        let message = self.consumer.recv().await?;
        Ok(BrokerMessage::new(
            MessagePosition {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
            },
            message.key().map(<[u8]>::to_vec),
            message.payload().map(<[u8]>::to_vec),
        ))
    }

    async fn commit(&self, position: &MessagePosition) -> Result<(), MessagingError> {
        let commit_error = |e: KafkaError| MessagingError::Commit {
            topic: position.topic.clone(),
            partition: position.partition,
            offset: position.offset,
            message: e.to_string(),
        };

        // Kafka stores the next offset to read, not the last one processed
        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(
                &position.topic,
                position.partition,
                Offset::Offset(position.offset + 1),
            )
            .map_err(commit_error)?;

        self.consumer
            .commit(&assignment, CommitMode::Async)
            .map_err(commit_error)
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }

    fn provider_name(&self) -> &'static str {
        "kafka"
    }
}
