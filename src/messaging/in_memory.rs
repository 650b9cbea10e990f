//! # In-Memory Broker
//!
//! Partitioned, append-only topics with per-group committed offsets, for tests
//! and local development. Mirrors the parts of Kafka the relay relies on:
//!
//! - **Key affinity**: one key always maps to one partition
//! - **Group offsets**: a new consumer resumes after the group's last commit,
//!   and a later commit replaces an earlier one even when it is lower
//! - **Failure injection**: failing publishes and a hard disconnect

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::traits::{EventConsumer, EventPublisher};
use super::types::{BrokerMessage, MessagePosition, PublishReceipt};
use super::MessagingError;

#[derive(Debug, Clone)]
struct StoredRecord {
    key: Option<Vec<u8>>,
    payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct BrokerState {
    /// topic -> partitions -> records (index == offset)
    topics: HashMap<String, Vec<Vec<StoredRecord>>>,
    /// (group, topic, partition) -> next offset to deliver
    committed: HashMap<(String, String, i32), i64>,
    failing_publishes: usize,
    disconnected: bool,
}

/// In-memory broker; also the publisher for its own topics
#[derive(Debug)]
pub struct InMemoryBroker {
    partitions_per_topic: usize,
    state: Mutex<BrokerState>,
    /// Bumped on every append so waiting consumers re-check
    appended: watch::Sender<u64>,
}

impl InMemoryBroker {
    pub fn new(partitions_per_topic: usize) -> Arc<Self> {
        let (appended, _) = watch::channel(0);
        Arc::new(Self {
            partitions_per_topic: partitions_per_topic.max(1),
            state: Mutex::new(BrokerState::default()),
            appended,
        })
    }

    /// A group member reading `topic`, resuming from the group's commits
    pub fn consumer(self: &Arc<Self>, group_id: &str, topic: &str) -> InMemoryConsumer {
        let positions = {
            let mut state = self.state.lock();
            self.ensure_topic(&mut state, topic);
            (0..self.partitions_per_topic as i32)
                .map(|partition| {
                    state
                        .committed
                        .get(&(group_id.to_string(), topic.to_string(), partition))
                        .copied()
                        .unwrap_or(0)
                })
                .collect()
        };

        InMemoryConsumer {
            broker: Arc::clone(self),
            group_id: group_id.to_string(),
            topic: topic.to_string(),
            cursor: Mutex::new(ConsumerCursor {
                positions,
                next_partition: 0,
            }),
        }
    }

    pub fn partition_for(&self, key: &[u8]) -> i32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions_per_topic as u64) as i32
    }

    /// Append bytes without going through [`EventPublisher`] (e.g. corrupt payloads)
    pub fn produce_raw(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> PublishReceipt {
        let partition = key.map(|k| self.partition_for(k)).unwrap_or(0);
        let receipt = {
            let mut state = self.state.lock();
            let records = &mut self.ensure_topic(&mut state, topic)[partition as usize];
            records.push(StoredRecord {
                key: key.map(<[u8]>::to_vec),
                payload: payload.to_vec(),
            });
            PublishReceipt {
                partition,
                offset: records.len() as i64 - 1,
            }
        };
        self.appended.send_modify(|count| *count += 1);
        receipt
    }

    /// All messages on a topic, ordered by partition then offset
    pub fn messages(&self, topic: &str) -> Vec<BrokerMessage> {
        let state = self.state.lock();
        let Some(partitions) = state.topics.get(topic) else {
            return Vec::new();
        };
        partitions
            .iter()
            .enumerate()
            .flat_map(|(partition, records)| {
                records.iter().enumerate().map(move |(offset, record)| {
                    BrokerMessage::new(
                        MessagePosition {
                            topic: topic.to_string(),
                            partition: partition as i32,
                            offset: offset as i64,
                        },
                        record.key.clone(),
                        Some(record.payload.clone()),
                    )
                })
            })
            .collect()
    }

    /// Next offset the group will read on `partition`, if it ever committed
    pub fn committed_offset(&self, group_id: &str, topic: &str, partition: i32) -> Option<i64> {
        self.state
            .lock()
            .committed
            .get(&(group_id.to_string(), topic.to_string(), partition))
            .copied()
    }

    /// Make the next `count` publishes fail
    pub fn fail_next_publishes(&self, count: usize) {
        self.state.lock().failing_publishes = count;
    }

    /// Simulate losing the broker: every subsequent call fails
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
        self.appended.send_modify(|count| *count += 1);
    }

    fn ensure_topic<'a>(
        &self,
        state: &'a mut BrokerState,
        topic: &str,
    ) -> &'a mut Vec<Vec<StoredRecord>> {
        state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); self.partitions_per_topic])
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<PublishReceipt, MessagingError> {
        {
            let mut state = self.state.lock();
            if state.disconnected {
                return Err(MessagingError::transport("in-memory broker disconnected"));
            }
            if state.failing_publishes > 0 {
                state.failing_publishes -= 1;
                return Err(MessagingError::publish(topic, "injected publish failure"));
            }
        }
        Ok(self.produce_raw(topic, Some(key.as_bytes()), payload))
    }

    async fn health_check(&self) -> Result<(), MessagingError> {
        if self.state.lock().disconnected {
            return Err(MessagingError::transport("in-memory broker disconnected"));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[derive(Debug)]
struct ConsumerCursor {
    /// Next offset to read per partition
    positions: Vec<i64>,
    /// Round-robin start so one busy partition cannot starve the others
    next_partition: usize,
}

/// A single consumer-group member over one topic
#[derive(Debug)]
pub struct InMemoryConsumer {
    broker: Arc<InMemoryBroker>,
    group_id: String,
    topic: String,
    cursor: Mutex<ConsumerCursor>,
}

impl InMemoryConsumer {
    fn poll(&self) -> Result<Option<BrokerMessage>, MessagingError> {
        let state = self.broker.state.lock();
        if state.disconnected {
            return Err(MessagingError::transport("in-memory broker disconnected"));
        }
        let Some(partitions) = state.topics.get(&self.topic) else {
            return Ok(None);
        };

        let mut cursor = self.cursor.lock();
        let count = partitions.len();
        for step in 0..count {
            let partition = (cursor.next_partition + step) % count;
            let offset = cursor.positions[partition];
            if let Some(record) = partitions[partition].get(offset as usize) {
                cursor.positions[partition] += 1;
                cursor.next_partition = (partition + 1) % count;
                return Ok(Some(BrokerMessage::new(
                    MessagePosition {
                        topic: self.topic.clone(),
                        partition: partition as i32,
                        offset,
                    },
                    record.key.clone(),
                    Some(record.payload.clone()),
                )));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl EventConsumer for InMemoryConsumer {
    async fn recv(&self) -> Result<BrokerMessage, MessagingError> {
        let mut appended = self.broker.appended.subscribe();
        loop {
            appended.borrow_and_update();
            if let Some(message) = self.poll()? {
                return Ok(message);
            }
            appended
                .changed()
                .await
                .map_err(|_| MessagingError::transport("in-memory broker dropped"))?;
        }
    }

    async fn commit(&self, position: &MessagePosition) -> Result<(), MessagingError> {
        let mut state = self.broker.state.lock();
        if state.disconnected {
            return Err(MessagingError::Commit {
                topic: position.topic.clone(),
                partition: position.partition,
                offset: position.offset,
                message: "in-memory broker disconnected".to_string(),
            });
        }
        // last write wins, as with Kafka offset commits
        state.committed.insert(
            (
                self.group_id.clone(),
                position.topic.clone(),
                position.partition,
            ),
            position.offset + 1,
        );
        Ok(())
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_same_partition_in_order() {
        let broker = InMemoryBroker::new(4);
        let first = broker.publish("events", "u1", b"one").await.unwrap();
        let second = broker.publish("events", "u1", b"two").await.unwrap();

        assert_eq!(first.partition, second.partition);
        assert_eq!(second.offset, first.offset + 1);
    }

    #[tokio::test]
    async fn test_consumer_waits_for_publish() {
        let broker = InMemoryBroker::new(2);
        let consumer = broker.consumer("group", "events");

        let publisher = Arc::clone(&broker);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish("events", "u1", b"late").await.unwrap();
        });

        let message = tokio::time::timeout(Duration::from_secs(2), consumer.recv())
            .await
            .expect("message should arrive")
            .unwrap();
        assert_eq!(message.payload_bytes(), b"late");
        assert_eq!(message.key_str().as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_new_member_resumes_after_commit() {
        let broker = InMemoryBroker::new(1);
        for payload in [b"a", b"b", b"c"] {
            broker.publish("events", "k", payload).await.unwrap();
        }

        let consumer = broker.consumer("group", "events");
        let first = consumer.recv().await.unwrap();
        consumer.commit(&first.position).await.unwrap();
        drop(consumer);

        let resumed = broker.consumer("group", "events");
        let next = resumed.recv().await.unwrap();
        assert_eq!(next.payload_bytes(), b"b");
        assert_eq!(broker.committed_offset("group", "events", 0), Some(1));
    }

    #[tokio::test]
    async fn test_commit_is_last_write_wins() {
        let broker = InMemoryBroker::new(1);
        let consumer = broker.consumer("group", "events");
        let position = |offset| MessagePosition {
            topic: "events".into(),
            partition: 0,
            offset,
        };
        consumer.commit(&position(5)).await.unwrap();
        consumer.commit(&position(2)).await.unwrap();
        assert_eq!(broker.committed_offset("group", "events", 0), Some(3));
    }

    #[tokio::test]
    async fn test_injected_publish_failures() {
        let broker = InMemoryBroker::new(1);
        broker.fail_next_publishes(1);
        assert!(broker.publish("events", "k", b"x").await.is_err());
        assert!(broker.publish("events", "k", b"x").await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_wakes_blocked_consumer_with_error() {
        let broker = InMemoryBroker::new(1);
        let consumer = broker.consumer("group", "events");

        let handle = tokio::spawn(async move { consumer.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.disconnect();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(MessagingError::Transport { .. })));
    }
}
