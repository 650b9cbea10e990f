//! # Messaging Service Traits
//!
//! The gateway and the dead-letter path publish through [`EventPublisher`];
//! the relay's reader and workers consume and commit through [`EventConsumer`].
//! Both are object safe so providers are injected as `Arc<dyn ...>`.

use async_trait::async_trait;

use super::types::{BrokerMessage, MessagePosition, PublishReceipt};
use super::MessagingError;

#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    /// Publish `payload` to `topic`; `key` selects the partition so one
    /// key's messages keep their relative order.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<PublishReceipt, MessagingError>;

    async fn health_check(&self) -> Result<(), MessagingError>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
pub trait EventConsumer: Send + Sync + 'static {
    /// Wait for the next message assigned to this group member.
    ///
    /// Errors are transport failures and end the read loop.
    async fn recv(&self) -> Result<BrokerMessage, MessagingError>;

    /// Commit the group's read position so that `position` and everything
    /// before it on that partition is never delivered to the group again.
    ///
    /// A commit replaces the previous one for that partition, so callers must
    /// issue commits in offset order.
    async fn commit(&self, position: &MessagePosition) -> Result<(), MessagingError>;

    fn group_id(&self) -> &str;

    fn provider_name(&self) -> &'static str;
}
