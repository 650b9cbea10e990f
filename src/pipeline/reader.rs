//! # Consumer Group Reader
//!
//! The single read loop: receive from the broker, register the position with
//! the offset tracker, push onto the job queue. A full queue blocks the loop,
//! which is the pipeline's only backpressure.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::offsets::OffsetTracker;
use super::shutdown::ShutdownSignal;
use super::worker_pool::JobQueue;
use super::PipelineError;
use crate::messaging::EventConsumer;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Messages handed to the worker pool
    pub enqueued: u64,
    /// Received but dropped because shutdown began while the queue was full
    pub abandoned: u64,
}

pub struct ConsumerGroupReader {
    consumer: Arc<dyn EventConsumer>,
    offsets: Arc<OffsetTracker>,
}

impl std::fmt::Debug for ConsumerGroupReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerGroupReader")
            .field("consumer", &self.consumer.provider_name())
            .field("group_id", &self.consumer.group_id())
            .finish()
    }
}

impl ConsumerGroupReader {
    pub fn new(consumer: Arc<dyn EventConsumer>, offsets: Arc<OffsetTracker>) -> Self {
        Self { consumer, offsets }
    }

    /// Read until cancelled or the broker fails. The queue is dropped on
    /// return, which closes it for the workers.
    pub async fn run(
        self,
        queue: JobQueue,
        mut shutdown: ShutdownSignal,
    ) -> Result<ReaderStats, PipelineError> {
        let mut stats = ReaderStats::default();
        info!(
            group_id = %self.consumer.group_id(),
            provider = self.consumer.provider_name(),
            "Consumer group reader started"
        );

        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.consumer.recv() => match received {
                    Ok(message) => message,
                    Err(e) => {
                        error!(error = %e, enqueued = stats.enqueued, "Broker receive failed");
                        return Err(PipelineError::Transport(e));
                    }
                },
            };

            let position = message.position.clone();
            self.offsets.track(&position);

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    // tracked but never completed: stays uncommitted
                    stats.abandoned += 1;
                    info!(%position, "Shutdown while queue full; message left for redelivery");
                    break;
                }
                pushed = queue.push(message) => {
                    if pushed.is_err() {
                        return Err(PipelineError::QueueClosed);
                    }
                    stats.enqueued += 1;
                    debug!(%position, "Message enqueued");
                }
            }
        }

        info!(
            enqueued = stats.enqueued,
            abandoned = stats.abandoned,
            "Consumer group reader stopped"
        );
        Ok(stats)
    }
}
