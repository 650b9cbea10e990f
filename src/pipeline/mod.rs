//! # Relay Pipeline
//!
//! Broker → reader → bounded queue → worker pool → storage, with dead-lettering
//! for what cannot be stored and commits only behind handled messages.
//!
//! Shutdown order is fixed: stop reading, close the queue, let workers finish
//! everything already queued, then report `Stopped`. The drain starts on
//! termination, on a broker failure, or when a message can be neither stored
//! nor dead-lettered.

pub mod dead_letter;
pub mod offsets;
pub mod processor;
pub mod reader;
pub mod retry;
pub mod shutdown;
pub mod worker_pool;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::RelayConfig;
use crate::messaging::{EventConsumer, EventPublisher, MessagingError};
use crate::storage::EventSink;

pub use dead_letter::{
    DeadLetterDisposition, DeadLetterPayload, DeadLetterQueue, DeadLetterReason, DeadLetterRecord,
};
pub use offsets::OffsetTracker;
pub use processor::{EventProcessor, MessageHandler, ProcessOutcome};
pub use reader::{ConsumerGroupReader, ReaderStats};
pub use retry::{with_retry, IsRetryable, RetryError, RetryPolicy};
pub use shutdown::{wait_for_termination, PipelineState, ShutdownCoordinator, ShutdownSignal};
pub use worker_pool::{JobQueue, PoolReport, QueueClosed, WorkerPool, WorkerStats};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The broker connection failed; the relay must be restarted
    #[error("Broker transport failure: {0}")]
    Transport(#[from] MessagingError),

    #[error("Job queue closed while the reader was running")]
    QueueClosed,

    #[error("Reader task failed: {0}")]
    ReaderPanicked(String),

    /// Dead-letter publishing failed; the stranded messages stay uncommitted
    #[error("Dead-letter topic unavailable: {stranded} message(s) left for redelivery")]
    DeadLetterUnavailable { stranded: u64 },
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub reader: ReaderStats,
    pub pool: PoolReport,
    /// Positions read but never handled; the broker redelivers them
    pub uncommitted: usize,
}

pub struct RelayPipeline {
    consumer: Arc<dyn EventConsumer>,
    sink: Arc<dyn EventSink>,
    dead_letters: DeadLetterQueue,
    retry: RetryPolicy,
    worker_count: usize,
    queue_capacity: usize,
    coordinator: Arc<ShutdownCoordinator>,
}

impl std::fmt::Debug for RelayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayPipeline")
            .field("consumer", &self.consumer.provider_name())
            .field("sink", &self.sink.provider_name())
            .field("dead_letters", &self.dead_letters)
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("state", &self.coordinator.state())
            .finish()
    }
}

impl RelayPipeline {
    pub fn new(
        consumer: Arc<dyn EventConsumer>,
        sink: Arc<dyn EventSink>,
        dead_letter_publisher: Arc<dyn EventPublisher>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            consumer,
            sink,
            dead_letters: DeadLetterQueue::new(dead_letter_publisher, &config.dead_letter),
            retry: RetryPolicy::from_config(&config.retry),
            worker_count: config.pipeline.worker_count,
            queue_capacity: config.pipeline.queue_capacity,
            coordinator: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Handle for starting the drain from outside [`run`](Self::run)
    pub fn shutdown_handle(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn state(&self) -> watch::Receiver<PipelineState> {
        self.coordinator.subscribe()
    }

    /// Run until `termination` resolves or the reader fails, then drain.
    ///
    /// Returns the reader's error after the drain when it ended the run.
    pub async fn run<F>(self, termination: F) -> Result<PipelineReport, PipelineError>
    where
        F: Future<Output = ()>,
    {
        let offsets = Arc::new(OffsetTracker::new());
        let processor = Arc::new(EventProcessor::new(
            Arc::clone(&self.sink),
            Arc::clone(&self.consumer),
            self.dead_letters.clone(),
            Arc::clone(&offsets),
            self.retry.clone(),
            Arc::clone(&self.coordinator),
        ));

        let (pool, queue) = WorkerPool::start(self.worker_count, self.queue_capacity, processor);
        let reader = ConsumerGroupReader::new(Arc::clone(&self.consumer), Arc::clone(&offsets));
        let mut reader_task = tokio::spawn(reader.run(queue, self.coordinator.signal()));

        info!(
            group_id = %self.consumer.group_id(),
            worker_count = pool.worker_count(),
            queue_capacity = self.queue_capacity,
            dead_letter_topic = %self.dead_letters.topic(),
            "Relay pipeline running"
        );

        tokio::pin!(termination);
        let joined = tokio::select! {
            _ = &mut termination => {
                info!("Termination requested");
                self.coordinator.begin_drain();
                (&mut reader_task).await
            }
            joined = &mut reader_task => {
                self.coordinator.begin_drain();
                joined
            }
        };

        let reader_result =
            joined.unwrap_or_else(|e| Err(PipelineError::ReaderPanicked(e.to_string())));
        let pool_report = pool.wait_for_drain().await;
        self.coordinator.mark_stopped();

        let reader_stats = reader_result.inspect_err(|e| {
            error!(error = %e, "Relay pipeline stopped after reader failure");
        })?;

        let stranded = pool_report.total().stranded;
        if stranded > 0 {
            error!(
                stranded,
                uncommitted = offsets.pending_count(),
                "Relay pipeline stopped after dead-letter failure"
            );
            return Err(PipelineError::DeadLetterUnavailable { stranded });
        }

        Ok(PipelineReport {
            reader: reader_stats,
            pool: pool_report,
            uncommitted: offsets.pending_count(),
        })
    }
}
