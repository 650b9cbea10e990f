//! # Worker Pool
//!
//! A fixed set of workers draining one bounded queue. The queue's single sender
//! ([`JobQueue`]) belongs to the reader; dropping it closes the queue, and each
//! worker exits after the remaining jobs are gone.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::processor::{MessageHandler, ProcessOutcome};
use crate::messaging::BrokerMessage;

/// Producer side of the job queue; `push` waits while the queue is full
#[derive(Debug)]
pub struct JobQueue {
    sender: mpsc::Sender<BrokerMessage>,
}

/// Returned by [`JobQueue::push`] when no worker remains to receive
#[derive(Debug)]
pub struct QueueClosed(pub BrokerMessage);

impl JobQueue {
    pub async fn push(&self, message: BrokerMessage) -> Result<(), QueueClosed> {
        self.sender
            .send(message)
            .await
            .map_err(|mpsc::error::SendError(message)| QueueClosed(message))
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

/// Counters for one worker over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub processed: u64,
    pub persisted: u64,
    pub dead_lettered: u64,
    pub discarded: u64,
    pub stranded: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: &ProcessOutcome) {
        self.processed += 1;
        match outcome {
            ProcessOutcome::Persisted(_) => self.persisted += 1,
            ProcessOutcome::DeadLettered(_) => self.dead_lettered += 1,
            ProcessOutcome::Discarded(_) => self.discarded += 1,
            ProcessOutcome::Stranded(_) => self.stranded += 1,
        }
    }
}

/// Completion report once every worker has returned
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    pub workers: Vec<WorkerStats>,
    /// Workers whose task panicked; their counters are lost
    pub panicked: usize,
}

impl PoolReport {
    pub fn total(&self) -> WorkerStats {
        self.workers.iter().fold(WorkerStats::default(), |mut acc, w| {
            acc.processed += w.processed;
            acc.persisted += w.persisted;
            acc.dead_lettered += w.dead_lettered;
            acc.discarded += w.discarded;
            acc.stranded += w.stranded;
            acc
        })
    }
}

#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers behind a queue of `queue_capacity`
    pub fn start(
        worker_count: usize,
        queue_capacity: usize,
        handler: Arc<dyn MessageHandler>,
    ) -> (Self, JobQueue) {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..worker_count.max(1))
            .map(|worker_id| spawn_worker(worker_id, Arc::clone(&receiver), Arc::clone(&handler)))
            .collect::<Vec<_>>();

        info!(
            worker_count = handles.len(),
            queue_capacity, "Worker pool started"
        );

        (Self { handles }, JobQueue { sender })
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to finish. Only returns after the [`JobQueue`] is
    /// dropped and all queued jobs are processed.
    pub async fn wait_for_drain(self) -> PoolReport {
        let mut report = PoolReport::default();
        for handle in self.handles {
            match handle.await {
                Ok(stats) => report.workers.push(stats),
                Err(e) => {
                    error!(error = %e, "Worker task failed");
                    report.panicked += 1;
                }
            }
        }

        let total = report.total();
        info!(
            processed = total.processed,
            persisted = total.persisted,
            dead_lettered = total.dead_lettered,
            discarded = total.discarded,
            stranded = total.stranded,
            "Worker pool drained"
        );
        report
    }
}

fn spawn_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<BrokerMessage>>>,
    handler: Arc<dyn MessageHandler>,
) -> JoinHandle<WorkerStats> {
    tokio::spawn(async move {
        debug!(worker_id, "Worker started");
        let mut stats = WorkerStats {
            worker_id,
            ..WorkerStats::default()
        };

        loop {
            // the lock is released before processing, so one slow write
            // never stops the other workers from taking jobs
            let next = receiver.lock().await.recv().await;
            let Some(message) = next else {
                break;
            };
            let outcome = handler.handle(message).await;
            stats.record(&outcome);
        }

        debug!(worker_id, processed = stats.processed, "Worker finished");
        stats
    })
}
