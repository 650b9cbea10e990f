//! # In-Memory Event Sink
//!
//! Same upsert semantics as the Postgres sink, plus controls that let tests
//! hold workers mid-write or make writes fail.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use super::traits::{EventSink, InsertOutcome};
use super::StorageError;
use crate::models::CacheEvent;

type RowKey = (String, DateTime<Utc>);

#[derive(Debug)]
pub struct InMemoryEventSink {
    rows: Mutex<BTreeMap<RowKey, CacheEvent>>,
    failures: Mutex<VecDeque<StorageError>>,
    paused: watch::Sender<bool>,
    in_flight: AtomicUsize,
    attempts: AtomicUsize,
}

impl Default for InMemoryEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            rows: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(VecDeque::new()),
            paused,
            in_flight: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Stored rows in `(resource_id, timestamp)` order
    pub fn rows(&self) -> Vec<CacheEvent> {
        self.rows.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Writes currently inside [`EventSink::insert`], including paused ones
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Every call to `insert`, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Block every write until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Queue errors returned by the next writes, one per call
    pub fn fail_next(&self, errors: impl IntoIterator<Item = StorageError>) {
        self.failures.lock().extend(errors);
    }

    async fn wait_until_resumed(&self) {
        let mut paused = self.paused.subscribe();
        // the sender lives in self, so wait_for cannot observe a closed channel
        let _ = paused.wait_for(|paused| !*paused).await;
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn insert(&self, event: &CacheEvent) -> Result<InsertOutcome, StorageError> {
        let _guard = InFlightGuard::enter(&self.in_flight);
        self.attempts.fetch_add(1, Ordering::SeqCst);

        self.wait_until_resumed().await;

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        let key = (event.resource_id.clone(), event.timestamp);
        let previous = self.rows.lock().insert(key, event.clone());
        Ok(match previous {
            None => InsertOutcome::Inserted,
            Some(_) => InsertOutcome::Replaced,
        })
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
