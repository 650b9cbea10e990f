//! # Offset Tracking
//!
//! Workers finish messages out of order, but a partition's committed offset
//! may only move past messages that are handled. The reader registers every
//! position before handing it to the pool; workers report completion, and the
//! tracker answers with the highest offset that is now safe to commit.
//!
//! A tracked position that never completes (abandoned during shutdown, dropped
//! after a failed dead-letter publish) pins the partition's commit point below
//! it, so the broker redelivers it to the next group member.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

use crate::messaging::MessagePosition;

#[derive(Debug, Default)]
struct PartitionOffsets {
    pending: BTreeSet<i64>,
    completed: BTreeSet<i64>,
    committed: Option<i64>,
}

impl PartitionOffsets {
    /// Highest completed offset below every pending one, if it advances the commit point
    fn advance(&mut self) -> Option<i64> {
        let candidate = match self.pending.first() {
            Some(&floor) => self.completed.range(..floor).next_back().copied(),
            None => self.completed.last().copied(),
        }?;

        if self.committed.is_some_and(|committed| candidate <= committed) {
            return None;
        }

        self.completed = self.completed.split_off(&(candidate + 1));
        self.committed = Some(candidate);
        Some(candidate)
    }
}

#[derive(Debug, Default)]
pub struct OffsetTracker {
    partitions: Mutex<HashMap<(String, i32), PartitionOffsets>>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a position as in flight. Must happen before the message is queued.
    pub fn track(&self, position: &MessagePosition) {
        self.partitions
            .lock()
            .entry((position.topic.clone(), position.partition))
            .or_default()
            .pending
            .insert(position.offset);
    }

    /// Mark a position handled; returns the position to commit, if the
    /// partition's commit point moved.
    pub fn complete(&self, position: &MessagePosition) -> Option<MessagePosition> {
        let mut partitions = self.partitions.lock();
        let state = partitions.get_mut(&(position.topic.clone(), position.partition))?;

        if !state.pending.remove(&position.offset) {
            return None;
        }
        state.completed.insert(position.offset);

        state.advance().map(|offset| MessagePosition {
            topic: position.topic.clone(),
            partition: position.partition,
            offset,
        })
    }

    /// Positions tracked but not yet completed, across all partitions
    pub fn pending_count(&self) -> usize {
        self.partitions
            .lock()
            .values()
            .map(|state| state.pending.len())
            .sum()
    }

    /// Last offset handed out for commit on a partition
    pub fn committed(&self, topic: &str, partition: i32) -> Option<i64> {
        self.partitions
            .lock()
            .get(&(topic.to_string(), partition))
            .and_then(|state| state.committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn position(partition: i32, offset: i64) -> MessagePosition {
        MessagePosition {
            topic: "events".to_string(),
            partition,
            offset,
        }
    }

    #[test]
    fn test_out_of_order_completion_waits_for_gap() {
        let tracker = OffsetTracker::new();
        for offset in 0..3 {
            tracker.track(&position(0, offset));
        }

        assert_eq!(tracker.complete(&position(0, 2)), None);
        assert_eq!(tracker.complete(&position(0, 1)), None);
        assert_eq!(tracker.complete(&position(0, 0)), Some(position(0, 2)));
        assert_eq!(tracker.pending_count(), 0);
        assert_eq!(tracker.committed("events", 0), Some(2));
    }

    #[test]
    fn test_partitions_are_independent() {
        let tracker = OffsetTracker::new();
        tracker.track(&position(0, 0));
        tracker.track(&position(1, 0));

        assert_eq!(tracker.complete(&position(1, 0)), Some(position(1, 0)));
        assert_eq!(tracker.committed("events", 0), None);
    }

    #[test]
    fn test_stranded_position_pins_commit_point() {
        let tracker = OffsetTracker::new();
        for offset in 10..14 {
            tracker.track(&position(0, offset));
        }

        assert_eq!(tracker.complete(&position(0, 10)), Some(position(0, 10)));
        // 11 never completes
        assert_eq!(tracker.complete(&position(0, 12)), None);
        assert_eq!(tracker.complete(&position(0, 13)), None);
        assert_eq!(tracker.committed("events", 0), Some(10));
        assert_eq!(tracker.pending_count(), 1);
    }

    #[test]
    fn test_offset_gaps_do_not_block() {
        // compacted topics skip offsets; only tracked positions matter
        let tracker = OffsetTracker::new();
        tracker.track(&position(0, 3));
        tracker.track(&position(0, 7));

        assert_eq!(tracker.complete(&position(0, 3)), Some(position(0, 3)));
        assert_eq!(tracker.complete(&position(0, 7)), Some(position(0, 7)));
    }

    #[test]
    fn test_untracked_completion_is_ignored() {
        let tracker = OffsetTracker::new();
        assert_eq!(tracker.complete(&position(0, 5)), None);
        tracker.track(&position(0, 1));
        assert_eq!(tracker.complete(&position(0, 5)), None);
    }

    proptest! {
        #[test]
        fn commits_never_pass_an_unhandled_offset(
            order in (1usize..40).prop_flat_map(|n| Just((0..n as i64).collect::<Vec<_>>()).prop_shuffle())
        ) {
            let tracker = OffsetTracker::new();
            for offset in 0..order.len() as i64 {
                tracker.track(&position(0, offset));
            }

            let mut handled = BTreeSet::new();
            let mut last_commit = None;
            for offset in &order {
                handled.insert(*offset);
                if let Some(commit) = tracker.complete(&position(0, *offset)) {
                    prop_assert!((0..=commit.offset).all(|o| handled.contains(&o)));
                    prop_assert!(last_commit.map_or(true, |last| commit.offset > last));
                    last_commit = Some(commit.offset);
                }
            }

            prop_assert_eq!(last_commit, Some(order.len() as i64 - 1));
        }
    }
}
