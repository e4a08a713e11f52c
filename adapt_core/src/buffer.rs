//! Bounded rolling window of performance snapshots.
//!
//! The buffer holds the most recent observations of the exercise that is
//! currently in progress, oldest first. It is owned by a single engine
//! instance and is never shared.

use crate::{Error, PerformanceSnapshot, Result};
use std::collections::VecDeque;

/// Default number of snapshots retained per exercise
pub const DEFAULT_CAPACITY: usize = 10;

/// Minimum number of snapshots before any decision is made
pub const MIN_SAMPLES: usize = 3;

/// FIFO window over the snapshots of one exercise
#[derive(Clone, Debug)]
pub struct SnapshotBuffer {
    capacity: usize,
    snapshots: VecDeque<PerformanceSnapshot>,
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer retaining at most `capacity` snapshots (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Append a snapshot, evicting the oldest once over capacity
    ///
    /// A snapshot for a different exercise restarts the window. Within one
    /// exercise, a timestamp earlier than the newest buffered one is
    /// rejected and the buffer is left untouched. Equal timestamps are
    /// accepted.
    pub fn record(&mut self, snapshot: PerformanceSnapshot) -> Result<()> {
        if let Some(last) = self.snapshots.back() {
            if last.exercise_id != snapshot.exercise_id {
                tracing::debug!(
                    "Exercise changed from {} to {}, resetting window",
                    last.exercise_id,
                    snapshot.exercise_id
                );
                self.snapshots.clear();
            } else if snapshot.timestamp < last.timestamp {
                return Err(Error::OutOfOrder {
                    exercise_id: snapshot.exercise_id,
                    last: last.timestamp,
                    got: snapshot.timestamp,
                });
            }
        }

        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        Ok(())
    }

    /// Snapshots in arrival order, oldest first
    pub fn history(&self) -> Vec<PerformanceSnapshot> {
        self.snapshots.iter().cloned().collect()
    }

    /// Borrowing view of the window, oldest first
    pub fn as_slice(&mut self) -> &[PerformanceSnapshot] {
        self.snapshots.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerformanceSnapshot> {
        self.snapshots.iter()
    }

    pub fn latest(&self) -> Option<&PerformanceSnapshot> {
        self.snapshots.back()
    }

    pub fn exercise_id(&self) -> Option<&str> {
        self.snapshots.back().map(|s| s.exercise_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the window holds enough samples to decide on
    pub fn is_ready(&self) -> bool {
        self.len() >= MIN_SAMPLES
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn snapshot(exercise: &str, second: i64) -> PerformanceSnapshot {
        PerformanceSnapshot {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
                + Duration::seconds(second),
            exercise_id: exercise.into(),
            form_quality: 0.8,
            perceived_exertion: 6,
            heart_rate: None,
            rep_count: second as i32,
            movement_speed: 1.0,
            weight: None,
            volume: None,
            fatigue_measure: 0.1,
        }
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut buffer = SnapshotBuffer::new();
        for i in 0..15 {
            buffer.record(snapshot("squat", i)).unwrap();
        }

        let history = buffer.history();
        assert_eq!(history.len(), 10);
        let reps: Vec<i32> = history.iter().map(|s| s.rep_count).collect();
        assert_eq!(reps, (5..15).collect::<Vec<_>>());
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut buffer = SnapshotBuffer::new();
        buffer.record(snapshot("squat", 10)).unwrap();

        let result = buffer.record(snapshot("squat", 5));
        assert!(matches!(result, Err(Error::OutOfOrder { .. })));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.latest().unwrap().rep_count, 10);
    }

    #[test]
    fn test_equal_timestamps_accepted() {
        let mut buffer = SnapshotBuffer::new();
        buffer.record(snapshot("squat", 3)).unwrap();
        buffer.record(snapshot("squat", 3)).unwrap();
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_new_exercise_resets_window() {
        let mut buffer = SnapshotBuffer::new();
        for i in 0..4 {
            buffer.record(snapshot("squat", i)).unwrap();
        }
        assert!(buffer.is_ready());

        // An earlier timestamp is fine once the exercise changes
        buffer.record(snapshot("row", 0)).unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.exercise_id(), Some("row"));
        assert!(!buffer.is_ready());
    }

    #[test]
    fn test_custom_capacity() {
        let mut buffer = SnapshotBuffer::with_capacity(3);
        for i in 0..5 {
            buffer.record(snapshot("squat", i)).unwrap();
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.as_slice()[0].rep_count, 2);
    }
}
