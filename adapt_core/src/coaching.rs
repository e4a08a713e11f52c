//! Real-time coaching messages and the feed that delivers them.
//!
//! The engine produces at most one `CoachingMessage` per observation and
//! pushes it through a bounded channel. The producer never blocks: when
//! the consumer falls behind, the oldest pending message is dropped.

use crate::fatigue::current_fatigue_level;
use crate::{FeedbackPriority, PerformanceSnapshot};
use chrono::{DateTime, Utc};
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Pending messages kept for a slow consumer
pub const DEFAULT_FEED_CAPACITY: usize = 32;

/// How often a blocked consumer re-checks cancellation
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub const CRITICAL_FORM_THRESHOLD: f64 = 0.5;
pub const MEDIUM_FORM_THRESHOLD: f64 = 0.7;
pub const HIGH_PRIORITY_RPE: u8 = 9;
pub const MEDIUM_PRIORITY_RPE: u8 = 8;

pub const PRAISE_FORM_THRESHOLD: f64 = 0.9;
/// Form every recent observation must exceed before suggesting more load
pub const SUSTAINED_FORM_THRESHOLD: f64 = 0.85;
pub const TECHNIQUE_FORM_THRESHOLD: f64 = 0.6;
pub const HOLD_FORM_THRESHOLD: f64 = 0.8;
pub const WARN_FATIGUE_THRESHOLD: f64 = 0.8;
pub const RESERVE_FATIGUE_THRESHOLD: f64 = 0.3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CoachingMessage {
    pub exercise_id: String,
    /// Immediate feedback, in display order
    pub messages: Vec<String>,
    /// Suggested adaptive actions
    pub actions: Vec<String>,
    pub priority: FeedbackPriority,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

pub fn priority(snapshot: &PerformanceSnapshot) -> FeedbackPriority {
    if snapshot.form_quality < CRITICAL_FORM_THRESHOLD {
        FeedbackPriority::Critical
    } else if snapshot.perceived_exertion > HIGH_PRIORITY_RPE {
        FeedbackPriority::High
    } else if snapshot.form_quality < MEDIUM_FORM_THRESHOLD
        || snapshot.perceived_exertion > MEDIUM_PRIORITY_RPE
    {
        FeedbackPriority::Medium
    } else {
        FeedbackPriority::Low
    }
}

/// Data completeness of one observation and its window
///
/// Mean of a data-quality part (heart rate and form present) and a
/// history-quality part (window size).
pub fn confidence(snapshot: &PerformanceSnapshot, history_len: usize) -> f64 {
    let data_quality = if snapshot.heart_rate.is_some() && snapshot.form_quality > 0.0 {
        1.0
    } else if snapshot.form_quality > 0.0 {
        0.8
    } else {
        0.5
    };
    let history_quality = if history_len > 5 {
        0.9
    } else if history_len > 2 {
        0.7
    } else {
        0.5
    };
    (data_quality + history_quality) / 2.0
}

/// Coaching for `snapshot` given the window it was recorded into
///
/// `history` is the buffer contents, current observation included.
pub fn coaching_message(snapshot: &PerformanceSnapshot, history: &[PerformanceSnapshot]) -> CoachingMessage {
    let mut messages = Vec::new();
    let mut actions = Vec::new();
    let form = snapshot.form_quality;

    if form > PRAISE_FORM_THRESHOLD {
        messages.push("Excellent form! Keep it up.".to_string());
        let start = history.len().saturating_sub(3);
        let sustained = history.len() > 3
            && history[start..]
                .iter()
                .all(|s| s.form_quality > SUSTAINED_FORM_THRESHOLD);
        if sustained {
            actions.push("Ready for more intensity".to_string());
        }
    } else if form < TECHNIQUE_FORM_THRESHOLD {
        messages.push("Focus on technique - slow down and control the movement.".to_string());
        actions.push("Reduce weight".to_string());
    } else if form < HOLD_FORM_THRESHOLD {
        messages.push("Good work - hold your form.".to_string());
    }

    let fatigue = current_fatigue_level(history);
    if fatigue > WARN_FATIGUE_THRESHOLD {
        messages.push("High fatigue detected - take it easy.".to_string());
        actions.push("Extend rest".to_string());
    } else if fatigue < RESERVE_FATIGUE_THRESHOLD && form > HOLD_FORM_THRESHOLD {
        messages.push("You still have reserves.".to_string());
        actions.push("Increase intensity".to_string());
    }

    CoachingMessage {
        exercise_id: snapshot.exercise_id.clone(),
        messages,
        actions,
        priority: priority(snapshot),
        confidence: confidence(snapshot, history.len()),
        timestamp: snapshot.timestamp,
    }
}

/// Cooperative cancellation flag shared by producer and consumer
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Producer side of the feed, held by the engine
#[derive(Clone, Debug)]
pub struct FeedHandle {
    tx: Sender<CoachingMessage>,
    // Used only to evict the oldest message when full
    overflow: Receiver<CoachingMessage>,
    cancel: CancelToken,
}

impl FeedHandle {
    /// Queue a message without blocking
    ///
    /// Returns false once the feed is cancelled or the consumer is gone.
    pub fn push(&self, message: CoachingMessage) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!("Feed cancelled, dropping message for {}", message.exercise_id);
            return false;
        }
        let mut pending = message;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return true,
                Err(TrySendError::Full(m)) => {
                    if self.overflow.try_recv().is_ok() {
                        tracing::debug!("Coaching feed full, dropped oldest message");
                    }
                    pending = m;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Consumer side of the feed
///
/// Iterating blocks until the next message arrives. Iteration ends when
/// the feed is cancelled and drained, or when every producer is dropped.
#[derive(Debug)]
pub struct CoachingFeed {
    rx: Receiver<CoachingMessage>,
    cancel: CancelToken,
}

impl CoachingFeed {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Next pending message, if any, without waiting
    pub fn try_next(&self) -> Option<CoachingMessage> {
        self.rx.try_recv().ok()
    }

    /// Everything currently pending
    pub fn drain(&self) -> Vec<CoachingMessage> {
        self.rx.try_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Drop for CoachingFeed {
    // The handle keeps a receiver of its own for eviction, so the channel
    // never disconnects on its side; the cancel flag marks the consumer gone.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Iterator for CoachingFeed {
    type Item = CoachingMessage;

    fn next(&mut self) -> Option<CoachingMessage> {
        loop {
            if let Ok(message) = self.rx.try_recv() {
                return Some(message);
            }
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(message) => return Some(message),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

/// Create a connected producer/consumer pair
pub fn feed(capacity: usize) -> (FeedHandle, CoachingFeed) {
    let (tx, rx) = bounded(capacity.max(1));
    let cancel = CancelToken::new();
    (
        FeedHandle {
            tx,
            overflow: rx.clone(),
            cancel: cancel.clone(),
        },
        CoachingFeed { rx, cancel },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatigue::fatigue_measure;
    use chrono::Duration as ChronoDuration;
    use std::thread;

    fn snap(i: i64, form: f64, rpe: u8, heart_rate: Option<u16>) -> PerformanceSnapshot {
        PerformanceSnapshot {
            timestamp: Utc::now() + ChronoDuration::seconds(i),
            exercise_id: "squat".into(),
            form_quality: form,
            perceived_exertion: rpe,
            heart_rate,
            rep_count: i as i32,
            movement_speed: 1.0,
            weight: None,
            volume: None,
            fatigue_measure: fatigue_measure(form, rpe, 1.0),
        }
    }

    #[test]
    fn test_priority_ladder() {
        assert_eq!(priority(&snap(0, 0.45, 5, None)), FeedbackPriority::Critical);
        assert_eq!(priority(&snap(0, 0.45, 10, None)), FeedbackPriority::Critical);
        assert_eq!(priority(&snap(0, 0.9, 10, None)), FeedbackPriority::High);
        assert_eq!(priority(&snap(0, 0.65, 5, None)), FeedbackPriority::Medium);
        assert_eq!(priority(&snap(0, 0.9, 9, None)), FeedbackPriority::Medium);
        assert_eq!(priority(&snap(0, 0.9, 8, None)), FeedbackPriority::Low);
    }

    #[test]
    fn test_sustained_form_unlocks_intensity() {
        let history: Vec<_> = (0..4).map(|i| snap(i, 0.95, 4, Some(120))).collect();
        let msg = coaching_message(&history[3], &history);

        assert!(msg.messages[0].contains("Excellent form"));
        assert!(msg.actions.contains(&"Ready for more intensity".to_string()));
        // Low RPE keeps fatigue well under the reserve threshold
        assert!(msg.actions.contains(&"Increase intensity".to_string()));
        assert_eq!(msg.priority, FeedbackPriority::Low);
        assert!((msg.confidence - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_poor_form_asks_for_less_weight() {
        let history = vec![snap(0, 0.55, 7, None)];
        let msg = coaching_message(&history[0], &history);

        assert!(msg.messages[0].contains("technique"));
        assert_eq!(msg.actions, vec!["Reduce weight".to_string()]);
        assert_eq!(msg.priority, FeedbackPriority::Medium);
        assert!((msg.confidence - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_high_fatigue_extends_rest() {
        let mut history: Vec<_> = (0..3).map(|i| snap(i, 0.2, 10, None)).collect();
        for s in &mut history {
            s.movement_speed = 0.2;
            s.fatigue_measure = fatigue_measure(0.2, 10, 0.2);
        }
        let msg = coaching_message(&history[2], &history);
        assert!(msg.actions.contains(&"Extend rest".to_string()));
        assert_eq!(msg.priority, FeedbackPriority::Critical);
    }

    #[test]
    fn test_confidence_without_form() {
        assert_eq!(confidence(&snap(0, 0.0, 5, Some(100)), 6), (0.5 + 0.9) / 2.0);
    }

    #[test]
    fn test_feed_delivers_in_order() {
        let (handle, mut feed) = feed(4);
        let history = vec![snap(0, 0.9, 5, None)];
        for _ in 0..3 {
            assert!(handle.push(coaching_message(&history[0], &history)));
        }
        assert_eq!(feed.pending(), 3);
        drop(handle);
        assert_eq!(feed.by_ref().count(), 3);
    }

    #[test]
    fn test_full_feed_drops_oldest() {
        let (handle, feed) = feed(2);
        for i in 0..5 {
            let s = snap(i, 0.9, 5, None);
            assert!(handle.push(coaching_message(&s, &[s.clone()])));
        }
        let kept: Vec<_> = feed.drain().into_iter().map(|m| m.timestamp).collect();
        assert_eq!(kept.len(), 2);
        assert!(kept[0] < kept[1]);
    }

    #[test]
    fn test_cancel_refuses_pushes_but_drains_pending() {
        let (handle, mut feed) = feed(8);
        let s = snap(0, 0.9, 5, None);
        assert!(handle.push(coaching_message(&s, &[s.clone()])));

        feed.cancel();
        assert!(handle.is_cancelled());
        assert!(!handle.push(coaching_message(&s, &[s.clone()])));

        assert!(feed.next().is_some());
        assert!(feed.next().is_none());
    }

    #[test]
    fn test_push_refused_after_consumer_dropped() {
        let (handle, feed) = feed(2);
        let s = snap(0, 0.9, 5, None);
        assert!(handle.push(coaching_message(&s, &[s.clone()])));

        drop(feed);
        assert!(handle.is_cancelled());
        assert!(!handle.push(coaching_message(&s, &[s.clone()])));
    }

    #[test]
    fn test_consumer_on_another_thread() {
        let (handle, feed) = feed(DEFAULT_FEED_CAPACITY);
        let token = handle.cancel_token();
        let consumer = thread::spawn(move || feed.map(|m| m.exercise_id).collect::<Vec<_>>());

        let s = snap(0, 0.9, 5, None);
        for _ in 0..5 {
            handle.push(coaching_message(&s, &[s.clone()]));
        }
        token.cancel();

        let received = consumer.join().unwrap();
        assert!(received.len() <= 5);
        assert!(received.iter().all(|id| id == "squat"));
    }
}
