//! Collaborator boundaries of the engine.
//!
//! The engine reaches the outside world only through these traits:
//! historical performance, movement/form sensing and the exercise
//! catalog. Implementations are handed in at construction time.

use crate::{ExerciseStep, Issue, PerformanceRecord, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Source of historical performance for one user
pub trait PerformanceRepository {
    /// Records for `exercise_id` from the last `window_days`, oldest first
    fn query_recent(
        &self,
        user_id: &str,
        exercise_id: &str,
        window_days: i64,
    ) -> Result<Vec<PerformanceRecord>>;
}

/// Candidate alternatives for exercise substitution
pub trait ExerciseCatalog {
    /// Exercises that could replace `exercise`, restricted to the equipment
    /// at hand
    fn alternatives(&self, exercise: &ExerciseStep, equipment: &[String])
        -> Result<Vec<ExerciseStep>>;
}

/// Derived form assessment delivered by the movement provider
///
/// Raw accelerometer/gyroscope buffers never reach the engine; only this
/// summary does.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormReading {
    pub timestamp: DateTime<Utc>,
    /// Overall form quality in [0, 1]
    pub overall: f64,
    #[serde(default)]
    pub deviations: Vec<String>,
    pub confidence: f64,
    pub movement_speed: f64,
    pub rep_count: i32,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Movement/sensor collaborator with an explicit session-scoped lifecycle
pub trait MovementProvider: Send {
    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Next form reading, or `None` when nothing new is available
    fn next_reading(&mut self) -> Result<Option<FormReading>>;
}

/// Provider that replays a fixed sequence of readings
#[derive(Debug, Default)]
pub struct ReplayProvider {
    readings: VecDeque<FormReading>,
    open: bool,
}

impl ReplayProvider {
    pub fn new(readings: impl IntoIterator<Item = FormReading>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            open: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl MovementProvider for ReplayProvider {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        tracing::debug!("Replay provider opened with {} readings", self.readings.len());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn next_reading(&mut self) -> Result<Option<FormReading>> {
        if !self.open {
            return Err(crate::Error::CollaboratorUnavailable(
                "movement provider is not open".into(),
            ));
        }
        Ok(self.readings.pop_front())
    }
}
