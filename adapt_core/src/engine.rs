//! Decision engine tying the scorers together.
//!
//! One `AdaptiveEngine` serves one user for one session at a time:
//! - Each observation is validated, scored and buffered
//! - A coaching message and an adaptation decision come back per observation
//! - Rest, difficulty, plateau and substitution queries read the live window
//! - Completed exercises roll up into session-level learning
//!
//! Collaborators (movement provider, performance repository, exercise
//! catalog) are injected at construction. The engine never persists
//! anything itself.

use crate::buffer::SnapshotBuffer;
use crate::catalog::get_default_catalog;
use crate::coaching::{self, CoachingFeed, CoachingMessage, FeedHandle};
use crate::config::{Config, EngineConfig};
use crate::fatigue::{self, RestDayPrediction};
use crate::intensity::{
    self, DifficultyAdjustment, IntensityAdjustment, PerformanceIndicators, GOOD_FORM_THRESHOLD,
};
use crate::plateau::{self, PlateauReport};
use crate::provider::{ExerciseCatalog, FormReading, MovementProvider, PerformanceRepository};
use crate::rest::{self, RestCalculation};
use crate::session::{self, SessionLearning};
use crate::substitution::{self, ExerciseSubstitution};
use crate::trend;
use crate::{
    AdaptationDecision, AdaptationType, Error, ExerciseKind, ExerciseModification, ExerciseStep,
    Issue, Observation, PerformanceSnapshot, PerformanceTrend, Result, SessionContext,
    SetPerformance,
};
use serde::Serialize;

/// Fatigue above which intensity is reduced
pub const REDUCE_FATIGUE_THRESHOLD: f64 = 0.8;
/// Form drop across the window above which intensity is reduced
pub const REDUCE_FORM_DEGRADATION: f64 = 0.3;
/// Fatigue below which an improving trend earns more intensity
pub const INCREASE_FATIGUE_CEILING: f64 = 0.4;
/// Fatigue above which a declining trend calls for technique work
pub const TECHNIQUE_FATIGUE_THRESHOLD: f64 = 0.6;

/// Movement provider confidence assumed before any reading arrived
pub const DEFAULT_FORM_CONFIDENCE: f64 = 0.5;

/// Everything one observation produced
#[derive(Clone, Debug, Serialize)]
pub struct Observed {
    pub snapshot: PerformanceSnapshot,
    pub message: CoachingMessage,
    pub decision: AdaptationDecision,
}

/// Decide what to change about the exercise in progress
///
/// Rules are checked in order and the first match wins. Below
/// `min_samples` the answer is a zero-confidence "no change".
pub fn make_decision(history: &[PerformanceSnapshot], min_samples: usize) -> AdaptationDecision {
    let Some(latest) = history.last() else {
        return AdaptationDecision::insufficient_data();
    };
    if history.len() < min_samples {
        return AdaptationDecision::insufficient_data();
    }

    let exercise_id = latest.exercise_id.as_str();
    let fatigue = fatigue::current_fatigue_level(history);
    let degradation = trend::form_degradation(history);
    let direction = trend::performance_trend(history);

    if fatigue > REDUCE_FATIGUE_THRESHOLD || degradation > REDUCE_FORM_DEGRADATION {
        AdaptationDecision::new(
            AdaptationType::ReduceIntensity,
            vec![ExerciseModification {
                exercise_id: exercise_id.to_string(),
                weight_adjustment: -0.15,
                rep_adjustment: -2,
                rest_time_multiplier: 1.3,
                tempo_multiplier: 1.0,
                reason: "High fatigue or form degradation detected".into(),
            }],
            format!(
                "Reducing intensity: fatigue {:.2}, form degradation {:.2}",
                fatigue, degradation
            ),
            0.85,
        )
    } else if direction == PerformanceTrend::Improving && fatigue < INCREASE_FATIGUE_CEILING {
        AdaptationDecision::new(
            AdaptationType::IncreaseIntensity,
            vec![ExerciseModification {
                exercise_id: exercise_id.to_string(),
                weight_adjustment: 0.1,
                rep_adjustment: 1,
                rest_time_multiplier: 0.9,
                tempo_multiplier: 1.0,
                reason: "Performance improving with low fatigue".into(),
            }],
            format!("Increasing intensity: improving trend, fatigue {:.2}", fatigue),
            0.75,
        )
    } else if direction == PerformanceTrend::Declining && fatigue > TECHNIQUE_FATIGUE_THRESHOLD {
        AdaptationDecision::new(
            AdaptationType::ModifyTechnique,
            vec![ExerciseModification {
                exercise_id: exercise_id.to_string(),
                weight_adjustment: 0.0,
                rep_adjustment: 0,
                rest_time_multiplier: 1.1,
                tempo_multiplier: 0.8,
                reason: "Declining performance - slow down and focus on technique".into(),
            }],
            format!("Modifying technique: declining trend, fatigue {:.2}", fatigue),
            0.7,
        )
    } else {
        AdaptationDecision::no_change()
    }
}

struct ActiveSession {
    context: SessionContext,
    performances: Vec<PerformanceSnapshot>,
}

/// Real-time adaptive decision engine
pub struct AdaptiveEngine {
    config: EngineConfig,
    user_id: String,
    equipment: Vec<String>,
    buffer: SnapshotBuffer,
    provider: Box<dyn MovementProvider>,
    repository: Option<Box<dyn PerformanceRepository + Send>>,
    catalog: Option<Box<dyn ExerciseCatalog + Send>>,
    feed: Option<FeedHandle>,
    session: Option<ActiveSession>,
    provider_issues: Vec<Issue>,
    form_confidence: Option<f64>,
}

impl AdaptiveEngine {
    /// Create an engine from validated configuration
    pub fn new(config: &Config, provider: Box<dyn MovementProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.engine.clone(),
            user_id: config.user.user_id.clone(),
            equipment: config.equipment.available.clone(),
            buffer: SnapshotBuffer::with_capacity(config.engine.buffer_capacity),
            provider,
            repository: None,
            catalog: None,
            feed: None,
            session: None,
            provider_issues: Vec::new(),
            form_confidence: None,
        })
    }

    pub fn with_repository(mut self, repository: Box<dyn PerformanceRepository + Send>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Replace the built-in exercise catalog
    pub fn with_catalog(mut self, catalog: Box<dyn ExerciseCatalog + Send>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Start delivering coaching messages to a new feed
    ///
    /// Any previously attached feed stops receiving messages.
    pub fn attach_feed(&mut self) -> CoachingFeed {
        let (handle, feed) = coaching::feed(self.config.feed_capacity);
        self.feed = Some(handle);
        feed
    }

    /// Begin a session and open the movement provider
    pub fn open(&mut self, session_id: &str, total_exercises: u32) -> Result<()> {
        if let Some(active) = &self.session {
            return Err(Error::State(format!(
                "session {} is already open",
                active.context.session_id
            )));
        }
        self.provider.open()?;
        self.buffer.clear();
        self.provider_issues.clear();
        self.form_confidence = None;
        self.session = Some(ActiveSession {
            context: SessionContext::new(session_id, total_exercises),
            performances: Vec::new(),
        });
        tracing::info!(
            "Opened session {} for {} ({} exercises)",
            session_id,
            self.user_id,
            total_exercises
        );
        Ok(())
    }

    /// End the session, close the provider and return the final context
    pub fn close(&mut self) -> Result<SessionContext> {
        let active = self
            .session
            .take()
            .ok_or_else(|| Error::State("no session is open".into()))?;
        self.buffer.clear();
        self.provider.close()?;
        tracing::info!(
            "Closed session {} after {} exercises",
            active.context.session_id,
            active.context.completed_exercises
        );
        Ok(active.context)
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref().map(|s| &s.context)
    }

    pub fn buffer(&self) -> &SnapshotBuffer {
        &self.buffer
    }

    /// Ingest one observation
    ///
    /// Invalid or out-of-order observations are rejected and leave the
    /// window untouched.
    pub fn observe(&mut self, observation: &Observation) -> Result<Observed> {
        if self.session.is_none() {
            return Err(Error::State("observe called before open".into()));
        }

        let snapshot = PerformanceSnapshot::from_observation(observation).map_err(|e| {
            tracing::warn!("Rejected observation for {}: {}", observation.exercise_id, e);
            e
        })?;

        if self.buffer.exercise_id() != Some(snapshot.exercise_id.as_str()) {
            self.provider_issues.clear();
        }
        if let Err(e) = self.buffer.record(snapshot.clone()) {
            tracing::warn!("Rejected observation: {}", e);
            return Err(e);
        }

        let history = self.buffer.as_slice();
        let message = coaching::coaching_message(&snapshot, history);
        let decision = make_decision(history, self.config.min_samples);

        tracing::debug!(
            "{}: form {:.2}, rpe {}, fatigue {:.3}, window {}",
            snapshot.exercise_id,
            snapshot.form_quality,
            snapshot.perceived_exertion,
            snapshot.fatigue_measure,
            history.len()
        );
        if decision.kind != AdaptationType::NoChange {
            tracing::info!(
                "Decision for {}: {:?} ({:.2}) - {}",
                snapshot.exercise_id,
                decision.kind,
                decision.confidence,
                decision.reasoning
            );
        }

        if self.feed.as_ref().is_some_and(|f| !f.push(message.clone())) {
            tracing::debug!("Coaching feed closed, detaching it");
            self.feed = None;
        }

        Ok(Observed {
            snapshot,
            message,
            decision,
        })
    }

    /// Pull the next form reading from the movement provider and observe it
    ///
    /// The provider supplies form, speed and rep count; exertion and heart
    /// rate come from the caller. Returns `None` when no reading is ready.
    pub fn poll_provider(
        &mut self,
        exercise_id: &str,
        perceived_exertion: u8,
        heart_rate: Option<u16>,
    ) -> Result<Option<Observed>> {
        if self.session.is_none() {
            return Err(Error::State("poll_provider called before open".into()));
        }
        let Some(reading) = self.provider.next_reading()? else {
            return Ok(None);
        };

        let observation = observation_from_reading(&reading, exercise_id, perceived_exertion, heart_rate);
        let observed = self.observe(&observation)?;

        self.form_confidence = Some(reading.confidence.clamp(0.0, 1.0));
        self.provider_issues = reading.issues;
        Ok(Some(observed))
    }

    /// Decision for the current window without ingesting anything
    pub fn decision(&self) -> AdaptationDecision {
        make_decision(&self.buffer.history(), self.config.min_samples)
    }

    pub fn current_fatigue(&self) -> f64 {
        fatigue::current_fatigue_level(&self.buffer.history())
    }

    /// Rest before the next set of an exercise of `kind`
    pub fn rest_for(
        &self,
        last_set: &SetPerformance,
        kind: &ExerciseKind,
        target_intensity: Option<f64>,
    ) -> RestCalculation {
        rest::calculate_rest(last_set, self.current_fatigue(), target_intensity, kind)
    }

    /// Difficulty for `exercise` given the live window
    ///
    /// With nothing observed yet the indicators are neutral and the
    /// exercise's own difficulty comes back unchanged.
    pub fn adjust_difficulty(&self, exercise: &ExerciseStep) -> DifficultyAdjustment {
        let latest = self.buffer.latest();
        let indicators = PerformanceIndicators {
            form_quality: latest.map_or(GOOD_FORM_THRESHOLD, |s| s.form_quality),
            fatigue_level: self.current_fatigue(),
            heart_rate_zone: latest.and_then(|s| s.heart_rate_zone()),
        };
        intensity::adjust_difficulty(exercise, &indicators)
    }

    /// Plateau analysis for `exercise_id`, seeded from the repository
    pub fn detect_plateau(&self, exercise_id: &str) -> PlateauReport {
        let live = if self.buffer.exercise_id() == Some(exercise_id) {
            self.buffer.history()
        } else {
            Vec::new()
        };
        plateau::detect_with_history(
            self.repository
                .as_ref()
                .map(|r| r.as_ref() as &dyn PerformanceRepository),
            &self.user_id,
            exercise_id,
            self.config.history_window_days,
            &live,
        )
    }

    /// Workout intensity for the current exercise after plateau, form and
    /// fatigue are taken into account
    pub fn adjust_intensity(&self) -> IntensityAdjustment {
        let history = self.buffer.history();
        let report = match self.buffer.exercise_id() {
            Some(id) => self.detect_plateau(id),
            None => PlateauReport::insufficient_data(),
        };
        let form = self
            .buffer
            .latest()
            .map_or(GOOD_FORM_THRESHOLD, |s| s.form_quality);
        intensity::adjust_workout_intensity(
            &history,
            &report,
            form,
            self.form_confidence.unwrap_or(DEFAULT_FORM_CONFIDENCE),
        )
    }

    /// Issues seen in the live window plus those reported by the provider
    pub fn detect_issues(&self) -> Vec<Issue> {
        let mut issues = substitution::detect_issues(&self.buffer.history());
        issues.extend(self.provider_issues.iter().cloned());
        issues
    }

    pub fn suggest_substitution(&self, exercise: &ExerciseStep) -> Option<ExerciseSubstitution> {
        let catalog: &dyn ExerciseCatalog = match &self.catalog {
            Some(c) => c.as_ref(),
            None => get_default_catalog(),
        };
        substitution::suggest_substitution(exercise, &self.detect_issues(), &self.equipment, Some(catalog))
    }

    /// Rest days to take before the next session
    pub fn predict_rest_days(&self, recent_intensity: &[f64]) -> RestDayPrediction {
        fatigue::predict_rest_days(self.current_fatigue(), recent_intensity)
    }

    /// Close out the current exercise
    ///
    /// Its snapshots join the session's performances, the session context
    /// advances and the window is cleared for the next exercise.
    pub fn complete_exercise(&mut self, energy_level: f64, elapsed_minutes: u32) -> Result<&SessionContext> {
        let active = self
            .session
            .as_mut()
            .ok_or_else(|| Error::State("complete_exercise called before open".into()))?;

        let history = self.buffer.history();
        let observed_intensity = intensity::current_intensity(&history);
        active.performances.extend(history);
        active
            .context
            .complete_exercise(observed_intensity, energy_level, elapsed_minutes);
        self.buffer.clear();
        self.provider_issues.clear();

        tracing::info!(
            "Completed exercise {}/{} in session {}",
            active.context.completed_exercises,
            active.context.total_exercises,
            active.context.session_id
        );
        Ok(&active.context)
    }

    /// Learning over every exercise completed so far in this session
    pub fn session_learning(&self, remaining: &[String]) -> Result<SessionLearning> {
        let active = self
            .session
            .as_ref()
            .ok_or_else(|| Error::State("session_learning called before open".into()))?;
        Ok(session::learn(&active.performances, remaining))
    }
}

fn observation_from_reading(
    reading: &FormReading,
    exercise_id: &str,
    perceived_exertion: u8,
    heart_rate: Option<u16>,
) -> Observation {
    Observation {
        exercise_id: exercise_id.to_string(),
        timestamp: reading.timestamp,
        form_quality: reading.overall,
        perceived_exertion,
        heart_rate,
        rep_count: reading.rep_count,
        movement_speed: reading.movement_speed,
        weight: None,
        volume: None,
    }
}
