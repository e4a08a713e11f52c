//! Core domain types for the adaptive training engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Observations and the performance snapshots derived from them
//! - Exercise descriptions and historical performance records
//! - Adaptation decisions, modifications and detected issues
//! - Session-scope context

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Observations and Snapshots
// ============================================================================

/// A raw observation as delivered by the ingestion boundary
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub exercise_id: String,
    pub timestamp: DateTime<Utc>,
    pub form_quality: f64,
    pub perceived_exertion: u8,
    #[serde(default)]
    pub heart_rate: Option<u16>,
    pub rep_count: i32,
    pub movement_speed: f64,
    /// Working weight for the set, if the host knows it
    #[serde(default)]
    pub weight: Option<f64>,
    /// Set volume (weight x reps or an equivalent load metric)
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Observation {
    /// Reject out-of-domain values before anything touches the buffer
    pub fn validate(&self) -> Result<()> {
        if self.exercise_id.trim().is_empty() {
            return Err(Error::InvalidObservation("exercise_id is empty".into()));
        }
        if !self.form_quality.is_finite() || !(0.0..=1.0).contains(&self.form_quality) {
            return Err(Error::InvalidObservation(format!(
                "form_quality {} outside [0, 1]",
                self.form_quality
            )));
        }
        if !(1..=10).contains(&self.perceived_exertion) {
            return Err(Error::InvalidObservation(format!(
                "perceived_exertion {} outside [1, 10]",
                self.perceived_exertion
            )));
        }
        if self.rep_count < 0 {
            return Err(Error::InvalidObservation(format!(
                "rep_count {} is negative",
                self.rep_count
            )));
        }
        if !self.movement_speed.is_finite() || self.movement_speed < 0.0 {
            return Err(Error::InvalidObservation(format!(
                "movement_speed {} is not a non-negative number",
                self.movement_speed
            )));
        }
        if let Some(hr) = self.heart_rate {
            if hr == 0 || hr > MAX_PLAUSIBLE_HEART_RATE {
                return Err(Error::InvalidObservation(format!(
                    "heart_rate {} outside (0, {}]",
                    hr, MAX_PLAUSIBLE_HEART_RATE
                )));
            }
        }
        for (name, value) in [("weight", self.weight), ("volume", self.volume)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::InvalidObservation(format!(
                        "{} {} is not a non-negative number",
                        name, v
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Upper bound for a heart-rate reading to be considered a sensor value
pub const MAX_PLAUSIBLE_HEART_RATE: u16 = 250;

/// One buffered observation with its derived fatigue measure
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub exercise_id: String,
    pub form_quality: f64,
    pub perceived_exertion: u8,
    pub heart_rate: Option<u16>,
    pub rep_count: i32,
    pub movement_speed: f64,
    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub fatigue_measure: f64,
}

impl PerformanceSnapshot {
    /// Validate an observation and derive its fatigue measure
    pub fn from_observation(obs: &Observation) -> Result<Self> {
        obs.validate()?;
        let fatigue_measure = crate::fatigue::fatigue_measure(
            obs.form_quality,
            obs.perceived_exertion,
            obs.movement_speed,
        );

        Ok(Self {
            timestamp: obs.timestamp,
            exercise_id: obs.exercise_id.clone(),
            form_quality: obs.form_quality,
            perceived_exertion: obs.perceived_exertion,
            heart_rate: obs.heart_rate,
            rep_count: obs.rep_count,
            movement_speed: obs.movement_speed,
            weight: obs.weight,
            volume: obs.volume,
            fatigue_measure,
        })
    }

    pub fn heart_rate_zone(&self) -> Option<HeartRateZone> {
        self.heart_rate.map(HeartRateZone::from_bpm)
    }
}

// ============================================================================
// Exercise Description
// ============================================================================

/// Declared intensity of an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntensityLabel {
    Easy,
    Medium,
    Hard,
}

impl IntensityLabel {
    /// Starting difficulty on the 0-1 scale
    pub fn difficulty(self) -> f64 {
        match self {
            IntensityLabel::Hard => 0.8,
            IntensityLabel::Medium => 0.6,
            IntensityLabel::Easy => 0.4,
        }
    }

    /// Parse a free-text intensity label (English or German)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        if s.contains("hard") || s.contains("schwer") {
            Some(IntensityLabel::Hard)
        } else if s.contains("medium") || s.contains("mittel") {
            Some(IntensityLabel::Medium)
        } else if s.contains("easy") || s.contains("leicht") {
            Some(IntensityLabel::Easy)
        } else {
            None
        }
    }
}

/// Broad exercise family, used for rest-time baselines
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Strength,
    Cardio,
    Flexibility,
    Other(String),
}

impl ExerciseKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "strength" | "krafttraining" => ExerciseKind::Strength,
            "cardio" | "ausdauer" => ExerciseKind::Cardio,
            "flexibility" | "beweglichkeit" => ExerciseKind::Flexibility,
            other => ExerciseKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseKind::Strength => write!(f, "strength"),
            ExerciseKind::Cardio => write!(f, "cardio"),
            ExerciseKind::Flexibility => write!(f, "flexibility"),
            ExerciseKind::Other(s) => write!(f, "{}", s),
        }
    }
}

/// An exercise as planned in the current session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseStep {
    pub name: String,
    pub kind: ExerciseKind,
    #[serde(default)]
    pub intensity: Option<IntensityLabel>,
    #[serde(default)]
    pub description: String,
    pub rest_seconds: u32,
    #[serde(default)]
    pub equipment: Vec<String>,
}

impl ExerciseStep {
    /// Starting difficulty; unlabeled exercises are treated as medium
    pub fn difficulty(&self) -> f64 {
        self.intensity
            .map(IntensityLabel::difficulty)
            .unwrap_or(DEFAULT_DIFFICULTY)
    }
}

/// Difficulty assumed when an exercise carries no intensity label
pub const DEFAULT_DIFFICULTY: f64 = 0.6;

/// Outcome of the set that just finished
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetPerformance {
    pub form_quality: f64,
    pub perceived_exertion: u8,
    pub actual_reps: i32,
    pub target_reps: i32,
    pub weight: f64,
}

/// A historical performance record as kept by the external repository
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRecord {
    pub id: Uuid,
    pub user_id: String,
    pub exercise_id: String,
    pub weight: f64,
    pub reps: i32,
    pub form_quality: f64,
    pub rpe: u8,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Classifications
// ============================================================================

/// Coarse heart-rate band
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeartRateZone {
    Resting,
    FatBurn,
    Cardio,
    Peak,
}

impl HeartRateZone {
    /// Classify a reading in beats per minute
    ///
    /// Bands: up to 100 resting, 101-140 fat burn, 141-170 cardio,
    /// above 170 peak.
    pub fn from_bpm(bpm: u16) -> Self {
        match bpm {
            0..=100 => HeartRateZone::Resting,
            101..=140 => HeartRateZone::FatBurn,
            141..=170 => HeartRateZone::Cardio,
            _ => HeartRateZone::Peak,
        }
    }
}

/// Short-window direction of the current exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTrend {
    Improving,
    Stable,
    Declining,
}

/// Direction of the whole session so far
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionTrend {
    Excellent,
    Stable,
    Declining,
}

/// Urgency of a coaching message
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackPriority {
    Low,
    Medium,
    High,
    Critical,
}

// ============================================================================
// Decisions and Issues
// ============================================================================

/// What kind of change a decision recommends
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationType {
    NoChange,
    IncreaseIntensity,
    ReduceIntensity,
    ModifyTechnique,
    SubstituteExercise,
    AdjustRestTime,
    ChangeTempo,
}

/// Per-exercise change proposed by a decision
///
/// `weight_adjustment` is a relative delta (-0.1 = 10% lighter); rest and
/// tempo are multipliers where 1.0 means unchanged.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseModification {
    pub exercise_id: String,
    pub weight_adjustment: f64,
    pub rep_adjustment: i32,
    pub rest_time_multiplier: f64,
    pub tempo_multiplier: f64,
    pub reason: String,
}

impl ExerciseModification {
    pub fn no_change(exercise_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            weight_adjustment: 0.0,
            rep_adjustment: 0,
            rest_time_multiplier: 1.0,
            tempo_multiplier: 1.0,
            reason: "No change required".into(),
        }
    }

    pub fn has_changes(&self) -> bool {
        self.weight_adjustment != 0.0
            || self.rep_adjustment != 0
            || self.rest_time_multiplier != 1.0
            || self.tempo_multiplier != 1.0
    }
}

/// The engine's output at a decision point
///
/// Each decision point yields a fresh value; nothing in the engine holds
/// on to or edits a decision after handing it out.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdaptationDecision {
    #[serde(rename = "type")]
    pub kind: AdaptationType,
    pub modifications: Vec<ExerciseModification>,
    pub reasoning: String,
    pub confidence: f64,
}

impl AdaptationDecision {
    pub fn new(
        kind: AdaptationType,
        modifications: Vec<ExerciseModification>,
        reasoning: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind,
            modifications,
            reasoning: reasoning.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Enough data, nothing to change
    pub fn no_change() -> Self {
        Self::new(AdaptationType::NoChange, vec![], "No adaptation required", 1.0)
    }

    /// Degraded-but-valid answer for a window that is still too small
    pub fn insufficient_data() -> Self {
        Self::new(
            AdaptationType::NoChange,
            vec![],
            "Insufficient data - continue current strategy and gather more data",
            0.0,
        )
    }
}

/// Category of a detected performance problem
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    FormDegradation,
    ExcessiveFatigue,
    InsufficientIntensity,
    MovementAsymmetry,
    SafetyConcern,
}

/// Ordered severity; `High` and above may trigger a substitution
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub description: String,
    pub detection_confidence: f64,
}

// ============================================================================
// Session Context
// ============================================================================

/// Session-scope aggregate, updated once per completed exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    pub session_id: String,
    pub session_duration_minutes: u32,
    pub total_exercises: u32,
    pub completed_exercises: u32,
    pub overall_intensity: f64,
    pub user_energy_level: f64,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, total_exercises: u32) -> Self {
        Self {
            session_id: session_id.into(),
            session_duration_minutes: 0,
            total_exercises,
            completed_exercises: 0,
            overall_intensity: 0.0,
            user_energy_level: 1.0,
        }
    }

    /// Record an exercise completion
    ///
    /// `overall_intensity` becomes the running mean over completed
    /// exercises; energy and elapsed minutes are taken as reported.
    pub fn complete_exercise(&mut self, intensity: f64, energy_level: f64, elapsed_minutes: u32) {
        let done = self.completed_exercises as f64;
        let intensity = intensity.clamp(0.0, 1.0);
        self.overall_intensity = (self.overall_intensity * done + intensity) / (done + 1.0);
        self.completed_exercises = (self.completed_exercises + 1).min(self.total_exercises.max(1));
        self.user_energy_level = energy_level.clamp(0.0, 1.0);
        self.session_duration_minutes = elapsed_minutes;
    }

    pub fn remaining_exercises(&self) -> u32 {
        self.total_exercises.saturating_sub(self.completed_exercises)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(form: f64, rpe: u8) -> Observation {
        Observation {
            exercise_id: "squat".into(),
            timestamp: Utc::now(),
            form_quality: form,
            perceived_exertion: rpe,
            heart_rate: None,
            rep_count: 5,
            movement_speed: 1.0,
            weight: None,
            volume: None,
        }
    }

    #[test]
    fn test_validate_accepts_boundaries() {
        assert!(observation(0.0, 1).validate().is_ok());
        assert!(observation(1.0, 10).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_domain() {
        assert!(matches!(
            observation(1.2, 5).validate(),
            Err(Error::InvalidObservation(_))
        ));
        assert!(observation(f64::NAN, 5).validate().is_err());
        assert!(observation(0.8, 0).validate().is_err());
        assert!(observation(0.8, 11).validate().is_err());

        let mut obs = observation(0.8, 5);
        obs.rep_count = -1;
        assert!(obs.validate().is_err());

        let mut obs = observation(0.8, 5);
        obs.heart_rate = Some(0);
        assert!(obs.validate().is_err());

        let mut obs = observation(0.8, 5);
        obs.volume = Some(-10.0);
        assert!(obs.validate().is_err());
    }

    #[test]
    fn test_heart_rate_zones() {
        assert_eq!(HeartRateZone::from_bpm(60), HeartRateZone::Resting);
        assert_eq!(HeartRateZone::from_bpm(100), HeartRateZone::Resting);
        assert_eq!(HeartRateZone::from_bpm(101), HeartRateZone::FatBurn);
        assert_eq!(HeartRateZone::from_bpm(155), HeartRateZone::Cardio);
        assert_eq!(HeartRateZone::from_bpm(171), HeartRateZone::Peak);
        assert_eq!(HeartRateZone::from_bpm(230), HeartRateZone::Peak);
    }

    #[test]
    fn test_intensity_label_parsing() {
        assert_eq!(IntensityLabel::parse("Hard set"), Some(IntensityLabel::Hard));
        assert_eq!(IntensityLabel::parse("mittel"), Some(IntensityLabel::Medium));
        assert_eq!(IntensityLabel::parse("Leichte Variante"), Some(IntensityLabel::Easy));
        assert_eq!(IntensityLabel::parse("3x10"), None);
    }

    #[test]
    fn test_exercise_kind_parsing() {
        assert_eq!(ExerciseKind::parse("Strength"), ExerciseKind::Strength);
        assert_eq!(ExerciseKind::parse("ausdauer"), ExerciseKind::Cardio);
        assert_eq!(
            ExerciseKind::parse("plyo"),
            ExerciseKind::Other("plyo".into())
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(IssueSeverity::Critical > IssueSeverity::High);
        assert!(IssueSeverity::High > IssueSeverity::Medium);
        assert!(IssueSeverity::Medium > IssueSeverity::Low);
    }

    #[test]
    fn test_modification_has_changes() {
        let unchanged = ExerciseModification::no_change("bench_press");
        assert!(!unchanged.has_changes());

        let heavier = ExerciseModification {
            weight_adjustment: 0.05,
            ..ExerciseModification::no_change("bench_press")
        };
        assert!(heavier.has_changes());
    }

    #[test]
    fn test_insufficient_data_decision() {
        let decision = AdaptationDecision::insufficient_data();
        assert_eq!(decision.kind, AdaptationType::NoChange);
        assert_eq!(decision.confidence, 0.0);
        assert!(decision.modifications.is_empty());
    }

    #[test]
    fn test_session_context_completion() {
        let mut ctx = SessionContext::new("s1", 4);
        ctx.complete_exercise(0.8, 0.9, 10);
        ctx.complete_exercise(0.6, 0.7, 22);

        assert_eq!(ctx.completed_exercises, 2);
        assert_eq!(ctx.remaining_exercises(), 2);
        assert!((ctx.overall_intensity - 0.7).abs() < 1e-9);
        assert_eq!(ctx.user_energy_level, 0.7);
        assert_eq!(ctx.session_duration_minutes, 22);
    }
}
