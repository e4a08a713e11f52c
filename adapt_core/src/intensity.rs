//! Intensity and difficulty adjustment.
//!
//! Two adjusters live here:
//! - [`adjust_difficulty`]: the real-time, rule-ordered difficulty update
//!   applied within an exercise
//! - [`adjust_workout_intensity`]: the multiplicative workout-level factor
//!   driven by plateau analysis

use crate::fatigue::{current_fatigue_level, mean};
use crate::plateau::PlateauReport;
use crate::{ExerciseStep, HeartRateZone, PerformanceSnapshot};
use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: f64 = 0.3;
pub const MAX_DIFFICULTY: f64 = 1.0;
/// Floor applied by the peak heart-rate rule
pub const PEAK_ZONE_FLOOR: f64 = 0.4;

pub const EXCELLENT_FORM_THRESHOLD: f64 = 0.9;
pub const GOOD_FORM_THRESHOLD: f64 = 0.7;
pub const POOR_FORM_THRESHOLD: f64 = 0.5;
pub const HIGH_FATIGUE_THRESHOLD: f64 = 0.8;
pub const LOW_FATIGUE_THRESHOLD: f64 = 0.3;

pub const EXCELLENT_FORM_STEP: f64 = 0.15;
pub const POOR_FORM_STEP: f64 = 0.2;
pub const HIGH_FATIGUE_STEP: f64 = 0.25;
pub const LOW_FATIGUE_STEP: f64 = 0.1;
pub const PEAK_ZONE_STEP: f64 = 0.15;
pub const RESTING_ZONE_STEP: f64 = 0.1;

/// Relative change below which an adjustment is not worth applying
pub const SIGNIFICANT_CHANGE: f64 = 0.05;

/// Signals feeding the real-time difficulty update
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceIndicators {
    pub form_quality: f64,
    pub fatigue_level: f64,
    /// Absent when no heart-rate sensor is connected
    pub heart_rate_zone: Option<HeartRateZone>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DifficultyAdjustment {
    pub original_difficulty: f64,
    pub new_difficulty: f64,
    pub adjustment_factor: f64,
    /// Rules that fired, in application order
    pub reasons: Vec<String>,
    pub recommended_changes: Vec<String>,
}

impl DifficultyAdjustment {
    pub fn is_significant(&self) -> bool {
        (self.adjustment_factor - 1.0).abs() > SIGNIFICANT_CHANGE
    }
}

/// Real-time difficulty update for the current exercise
pub fn adjust_difficulty(exercise: &ExerciseStep, indicators: &PerformanceIndicators) -> DifficultyAdjustment {
    adjust_from(exercise.difficulty(), indicators)
}

/// Apply the difficulty rules to an explicit starting value
///
/// Rules run in a fixed order (form, fatigue, heart-rate zone) and each
/// one clamps its own result, so later rules see the already-clamped
/// value. The outcome always lies in [0.3, 1.0].
pub fn adjust_from(start: f64, indicators: &PerformanceIndicators) -> DifficultyAdjustment {
    let original = start.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    let form = indicators.form_quality;
    let fatigue = indicators.fatigue_level;
    let mut difficulty = original;
    let mut reasons = Vec::new();

    if form > EXCELLENT_FORM_THRESHOLD {
        difficulty = (difficulty + EXCELLENT_FORM_STEP).min(MAX_DIFFICULTY);
        reasons.push("Excellent form - intensity increased".to_string());
    } else if form < POOR_FORM_THRESHOLD {
        difficulty = (difficulty - POOR_FORM_STEP).max(MIN_DIFFICULTY);
        reasons.push("Form problems detected - intensity reduced".to_string());
    }

    if fatigue > HIGH_FATIGUE_THRESHOLD {
        difficulty = (difficulty - HIGH_FATIGUE_STEP).max(MIN_DIFFICULTY);
        reasons.push("High fatigue - substantial reduction".to_string());
    } else if fatigue < LOW_FATIGUE_THRESHOLD && form > GOOD_FORM_THRESHOLD {
        difficulty = (difficulty + LOW_FATIGUE_STEP).min(MAX_DIFFICULTY);
        reasons.push("Low fatigue with good form - room to progress".to_string());
    }

    match indicators.heart_rate_zone {
        Some(HeartRateZone::Peak) => {
            difficulty = (difficulty - PEAK_ZONE_STEP).max(PEAK_ZONE_FLOOR);
            reasons.push("Peak heart-rate zone reached - intensity reduced".to_string());
        }
        Some(HeartRateZone::Resting) if form > GOOD_FORM_THRESHOLD => {
            difficulty = (difficulty + RESTING_ZONE_STEP).min(MAX_DIFFICULTY);
            reasons.push("Low heart rate with good form - intensity increased".to_string());
        }
        _ => {}
    }

    tracing::debug!(
        "Difficulty {:.2} -> {:.2} ({} rule(s))",
        original,
        difficulty,
        reasons.len()
    );

    DifficultyAdjustment {
        original_difficulty: original,
        new_difficulty: difficulty,
        adjustment_factor: difficulty / original,
        reasons,
        recommended_changes: recommended_changes(difficulty),
    }
}

fn recommended_changes(difficulty: f64) -> Vec<String> {
    let changes: &[&str] = if difficulty > 0.8 {
        &[
            "Increase weight by 10-15%",
            "Add 2-3 repetitions",
            "Increase tempo",
        ]
    } else if difficulty < 0.4 {
        &[
            "Reduce weight by 15-20%",
            "Reduce repetitions by 2-3",
            "Slower, controlled tempo",
        ]
    } else {
        &["Keep current settings"]
    };
    changes.iter().map(|s| s.to_string()).collect()
}

pub const MIN_WORKOUT_INTENSITY: f64 = 0.5;
pub const MAX_WORKOUT_INTENSITY: f64 = 1.5;
/// Intensity assumed when nothing has been observed yet
pub const DEFAULT_WORKOUT_INTENSITY: f64 = 0.5;

/// Workout-level intensity change driven by plateau analysis
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntensityAdjustment {
    pub original_intensity: f64,
    pub adjusted_intensity: f64,
    pub adjustment_factor: f64,
    pub reasons: Vec<String>,
    pub confidence: f64,
}

/// Observed intensity: 70% exertion, 30% form loss
pub fn current_intensity(history: &[PerformanceSnapshot]) -> f64 {
    if history.is_empty() {
        return DEFAULT_WORKOUT_INTENSITY;
    }
    let avg_rpe = mean(history.iter().map(|s| f64::from(s.perceived_exertion)));
    let avg_form = mean(history.iter().map(|s| s.form_quality));
    (avg_rpe / 10.0) * 0.7 + (1.0 - avg_form) * 0.3
}

/// Scale the observed intensity by plateau, form and fatigue factors
///
/// `form_confidence` is the movement provider's confidence in its form
/// assessment; it is averaged with the plateau confidence.
pub fn adjust_workout_intensity(
    history: &[PerformanceSnapshot],
    plateau: &PlateauReport,
    form_quality: f64,
    form_confidence: f64,
) -> IntensityAdjustment {
    let base = current_intensity(history);
    let mut factor = 1.0;
    let mut reasons = Vec::new();

    if plateau.has_plateau {
        factor *= if plateau.confidence >= 0.8 {
            1.15
        } else if plateau.confidence >= 0.6 {
            1.08
        } else {
            1.03
        };
        reasons.push("Plateau breakthrough required".to_string());
    }

    if form_quality < POOR_FORM_THRESHOLD {
        factor *= 0.85;
        reasons.push("Form improvement prioritised".to_string());
    } else if form_quality > EXCELLENT_FORM_THRESHOLD {
        factor *= 1.05;
        reasons.push("Excellent form allows progression".to_string());
    }

    if current_fatigue_level(history) > 0.7 {
        factor *= 0.9;
        reasons.push("Fatigue detected - intensity reduced".to_string());
    }

    IntensityAdjustment {
        original_intensity: base,
        adjusted_intensity: (base * factor).clamp(MIN_WORKOUT_INTENSITY, MAX_WORKOUT_INTENSITY),
        adjustment_factor: factor,
        reasons,
        confidence: ((plateau.confidence + form_confidence) * 0.5).clamp(0.0, 1.0),
    }
}
