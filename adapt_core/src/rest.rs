//! Adaptive rest-time calculation.

use crate::fatigue::DEFAULT_FATIGUE_LEVEL;
use crate::{ExerciseKind, SetPerformance};
use serde::{Deserialize, Serialize};

pub const MIN_REST_SECONDS: f64 = 30.0;
pub const MAX_REST_SECONDS: f64 = 300.0;

pub const STRENGTH_BASE_REST: f64 = 90.0;
pub const CARDIO_BASE_REST: f64 = 45.0;
pub const FLEXIBILITY_BASE_REST: f64 = 30.0;
pub const DEFAULT_BASE_REST: f64 = 60.0;

/// Extra rest per unit of fatigue
pub const FATIGUE_REST_SLOPE: f64 = 0.8;
pub const POOR_SET_FORM_THRESHOLD: f64 = 0.6;
pub const POOR_FORM_REST_FACTOR: f64 = 1.3;
pub const HIGH_RPE_THRESHOLD: u8 = 8;
pub const HIGH_RPE_REST_FACTOR: f64 = 1.2;
pub const INTENSITY_REST_BASE: f64 = 0.8;
pub const INTENSITY_REST_SLOPE: f64 = 0.4;

/// Target intensity assumed when the plan does not state one
pub const DEFAULT_TARGET_INTENSITY: f64 = 0.5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RestCalculation {
    pub base_rest_seconds: f64,
    pub adjusted_rest_seconds: f64,
    pub fatigue_adjustment: f64,
    pub performance_adjustment: f64,
    pub intensity_adjustment: f64,
    pub reasoning: String,
}

impl RestCalculation {
    /// Rest rounded to whole seconds, for timers
    pub fn seconds(&self) -> u32 {
        self.adjusted_rest_seconds.round() as u32
    }
}

pub fn base_rest_seconds(kind: &ExerciseKind) -> f64 {
    match kind {
        ExerciseKind::Strength => STRENGTH_BASE_REST,
        ExerciseKind::Cardio => CARDIO_BASE_REST,
        ExerciseKind::Flexibility => FLEXIBILITY_BASE_REST,
        ExerciseKind::Other(_) => DEFAULT_BASE_REST,
    }
}

pub fn fatigue_adjustment(fatigue_level: f64) -> f64 {
    1.0 + FATIGUE_REST_SLOPE * fatigue_level
}

/// First matching rule wins: poor form, then high RPE
pub fn performance_adjustment(last_set: &SetPerformance) -> f64 {
    if last_set.form_quality < POOR_SET_FORM_THRESHOLD {
        POOR_FORM_REST_FACTOR
    } else if last_set.perceived_exertion > HIGH_RPE_THRESHOLD {
        HIGH_RPE_REST_FACTOR
    } else {
        1.0
    }
}

pub fn intensity_adjustment(target_intensity: f64) -> f64 {
    INTENSITY_REST_BASE + INTENSITY_REST_SLOPE * target_intensity
}

/// Rest before the next set, clamped to [30, 300] seconds
///
/// Non-finite fatigue or target values fall back to their neutral
/// defaults; a missing target intensity does the same.
pub fn calculate_rest(
    last_set: &SetPerformance,
    fatigue_level: f64,
    target_intensity: Option<f64>,
    kind: &ExerciseKind,
) -> RestCalculation {
    let fatigue = if fatigue_level.is_finite() {
        fatigue_level
    } else {
        DEFAULT_FATIGUE_LEVEL
    };
    let target = target_intensity
        .filter(|t| t.is_finite())
        .unwrap_or(DEFAULT_TARGET_INTENSITY);

    let base = base_rest_seconds(kind);
    let fatigue_adj = fatigue_adjustment(fatigue);
    let performance_adj = performance_adjustment(last_set);
    let intensity_adj = intensity_adjustment(target);

    let raw = base * fatigue_adj * performance_adj * intensity_adj;
    let adjusted = if raw.is_finite() {
        raw.clamp(MIN_REST_SECONDS, MAX_REST_SECONDS)
    } else {
        base
    };

    tracing::debug!(
        "Rest for {}: {:.0}s x {:.2} x {:.2} x {:.2} = {:.1}s",
        kind,
        base,
        fatigue_adj,
        performance_adj,
        intensity_adj,
        adjusted
    );

    RestCalculation {
        base_rest_seconds: base,
        adjusted_rest_seconds: adjusted,
        fatigue_adjustment: fatigue_adj,
        performance_adjustment: performance_adj,
        intensity_adjustment: intensity_adj,
        reasoning: reasoning(fatigue, last_set, target),
    }
}

fn reasoning(fatigue: f64, last_set: &SetPerformance, target: f64) -> String {
    let mut reasons = Vec::new();

    if fatigue > 0.7 {
        reasons.push("high fatigue detected");
    } else if fatigue < 0.3 {
        reasons.push("low fatigue");
    }

    if last_set.form_quality < POOR_SET_FORM_THRESHOLD {
        reasons.push("form needs to recover");
    } else if last_set.perceived_exertion > HIGH_RPE_THRESHOLD {
        reasons.push("high perceived exertion");
    }

    if target > 0.8 {
        reasons.push("high target intensity");
    } else if target < 0.5 {
        reasons.push("moderate target intensity");
    }

    if reasons.is_empty() {
        "Standard rest for this exercise type".to_string()
    } else {
        format!("Adjusted for: {}", reasons.join(", "))
    }
}
