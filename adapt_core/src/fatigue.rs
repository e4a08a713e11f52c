//! Fatigue and recovery scoring.
//!
//! Everything here is a pure function of its inputs. The engine keeps no
//! fatigue state of its own; current fatigue is re-derived from the
//! snapshot buffer whenever it is needed.

use crate::PerformanceSnapshot;
use serde::{Deserialize, Serialize};

/// RPE at which exertion stops lowering the fatigue estimate
pub const RPE_NEUTRAL: f64 = 5.0;

/// Fatigue assumed when there is no observation to derive it from
pub const DEFAULT_FATIGUE_LEVEL: f64 = 0.3;

/// Number of trailing snapshots averaged into the current fatigue level
pub const FATIGUE_WINDOW: usize = 3;

/// Number of trailing intensity samples used for recovery and stress
pub const INTENSITY_WINDOW: usize = 7;

pub const RECOVERY_FATIGUE_WEIGHT: f64 = 0.6;
pub const RECOVERY_INTENSITY_WEIGHT: f64 = 0.4;

/// Exponent applied to each intensity sample for stress accumulation
pub const STRESS_EXPONENT: f64 = 1.5;

/// Composite fatigue for one observation
///
/// `(form_drop + rpe_increase + speed_drop) / 3` where
/// `form_drop = max(0, 1 - form)`, `rpe_increase = (rpe - 5) / 5` and
/// `speed_drop = max(0, 1 - speed)`.
///
/// No clamp is applied. For validated inputs (form in [0, 1], RPE in
/// [1, 10], speed >= 0) the result lies in [-4/15, 1]: the minimum is
/// reached with perfect form, RPE 1 and speed at or above optimal, the
/// maximum with zero form, RPE 10 and zero speed. Low RPE is allowed to
/// pull the estimate below zero.
pub fn fatigue_measure(form_quality: f64, perceived_exertion: u8, movement_speed: f64) -> f64 {
    let form_drop = (1.0 - form_quality).max(0.0);
    let rpe_increase = (f64::from(perceived_exertion) - RPE_NEUTRAL) / RPE_NEUTRAL;
    let speed_drop = (1.0 - movement_speed).max(0.0);

    (form_drop + rpe_increase + speed_drop) / 3.0
}

/// Mean fatigue over the trailing window of the buffer
pub fn current_fatigue_level(history: &[PerformanceSnapshot]) -> f64 {
    if history.is_empty() {
        return DEFAULT_FATIGUE_LEVEL;
    }
    let start = history.len().saturating_sub(FATIGUE_WINDOW);
    mean(history[start..].iter().map(|s| s.fatigue_measure))
}

/// Session readiness: `1 - (0.6 * fatigue + 0.4 * mean recent intensity)`
pub fn recovery_score(current_fatigue: f64, recent_intensity: &[f64]) -> f64 {
    let avg_intensity = mean(trailing(recent_intensity, INTENSITY_WINDOW).iter().copied());
    1.0 - (RECOVERY_FATIGUE_WEIGHT * current_fatigue + RECOVERY_INTENSITY_WEIGHT * avg_intensity)
}

/// Mean of `intensity^1.5` over the trailing window
///
/// The exponent weights sustained high intensity super-linearly.
pub fn stress_accumulation(recent_intensity: &[f64]) -> f64 {
    mean(
        trailing(recent_intensity, INTENSITY_WINDOW)
            .iter()
            .map(|i| i.max(0.0).powf(STRESS_EXPONENT)),
    )
}

/// Rest-day recommendation derived from recovery and stress
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RestDayPrediction {
    pub recommended_rest_days: u32,
    pub recovery_score: f64,
    pub stress_level: f64,
    pub reasoning: String,
    pub next_workout_intensity: f64,
}

/// Predict how many rest days to take before the next session
pub fn predict_rest_days(current_fatigue: f64, recent_intensity: &[f64]) -> RestDayPrediction {
    let recovery = recovery_score(current_fatigue, recent_intensity);
    let stress = stress_accumulation(recent_intensity);

    let (days, reasoning) = if recovery < 0.3 {
        (2, "High fatigue detected - recovery urgently needed")
    } else if recovery < 0.6 {
        (1, "Moderate fatigue - one rest day recommended")
    } else if stress > 0.8 {
        (1, "Accumulated stress too high - take a break")
    } else {
        (0, "Well recovered - training can continue")
    };

    let next_workout_intensity = if recovery < 0.4 {
        0.6
    } else if recovery < 0.7 {
        0.8
    } else {
        1.0
    };

    tracing::debug!(
        "Recovery {:.3}, stress {:.3} -> {} rest day(s)",
        recovery,
        stress,
        days
    );

    RestDayPrediction {
        recommended_rest_days: days,
        recovery_score: recovery,
        stress_level: stress,
        reasoning: reasoning.into(),
        next_workout_intensity,
    }
}

fn trailing(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Arithmetic mean; 0 for an empty sequence
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
