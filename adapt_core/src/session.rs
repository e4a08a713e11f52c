//! Session-scope learning across completed exercises.
//!
//! Performances accumulate for the whole session. Once an exercise is
//! done the aggregator looks at the fatigue and form picture so far and
//! proposes modifications for the exercises that are still ahead.

use crate::fatigue::mean;
use crate::{ExerciseModification, PerformanceSnapshot, SessionTrend};
use serde::{Deserialize, Serialize};

pub const DECLINING_FATIGUE_PROGRESSION: f64 = 0.3;
pub const EXCELLENT_FATIGUE_PROGRESSION: f64 = 0.1;
pub const DECLINING_FORM_THRESHOLD: f64 = 0.5;
pub const EXCELLENT_FORM_THRESHOLD: f64 = 0.8;

pub const DECLINING_WEIGHT_ADJUSTMENT: f64 = -0.1;
pub const DECLINING_REST_MULTIPLIER: f64 = 1.2;
pub const DECLINING_TEMPO_MULTIPLIER: f64 = 0.8;
pub const EXCELLENT_WEIGHT_ADJUSTMENT: f64 = 0.05;
/// Only this many upcoming exercises get an extra rep on an excellent day
pub const EXTRA_REP_EXERCISES: usize = 2;

/// Whole-session intensity shift applied to the rest of the plan
pub const DECLINING_SESSION_ADJUSTMENT: f64 = -0.15;
pub const EXCELLENT_SESSION_ADJUSTMENT: f64 = 0.10;

/// Mean successive form change below which form counts as consistent
pub const CONSISTENT_FORM_MAX_VARIATION: f64 = 0.15;
pub const STRONG_FORM_THRESHOLD: f64 = 0.8;
pub const WEAK_FORM_THRESHOLD: f64 = 0.6;
pub const HARD_SET_RPE: u8 = 8;

/// What the session so far says about the rest of it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionLearning {
    pub fatigue_progression: f64,
    pub average_form: f64,
    pub overall_trend: SessionTrend,
    /// One entry per remaining exercise that should change
    pub adaptations: Vec<ExerciseModification>,
    pub learning_confidence: f64,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub overall_adjustment: f64,
}

/// Mean fatigue of the last third minus mean fatigue of the first third
///
/// Zero when the session is too short to have non-empty thirds.
pub fn fatigue_progression(performances: &[PerformanceSnapshot]) -> f64 {
    let third = performances.len() / 3;
    if performances.len() < 2 || third == 0 {
        return 0.0;
    }
    let first = mean(performances[..third].iter().map(|p| p.fatigue_measure));
    let last = mean(
        performances[performances.len() - third..]
            .iter()
            .map(|p| p.fatigue_measure),
    );
    last - first
}

pub fn classify(fatigue_progression: f64, average_form: f64) -> SessionTrend {
    if fatigue_progression > DECLINING_FATIGUE_PROGRESSION || average_form < DECLINING_FORM_THRESHOLD {
        SessionTrend::Declining
    } else if fatigue_progression < EXCELLENT_FATIGUE_PROGRESSION && average_form > EXCELLENT_FORM_THRESHOLD {
        SessionTrend::Excellent
    } else {
        SessionTrend::Stable
    }
}

pub fn learning_confidence(performance_count: usize) -> f64 {
    match performance_count {
        n if n > 15 => 0.9,
        n if n > 10 => 0.8,
        n if n > 5 => 0.7,
        _ => 0.5,
    }
}

pub fn overall_adjustment(trend: SessionTrend) -> f64 {
    match trend {
        SessionTrend::Declining => DECLINING_SESSION_ADJUSTMENT,
        SessionTrend::Excellent => EXCELLENT_SESSION_ADJUSTMENT,
        SessionTrend::Stable => 0.0,
    }
}

/// Modifications for `remaining` exercises, in plan order
///
/// A stable session leaves the plan alone.
pub fn remaining_adaptations(trend: SessionTrend, remaining: &[String]) -> Vec<ExerciseModification> {
    match trend {
        SessionTrend::Stable => Vec::new(),
        SessionTrend::Declining => remaining
            .iter()
            .map(|id| ExerciseModification {
                exercise_id: id.clone(),
                weight_adjustment: DECLINING_WEIGHT_ADJUSTMENT,
                rep_adjustment: 0,
                rest_time_multiplier: DECLINING_REST_MULTIPLIER,
                tempo_multiplier: DECLINING_TEMPO_MULTIPLIER,
                reason: "Session fatigue rising - lighter, slower, more rest".into(),
            })
            .collect(),
        SessionTrend::Excellent => remaining
            .iter()
            .enumerate()
            .map(|(idx, id)| ExerciseModification {
                exercise_id: id.clone(),
                weight_adjustment: EXCELLENT_WEIGHT_ADJUSTMENT,
                rep_adjustment: if idx < EXTRA_REP_EXERCISES { 1 } else { 0 },
                rest_time_multiplier: 1.0,
                tempo_multiplier: 1.0,
                reason: "Excellent session - small step up".into(),
            })
            .collect(),
    }
}

fn strengths(performances: &[PerformanceSnapshot], average_form: f64) -> Vec<String> {
    let mut found = Vec::new();
    if average_form > STRONG_FORM_THRESHOLD {
        found.push("Excellent movement quality".to_string());
    }
    if performances.len() >= 2 {
        let variation = mean(
            performances
                .windows(2)
                .map(|w| (w[1].form_quality - w[0].form_quality).abs()),
        );
        if variation < CONSISTENT_FORM_MAX_VARIATION {
            found.push("Consistent form throughout the session".to_string());
        }
    }
    found
}

fn improvements(performances: &[PerformanceSnapshot], average_form: f64) -> Vec<String> {
    let mut found = Vec::new();
    if average_form < WEAK_FORM_THRESHOLD {
        found.push("Technique needs attention".to_string());
    }
    let hard_sets = performances
        .iter()
        .filter(|p| p.perceived_exertion > HARD_SET_RPE)
        .count();
    if hard_sets * 2 > performances.len() {
        found.push("Intensity too high for most sets - pace the session".to_string());
    }
    found
}

/// Summarize the session and adapt the exercises still ahead
///
/// An empty session has nothing to learn from and is reported as stable.
pub fn learn(performances: &[PerformanceSnapshot], remaining: &[String]) -> SessionLearning {
    let confidence = learning_confidence(performances.len());
    if performances.is_empty() {
        return SessionLearning {
            fatigue_progression: 0.0,
            average_form: 0.0,
            overall_trend: SessionTrend::Stable,
            adaptations: Vec::new(),
            learning_confidence: confidence,
            strengths: Vec::new(),
            improvements: Vec::new(),
            overall_adjustment: 0.0,
        };
    }

    let progression = fatigue_progression(performances);
    let average_form = mean(performances.iter().map(|p| p.form_quality));
    let trend = classify(progression, average_form);

    tracing::info!(
        "Session learning over {} performances: {:?} (fatigue progression {:.3}, form {:.3})",
        performances.len(),
        trend,
        progression,
        average_form
    );

    SessionLearning {
        fatigue_progression: progression,
        average_form,
        overall_trend: trend,
        adaptations: remaining_adaptations(trend, remaining),
        learning_confidence: confidence,
        strengths: strengths(performances, average_form),
        improvements: improvements(performances, average_form),
        overall_adjustment: overall_adjustment(trend),
    }
}
