//! Plateau detection from weighted trend signals.
//!
//! A plateau is scored from three independent signals: flat weight
//! progression, flat volume and deteriorating form. The score doubles as
//! the report's confidence.

use crate::buffer::MIN_SAMPLES;
use crate::provider::PerformanceRepository;
use crate::trend::{self, TrendSample, TrendSummary};
use crate::PerformanceSnapshot;
use serde::{Deserialize, Serialize};

/// Progress slope below which weight is considered flat
pub const PROGRESS_FLAT_THRESHOLD: f64 = 0.01;
/// Relative volume change below which volume is considered flat
pub const VOLUME_FLAT_THRESHOLD: f64 = 0.05;
/// Form trend below which technique is considered deteriorating
pub const FORM_DECLINE_THRESHOLD: f64 = -0.1;

pub const PROGRESS_WEIGHT: f64 = 0.4;
pub const VOLUME_WEIGHT: f64 = 0.3;
pub const FORM_WEIGHT: f64 = 0.3;

/// Score above which a plateau is reported
pub const PLATEAU_THRESHOLD: f64 = 0.6;
/// Score above which corrective actions become aggressive
pub const SEVERE_PLATEAU_THRESHOLD: f64 = 0.8;

/// Which set of corrective actions applies
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlateauTier {
    /// Not enough samples to say anything
    InsufficientData,
    /// Keep going; possibly review technique
    Continue,
    /// Moderate load or volume increase
    Moderate,
    /// Deload, vary the exercise, change frequency
    Aggressive,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlateauReport {
    pub has_plateau: bool,
    pub plateau_score: f64,
    pub confidence: f64,
    pub tier: PlateauTier,
    pub message: String,
    pub recommendation: String,
    pub suggested_actions: Vec<String>,
    pub trends: Option<TrendSummary>,
}

impl PlateauReport {
    /// Degraded-but-valid result for a window below the minimum size
    pub fn insufficient_data() -> Self {
        Self {
            has_plateau: false,
            plateau_score: 0.0,
            confidence: 0.0,
            tier: PlateauTier::InsufficientData,
            message: "More data needed for plateau analysis".into(),
            recommendation: "Continue current strategy and gather more data".into(),
            suggested_actions: vec!["Complete further training sessions".into()],
            trends: None,
        }
    }
}

/// Weighted sum of the three plateau signals
pub fn plateau_score(progress_trend: f64, volume_trend: f64, form_trend: f64) -> f64 {
    let progress = if progress_trend.abs() < PROGRESS_FLAT_THRESHOLD {
        PROGRESS_WEIGHT
    } else {
        0.0
    };
    let volume = if volume_trend.abs() < VOLUME_FLAT_THRESHOLD {
        VOLUME_WEIGHT
    } else {
        0.0
    };
    let form = if form_trend < FORM_DECLINE_THRESHOLD {
        FORM_WEIGHT
    } else {
        0.0
    };

    progress + volume + form
}

/// Score a window of samples for a plateau
pub fn detect(samples: &[TrendSample], exercise_id: &str) -> PlateauReport {
    if samples.len() < MIN_SAMPLES {
        tracing::debug!(
            "Plateau analysis for {} skipped: {} of {} samples",
            exercise_id,
            samples.len(),
            MIN_SAMPLES
        );
        return PlateauReport::insufficient_data();
    }

    let trends = trend::analyze(samples);
    let score = plateau_score(trends.progress_trend, trends.volume_trend, trends.form_trend);
    let has_plateau = score > PLATEAU_THRESHOLD;
    let tier = if score > SEVERE_PLATEAU_THRESHOLD {
        PlateauTier::Aggressive
    } else if has_plateau {
        PlateauTier::Moderate
    } else {
        PlateauTier::Continue
    };

    let recommendation = match tier {
        PlateauTier::Aggressive => "Raise intensity substantially or switch exercise",
        PlateauTier::Moderate => "Increase weight or volume gradually",
        _ if trends.progress_trend < 0.0 => "Review form and technique",
        _ => "Keep the current strategy",
    };

    let suggested_actions: Vec<String> = match tier {
        PlateauTier::Aggressive => vec![
            "Schedule a deload week",
            "Try an exercise variation",
            "Change training frequency",
            "Review nutrition",
        ],
        PlateauTier::Moderate => vec![
            "Add 2.5-5 kg",
            "Add an extra set",
            "Shorten rest between sets",
        ],
        _ => vec!["Continue current progression", "Keep refining technique"],
    }
    .into_iter()
    .map(String::from)
    .collect();

    let message = if has_plateau {
        format!("Training plateau detected for {}", exercise_id)
    } else {
        format!("Good progress on {}", exercise_id)
    };

    tracing::info!(
        "Plateau analysis for {}: score {:.2} ({:?}), progress {:.4}, volume {:.4}, form {:.4}",
        exercise_id,
        score,
        tier,
        trends.progress_trend,
        trends.volume_trend,
        trends.form_trend
    );

    PlateauReport {
        has_plateau,
        plateau_score: score,
        confidence: score,
        tier,
        message,
        recommendation: recommendation.into(),
        suggested_actions,
        trends: Some(trends),
    }
}

/// Plateau analysis on live snapshots, seeded from history when sparse
///
/// Live snapshots without weight and volume cannot contribute. When fewer
/// than the minimum remain, the repository's recent records are placed in
/// front of them. A failing repository is logged and the analysis carries
/// on with live data alone.
pub fn detect_with_history(
    repository: Option<&dyn PerformanceRepository>,
    user_id: &str,
    exercise_id: &str,
    window_days: i64,
    live: &[PerformanceSnapshot],
) -> PlateauReport {
    let live_samples: Vec<TrendSample> = live.iter().filter_map(TrendSample::from_snapshot).collect();

    if live_samples.len() >= MIN_SAMPLES {
        return detect(&live_samples, exercise_id);
    }

    let mut samples = match repository {
        Some(repo) => match repo.query_recent(user_id, exercise_id, window_days) {
            Ok(records) => {
                tracing::debug!(
                    "Seeding plateau analysis for {} with {} historical records",
                    exercise_id,
                    records.len()
                );
                records.iter().map(TrendSample::from).collect()
            }
            Err(e) => {
                tracing::warn!(
                    "Performance history unavailable for {}: {}. Using live data only.",
                    exercise_id,
                    e
                );
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    samples.extend(live_samples);

    detect(&samples, exercise_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, PerformanceRecord, Result};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn sample(weight: f64, volume: f64, form: f64) -> TrendSample {
        TrendSample {
            weight,
            volume,
            form_quality: form,
        }
    }

    struct FailingRepository;

    impl PerformanceRepository for FailingRepository {
        fn query_recent(&self, _: &str, _: &str, _: i64) -> Result<Vec<PerformanceRecord>> {
            Err(Error::CollaboratorUnavailable("database offline".into()))
        }
    }

    struct FixedRepository(Vec<PerformanceRecord>);

    impl PerformanceRepository for FixedRepository {
        fn query_recent(&self, _: &str, _: &str, _: i64) -> Result<Vec<PerformanceRecord>> {
            Ok(self.0.clone())
        }
    }

    fn record(day: i64, weight: f64, form: f64) -> PerformanceRecord {
        PerformanceRecord {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            exercise_id: "bench_press".into(),
            weight,
            reps: 8,
            form_quality: form,
            rpe: 7,
            volume: weight * 8.0,
            timestamp: Utc::now() - Duration::days(10 - day),
        }
    }

    #[test]
    fn test_insufficient_samples_never_plateau() {
        for n in 0..MIN_SAMPLES {
            let samples = vec![sample(50.0, 500.0, 0.2); n];
            let report = detect(&samples, "squat");
            assert!(!report.has_plateau);
            assert_eq!(report.confidence, 0.0);
            assert_eq!(report.tier, PlateauTier::InsufficientData);
        }
    }

    #[test]
    fn test_steady_progress_is_not_plateau() {
        // Weight +0.1 per sample, volume up well over 5%
        let samples: Vec<_> = (0..6)
            .map(|i| sample(40.0 + 0.1 * i as f64, 400.0 + 10.0 * i as f64, 0.85))
            .collect();

        let report = detect(&samples, "squat");
        let trends = report.trends.unwrap();
        assert!(trends.progress_trend.abs() >= PROGRESS_FLAT_THRESHOLD);
        assert!(trends.volume_trend > VOLUME_FLAT_THRESHOLD);
        assert!(report.plateau_score < PROGRESS_WEIGHT);
        assert!(!report.has_plateau);
    }

    #[test]
    fn test_full_plateau_with_form_decline() {
        let forms = [0.9, 0.9, 0.9, 0.75, 0.75, 0.75];
        let samples: Vec<_> = forms.iter().map(|&f| sample(60.0, 600.0, f)).collect();

        let report = detect(&samples, "squat");
        assert!((report.plateau_score - 1.0).abs() < 1e-9);
        assert!(report.has_plateau);
        assert_eq!(report.tier, PlateauTier::Aggressive);
        assert!(report
            .suggested_actions
            .iter()
            .any(|a| a.contains("deload")));
    }

    #[test]
    fn test_moderate_tier() {
        // Flat weight and volume, form unchanged: 0.4 + 0.3
        let samples = vec![sample(60.0, 600.0, 0.8); 5];
        let report = detect(&samples, "squat");
        assert!((report.plateau_score - 0.7).abs() < 1e-9);
        assert!(report.has_plateau);
        assert_eq!(report.tier, PlateauTier::Moderate);
    }

    #[test]
    fn test_declining_progress_flags_technique_review() {
        let samples: Vec<_> = (0..5)
            .map(|i| sample(60.0 - 2.0 * i as f64, 600.0 - 40.0 * i as f64, 0.8))
            .collect();
        let report = detect(&samples, "squat");
        assert!(!report.has_plateau);
        assert_eq!(report.tier, PlateauTier::Continue);
        assert!(report.recommendation.contains("technique"));
    }

    #[test]
    fn test_repository_failure_degrades_gracefully() {
        let report = detect_with_history(Some(&FailingRepository), "u1", "bench_press", 21, &[]);
        assert!(!report.has_plateau);
        assert_eq!(report.confidence, 0.0);
    }

    #[test]
    fn test_history_seeds_sparse_live_data() {
        let records: Vec<_> = (0..6).map(|d| record(d, 80.0, 0.8)).collect();
        let repo = FixedRepository(records);

        let report = detect_with_history(Some(&repo), "u1", "bench_press", 21, &[]);
        assert_eq!(report.trends.unwrap().samples, 6);
        assert!(report.has_plateau);
    }
}
