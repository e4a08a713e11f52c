//! Trend statistics over a window of performance samples.
//!
//! All functions are pure: the same slice always yields bit-identical
//! results.

use crate::fatigue::mean;
use crate::{PerformanceRecord, PerformanceSnapshot, PerformanceTrend};
use serde::{Deserialize, Serialize};

/// Number of samples at each end of the window compared by form trend
pub const FORM_TREND_WINDOW: usize = 3;

/// Shift in mean form or fatigue that counts as a real change
pub const TREND_SHIFT_THRESHOLD: f64 = 0.1;

/// The progression metrics trend analysis needs from one sample
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrendSample {
    pub weight: f64,
    pub volume: f64,
    pub form_quality: f64,
}

impl From<&PerformanceRecord> for TrendSample {
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            weight: record.weight,
            volume: record.volume,
            form_quality: record.form_quality,
        }
    }
}

impl TrendSample {
    /// Live snapshots only qualify when the host reported weight and volume
    pub fn from_snapshot(snapshot: &PerformanceSnapshot) -> Option<Self> {
        Some(Self {
            weight: snapshot.weight?,
            volume: snapshot.volume?,
            form_quality: snapshot.form_quality,
        })
    }
}

/// The three trend signals consumed by plateau detection
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrendSummary {
    pub progress_trend: f64,
    pub volume_trend: f64,
    pub form_trend: f64,
    pub samples: usize,
}

pub fn analyze(samples: &[TrendSample]) -> TrendSummary {
    TrendSummary {
        progress_trend: progress_trend(samples),
        volume_trend: volume_trend(samples),
        form_trend: form_trend(samples),
        samples: samples.len(),
    }
}

/// Least-squares slope of weight against sample index 1..=n
pub fn progress_trend(samples: &[TrendSample]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, sample) in samples.iter().enumerate() {
        let x = (i + 1) as f64;
        sum_x += x;
        sum_y += sample.weight;
        sum_xy += x * sample.weight;
        sum_x2 += x * x;
    }

    let n = n as f64;
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Relative volume change from the first to the last sample
pub fn volume_trend(samples: &[TrendSample]) -> f64 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() >= 2 && first.volume != 0.0 => {
            (last.volume - first.volume) / first.volume
        }
        _ => 0.0,
    }
}

/// Mean form of the last three samples minus that of the first three
pub fn form_trend(samples: &[TrendSample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let head = &samples[..FORM_TREND_WINDOW.min(samples.len())];
    let tail = &samples[samples.len().saturating_sub(FORM_TREND_WINDOW)..];

    mean(tail.iter().map(|s| s.form_quality)) - mean(head.iter().map(|s| s.form_quality))
}

/// Classify the live window by comparing its newest and oldest snapshots
///
/// Declining when form dropped or fatigue rose by more than the threshold,
/// improving only when both moved the right way. Fewer than three
/// snapshots is always stable.
pub fn performance_trend(history: &[PerformanceSnapshot]) -> PerformanceTrend {
    if history.len() < FORM_TREND_WINDOW {
        return PerformanceTrend::Stable;
    }
    let baseline = &history[..FORM_TREND_WINDOW];
    let recent = &history[history.len() - FORM_TREND_WINDOW..];

    let baseline_form = mean(baseline.iter().map(|s| s.form_quality));
    let recent_form = mean(recent.iter().map(|s| s.form_quality));
    let baseline_fatigue = mean(baseline.iter().map(|s| s.fatigue_measure));
    let recent_fatigue = mean(recent.iter().map(|s| s.fatigue_measure));

    if recent_form < baseline_form - TREND_SHIFT_THRESHOLD
        || recent_fatigue > baseline_fatigue + TREND_SHIFT_THRESHOLD
    {
        PerformanceTrend::Declining
    } else if recent_form > baseline_form + TREND_SHIFT_THRESHOLD
        && recent_fatigue < baseline_fatigue - TREND_SHIFT_THRESHOLD
    {
        PerformanceTrend::Improving
    } else {
        PerformanceTrend::Stable
    }
}

/// How far form has fallen from the first to the newest snapshot
pub fn form_degradation(history: &[PerformanceSnapshot]) -> f64 {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() >= 2 => {
            (first.form_quality - last.form_quality).max(0.0)
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(weight: f64, volume: f64, form: f64) -> TrendSample {
        TrendSample {
            weight,
            volume,
            form_quality: form,
        }
    }

    fn snapshot(form: f64, fatigue: f64) -> PerformanceSnapshot {
        PerformanceSnapshot {
            timestamp: Utc::now(),
            exercise_id: "deadlift".into(),
            form_quality: form,
            perceived_exertion: 6,
            heart_rate: None,
            rep_count: 5,
            movement_speed: 1.0,
            weight: Some(100.0),
            volume: Some(500.0),
            fatigue_measure: fatigue,
        }
    }

    #[test]
    fn test_progress_trend_linear() {
        let samples: Vec<_> = (0..6)
            .map(|i| sample(20.0 + 0.5 * i as f64, 100.0, 0.8))
            .collect();
        assert!((progress_trend(&samples) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_trends_with_too_few_samples() {
        assert_eq!(progress_trend(&[]), 0.0);
        assert_eq!(progress_trend(&[sample(50.0, 100.0, 0.9)]), 0.0);
        assert_eq!(volume_trend(&[sample(50.0, 100.0, 0.9)]), 0.0);
        assert_eq!(form_trend(&[sample(50.0, 100.0, 0.9)]), 0.0);
    }

    #[test]
    fn test_volume_trend_zero_first() {
        let samples = [sample(10.0, 0.0, 0.8), sample(10.0, 50.0, 0.8)];
        assert_eq!(volume_trend(&samples), 0.0);
    }

    #[test]
    fn test_volume_trend_relative_change() {
        let samples = [
            sample(10.0, 200.0, 0.8),
            sample(10.0, 210.0, 0.8),
            sample(10.0, 220.0, 0.8),
        ];
        assert!((volume_trend(&samples) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_form_trend() {
        let forms = [0.9, 0.9, 0.9, 0.75, 0.75, 0.75];
        let samples: Vec<_> = forms.iter().map(|&f| sample(50.0, 100.0, f)).collect();
        assert!((form_trend(&samples) + 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let samples: Vec<_> = [0.91, 0.87, 0.83, 0.86, 0.79, 0.74]
            .iter()
            .enumerate()
            .map(|(i, &f)| sample(60.0 + (i as f64).sqrt(), 480.0 + i as f64 * 7.3, f))
            .collect();

        let first = analyze(&samples);
        let second = analyze(&samples);
        assert_eq!(first.progress_trend.to_bits(), second.progress_trend.to_bits());
        assert_eq!(first.volume_trend.to_bits(), second.volume_trend.to_bits());
        assert_eq!(first.form_trend.to_bits(), second.form_trend.to_bits());
    }

    #[test]
    fn test_performance_trend_classification() {
        let declining: Vec<_> = [0.9, 0.9, 0.9, 0.7, 0.7, 0.7]
            .iter()
            .map(|&f| snapshot(f, 0.2))
            .collect();
        assert_eq!(performance_trend(&declining), PerformanceTrend::Declining);

        let improving: Vec<_> = [(0.6, 0.5), (0.6, 0.5), (0.6, 0.5), (0.8, 0.2), (0.8, 0.2)]
            .iter()
            .map(|&(f, fat)| snapshot(f, fat))
            .collect();
        assert_eq!(performance_trend(&improving), PerformanceTrend::Improving);

        let short = [snapshot(0.9, 0.0), snapshot(0.1, 0.9)];
        assert_eq!(performance_trend(&short), PerformanceTrend::Stable);
    }

    #[test]
    fn test_form_degradation() {
        let history = [snapshot(0.9, 0.1), snapshot(0.85, 0.1), snapshot(0.5, 0.1)];
        assert!((form_degradation(&history) - 0.4).abs() < 1e-9);

        let improving = [snapshot(0.5, 0.1), snapshot(0.9, 0.1)];
        assert_eq!(form_degradation(&improving), 0.0);
    }
}
