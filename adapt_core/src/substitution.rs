//! Exercise substitution for persistent, severe performance issues.
//!
//! Substitution is deliberately rare: nothing is proposed unless at least
//! one issue is rated `High` or worse.

use crate::fatigue::current_fatigue_level;
use crate::intensity::{HIGH_FATIGUE_THRESHOLD, POOR_FORM_THRESHOLD};
use crate::provider::ExerciseCatalog;
use crate::{
    ExerciseKind, ExerciseStep, IntensityLabel, Issue, IssueKind, IssueSeverity,
    PerformanceSnapshot,
};
use serde::{Deserialize, Serialize};

/// Extra rest granted by the simplified variant
pub const SIMPLIFIED_EXTRA_REST: u32 = 10;
/// Extra rest granted by a lower-demand alternative
pub const LOWER_DEMAND_EXTRA_REST: u32 = 20;

/// RPE above which exertion is reported as an issue
pub const ISSUE_RPE_THRESHOLD: u8 = 8;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSubstitution {
    pub original: ExerciseStep,
    pub substitute: ExerciseStep,
    /// Descriptions of the issues that triggered the substitution
    pub reason: String,
    pub expected_benefit: f64,
    pub confidence: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Simplified,
    LowerDemand,
}

struct Candidate {
    exercise: ExerciseStep,
    origin: Origin,
}

/// Issues visible in the live window
///
/// Poor form on the latest observation is a high-severity form issue;
/// high exertion is a medium fatigue issue, raised to high when the
/// trailing fatigue level is also high.
pub fn detect_issues(history: &[PerformanceSnapshot]) -> Vec<Issue> {
    let Some(latest) = history.last() else {
        return Vec::new();
    };
    let mut issues = Vec::new();

    if latest.form_quality < POOR_FORM_THRESHOLD {
        issues.push(Issue {
            kind: IssueKind::FormDegradation,
            severity: IssueSeverity::High,
            description: "Significant deterioration of movement quality".into(),
            detection_confidence: 0.9,
        });
    }

    if current_fatigue_level(history) > HIGH_FATIGUE_THRESHOLD {
        issues.push(Issue {
            kind: IssueKind::ExcessiveFatigue,
            severity: IssueSeverity::High,
            description: "Sustained high fatigue".into(),
            detection_confidence: 0.85,
        });
    } else if latest.perceived_exertion > ISSUE_RPE_THRESHOLD {
        issues.push(Issue {
            kind: IssueKind::ExcessiveFatigue,
            severity: IssueSeverity::Medium,
            description: "High perceived exertion".into(),
            detection_confidence: 0.8,
        });
    }

    issues
}

/// Propose a replacement for `current`, or `None` when no issue is severe
///
/// Form problems yield a simplified variant of the same exercise. Fatigue
/// problems yield the catalog's equipment-compatible alternatives, or a
/// generic lower-demand exercise when the catalog has none. With a form
/// issue present, the candidate addressing technique or execution wins;
/// otherwise the first candidate does.
pub fn suggest_substitution(
    current: &ExerciseStep,
    issues: &[Issue],
    equipment: &[String],
    catalog: Option<&dyn ExerciseCatalog>,
) -> Option<ExerciseSubstitution> {
    let critical: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.severity >= IssueSeverity::High)
        .collect();
    if critical.is_empty() {
        return None;
    }

    let has_form_issue = issues.iter().any(|i| i.kind == IssueKind::FormDegradation);
    let has_fatigue_issue = issues.iter().any(|i| i.kind == IssueKind::ExcessiveFatigue);

    let mut candidates = Vec::new();
    if has_form_issue {
        candidates.push(Candidate {
            exercise: simplified_variant(current),
            origin: Origin::Simplified,
        });
    }
    if has_fatigue_issue {
        let from_catalog = match catalog.map(|c| c.alternatives(current, equipment)) {
            Some(Ok(alternatives)) => alternatives,
            Some(Err(e)) => {
                tracing::warn!("Exercise catalog unavailable: {}. Using generic alternative.", e);
                Vec::new()
            }
            None => Vec::new(),
        };
        if from_catalog.is_empty() {
            candidates.push(Candidate {
                exercise: lower_demand_alternative(current),
                origin: Origin::LowerDemand,
            });
        } else {
            candidates.extend(from_catalog.into_iter().map(|mut exercise| {
                exercise.rest_seconds = exercise.rest_seconds.max(current.rest_seconds + LOWER_DEMAND_EXTRA_REST);
                Candidate {
                    exercise,
                    origin: Origin::LowerDemand,
                }
            }));
        }
    }

    let best = if has_form_issue {
        candidates
            .iter()
            .find(|c| addresses_technique(&c.exercise))
            .or_else(|| candidates.first())
    } else {
        candidates.first()
    }?;

    let expected_benefit = match best.origin {
        Origin::Simplified if has_form_issue => 0.8,
        Origin::LowerDemand if has_fatigue_issue => 0.7,
        _ => 0.6,
    };
    let confidence = if best.exercise.kind == current.kind { 0.8 } else { 0.6 };
    let reason = critical
        .iter()
        .map(|i| i.description.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    tracing::info!(
        "Substituting {} with {}: {}",
        current.name,
        best.exercise.name,
        reason
    );

    Some(ExerciseSubstitution {
        original: current.clone(),
        substitute: best.exercise.clone(),
        reason,
        expected_benefit,
        confidence,
    })
}

fn addresses_technique(exercise: &ExerciseStep) -> bool {
    let description = exercise.description.to_lowercase();
    description.contains("technique") || description.contains("execution")
}

fn simplified_variant(current: &ExerciseStep) -> ExerciseStep {
    ExerciseStep {
        name: format!("{} (simplified)", current.name),
        kind: current.kind.clone(),
        intensity: Some(IntensityLabel::Easy),
        description: "Simplified variant focusing on correct technique and execution".into(),
        rest_seconds: current.rest_seconds + SIMPLIFIED_EXTRA_REST,
        equipment: current.equipment.clone(),
    }
}

fn lower_demand_alternative(current: &ExerciseStep) -> ExerciseStep {
    ExerciseStep {
        name: "Alternative: lighter exercise".into(),
        kind: ExerciseKind::Other("alternative".into()),
        intensity: Some(IntensityLabel::Easy),
        description: "Switch to a less demanding exercise".into(),
        rest_seconds: current.rest_seconds + LOWER_DEMAND_EXTRA_REST,
        equipment: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use crate::{Error, Result};
    use chrono::Utc;

    fn bench() -> ExerciseStep {
        build_default_catalog().get("bench_press").unwrap().clone()
    }

    fn issue(kind: IssueKind, severity: IssueSeverity) -> Issue {
        Issue {
            kind,
            severity,
            description: format!("{:?}", kind),
            detection_confidence: 0.9,
        }
    }

    struct OfflineCatalog;

    impl ExerciseCatalog for OfflineCatalog {
        fn alternatives(&self, _: &ExerciseStep, _: &[String]) -> Result<Vec<ExerciseStep>> {
            Err(Error::CollaboratorUnavailable("catalog offline".into()))
        }
    }

    #[test]
    fn test_no_substitution_below_high() {
        let issues = vec![
            issue(IssueKind::FormDegradation, IssueSeverity::Medium),
            issue(IssueKind::ExcessiveFatigue, IssueSeverity::Low),
        ];
        assert!(suggest_substitution(&bench(), &issues, &[], None).is_none());
        assert!(suggest_substitution(&bench(), &[], &[], None).is_none());
    }

    #[test]
    fn test_form_issue_prefers_technique_variant() {
        let issues = vec![
            issue(IssueKind::ExcessiveFatigue, IssueSeverity::High),
            issue(IssueKind::FormDegradation, IssueSeverity::High),
        ];
        let catalog = build_default_catalog();
        let sub = suggest_substitution(&bench(), &issues, &[], Some(&catalog)).unwrap();

        assert!(sub.substitute.description.contains("technique"));
        assert_eq!(sub.substitute.rest_seconds, bench().rest_seconds + SIMPLIFIED_EXTRA_REST);
        assert_eq!(sub.expected_benefit, 0.8);
        assert_eq!(sub.confidence, 0.8);
        assert_eq!(sub.reason, "ExcessiveFatigue, FormDegradation");
    }

    #[test]
    fn test_fatigue_uses_catalog_alternative() {
        let issues = vec![issue(IssueKind::ExcessiveFatigue, IssueSeverity::Critical)];
        let catalog = build_default_catalog();
        let sub = suggest_substitution(&bench(), &issues, &[], Some(&catalog)).unwrap();

        // Without dumbbells only the push-up qualifies
        assert_eq!(sub.substitute.name, "push_up");
        assert_eq!(sub.expected_benefit, 0.7);
        assert_eq!(sub.confidence, 0.8);
        assert!(sub.substitute.rest_seconds >= bench().rest_seconds + LOWER_DEMAND_EXTRA_REST);
    }

    #[test]
    fn test_catalog_failure_falls_back_to_generic() {
        let issues = vec![issue(IssueKind::ExcessiveFatigue, IssueSeverity::High)];
        let sub = suggest_substitution(&bench(), &issues, &[], Some(&OfflineCatalog)).unwrap();

        assert_eq!(sub.substitute.name, "Alternative: lighter exercise");
        assert_eq!(sub.confidence, 0.6);
    }

    #[test]
    fn test_severe_issue_without_candidates() {
        let issues = vec![issue(IssueKind::SafetyConcern, IssueSeverity::Critical)];
        assert!(suggest_substitution(&bench(), &issues, &[], None).is_none());
    }

    #[test]
    fn test_detect_issues_from_window() {
        let snapshot = |form: f64, rpe: u8| PerformanceSnapshot {
            timestamp: Utc::now(),
            exercise_id: "bench_press".into(),
            form_quality: form,
            perceived_exertion: rpe,
            heart_rate: None,
            rep_count: 6,
            movement_speed: 1.0,
            weight: None,
            volume: None,
            fatigue_measure: crate::fatigue::fatigue_measure(form, rpe, 1.0),
        };

        assert!(detect_issues(&[]).is_empty());
        assert!(detect_issues(&[snapshot(0.9, 6)]).is_empty());

        let issues = detect_issues(&[snapshot(0.8, 7), snapshot(0.4, 9)]);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::FormDegradation);
        assert_eq!(issues[0].severity, IssueSeverity::High);
        assert_eq!(issues[1].kind, IssueKind::ExcessiveFatigue);
        assert_eq!(issues[1].severity, IssueSeverity::Medium);
    }
}
