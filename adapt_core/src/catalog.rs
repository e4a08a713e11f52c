//! Default exercise catalog and equipment-aware alternatives.
//!
//! The catalog maps each known exercise to the exercises that may replace
//! it. It backs the substitution advisor when the host does not supply a
//! catalog of its own.

use crate::provider::ExerciseCatalog;
use crate::types::*;
use crate::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached default catalog - built once and reused across engine instances
static DEFAULT_CATALOG: Lazy<StaticCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static StaticCatalog {
    &DEFAULT_CATALOG
}

/// One catalog exercise and the names of its alternatives
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub exercise: ExerciseStep,
    pub alternatives: Vec<String>,
}

/// In-memory catalog keyed by exercise name
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    pub entries: HashMap<String, CatalogEntry>,
}

impl StaticCatalog {
    pub fn insert(&mut self, exercise: ExerciseStep, alternatives: &[&str]) {
        self.entries.insert(
            exercise.name.clone(),
            CatalogEntry {
                exercise,
                alternatives: alternatives.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ExerciseStep> {
        self.entries.get(name).map(|e| &e.exercise)
    }

    /// Validate the catalog and return a list of errors
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, entry) in &self.entries {
            if entry.exercise.name != *name {
                errors.push(format!(
                    "Exercise key '{}' does not match name '{}'",
                    name, entry.exercise.name
                ));
            }
            for alt in &entry.alternatives {
                if alt == name {
                    errors.push(format!("Exercise '{}' lists itself as alternative", name));
                } else if !self.entries.contains_key(alt) {
                    errors.push(format!(
                        "Exercise '{}' references unknown alternative '{}'",
                        name, alt
                    ));
                }
            }
        }

        errors
    }
}

/// Whether everything an exercise needs is available
fn equipment_available(exercise: &ExerciseStep, available: &[String]) -> bool {
    exercise
        .equipment
        .iter()
        .all(|needed| available.iter().any(|a| a.eq_ignore_ascii_case(needed)))
}

impl ExerciseCatalog for StaticCatalog {
    fn alternatives(&self, exercise: &ExerciseStep, equipment: &[String]) -> Result<Vec<ExerciseStep>> {
        let Some(entry) = self.entries.get(&exercise.name) else {
            tracing::debug!("No catalog entry for {}", exercise.name);
            return Ok(Vec::new());
        };

        Ok(entry
            .alternatives
            .iter()
            .filter_map(|alt| self.get(alt))
            .filter(|alt| equipment_available(alt, equipment))
            .cloned()
            .collect())
    }
}

fn step(
    name: &str,
    kind: ExerciseKind,
    intensity: IntensityLabel,
    description: &str,
    rest_seconds: u32,
    equipment: &[&str],
) -> ExerciseStep {
    ExerciseStep {
        name: name.into(),
        kind,
        intensity: Some(intensity),
        description: description.into(),
        rest_seconds,
        equipment: equipment.iter().map(|s| s.to_string()).collect(),
    }
}

/// Builds the default catalog
///
/// **Note**: prefer `get_default_catalog()`, which returns a cached
/// reference.
pub fn build_default_catalog() -> StaticCatalog {
    use ExerciseKind::*;
    use IntensityLabel::*;

    let mut catalog = StaticCatalog::default();

    // ========================================================================
    // Lower body
    // ========================================================================

    catalog.insert(
        step("back_squat", Strength, Hard, "Barbell back squat", 120, &["barbell", "rack"]),
        &["goblet_squat", "bodyweight_squat"],
    );
    catalog.insert(
        step("goblet_squat", Strength, Medium, "Goblet squat with controlled technique and execution", 90, &["dumbbell"]),
        &["bodyweight_squat"],
    );
    catalog.insert(
        step("bodyweight_squat", Strength, Easy, "Bodyweight squat, focus on technique", 60, &[]),
        &["glute_bridge"],
    );
    catalog.insert(
        step("deadlift", Strength, Hard, "Conventional barbell deadlift", 150, &["barbell"]),
        &["romanian_deadlift", "glute_bridge"],
    );
    catalog.insert(
        step("romanian_deadlift", Strength, Medium, "Dumbbell Romanian deadlift with strict execution", 90, &["dumbbell"]),
        &["glute_bridge"],
    );
    catalog.insert(
        step("glute_bridge", Strength, Easy, "Glute bridge, less demanding hip hinge", 45, &[]),
        &[],
    );

    // ========================================================================
    // Upper body
    // ========================================================================

    catalog.insert(
        step("bench_press", Strength, Hard, "Barbell bench press", 120, &["barbell", "bench"]),
        &["dumbbell_press", "push_up"],
    );
    catalog.insert(
        step("dumbbell_press", Strength, Medium, "Dumbbell floor press with controlled execution", 90, &["dumbbell"]),
        &["push_up"],
    );
    catalog.insert(
        step("push_up", Strength, Medium, "Standard push-up", 60, &[]),
        &["incline_push_up"],
    );
    catalog.insert(
        step("incline_push_up", Strength, Easy, "Incline push-up, simplified technique", 45, &[]),
        &[],
    );
    catalog.insert(
        step("pull_up", Strength, Hard, "Strict pull-up", 120, &["pullup_bar"]),
        &["band_row", "inverted_row"],
    );
    catalog.insert(
        step("inverted_row", Strength, Medium, "Inverted row with clean execution", 75, &["pullup_bar"]),
        &["band_row"],
    );
    catalog.insert(
        step("band_row", Strength, Easy, "Resistance band row, less demanding pull", 45, &["bands"]),
        &[],
    );

    // ========================================================================
    // Conditioning
    // ========================================================================

    catalog.insert(
        step("burpee", Cardio, Hard, "Full burpee", 45, &[]),
        &["squat_thrust", "jumping_jack"],
    );
    catalog.insert(
        step("squat_thrust", Cardio, Medium, "Squat thrust without push-up, focus on execution", 40, &[]),
        &["jumping_jack"],
    );
    catalog.insert(
        step("jumping_jack", Cardio, Easy, "Jumping jacks, lower demand", 30, &[]),
        &[],
    );
    catalog.insert(
        step("hip_cars", Flexibility, Easy, "Hip controlled articular rotations", 30, &[]),
        &[],
    );

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_cached_catalog_matches_built() {
        assert_eq!(
            get_default_catalog().entries.len(),
            build_default_catalog().entries.len()
        );
    }

    #[test]
    fn test_alternatives_filtered_by_equipment() {
        let catalog = build_default_catalog();
        let squat = catalog.get("back_squat").unwrap().clone();

        let none = catalog.alternatives(&squat, &[]).unwrap();
        let names: Vec<_> = none.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["bodyweight_squat"]);

        let with_db = catalog
            .alternatives(&squat, &["Dumbbell".to_string()])
            .unwrap();
        assert_eq!(with_db.len(), 2);
        assert_eq!(with_db[0].name, "goblet_squat");
    }

    #[test]
    fn test_unknown_exercise_has_no_alternatives() {
        let catalog = build_default_catalog();
        let unknown = step("sled_push", ExerciseKind::Strength, IntensityLabel::Hard, "", 90, &["sled"]);
        assert!(catalog.alternatives(&unknown, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_validate_reports_dangling_alternative() {
        let mut catalog = StaticCatalog::default();
        catalog.insert(
            step("a", ExerciseKind::Strength, IntensityLabel::Easy, "", 60, &[]),
            &["missing"],
        );
        assert_eq!(catalog.validate().len(), 1);
    }
}
