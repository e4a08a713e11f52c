//! File-backed performance history.
//!
//! Recent records are served from both the JSONL journal and the CSV
//! archive, so history survives a rollup.

use crate::provider::PerformanceRepository;
use crate::{PerformanceRecord, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Load records from the last `days` days from both journal and archive
///
/// Records are deduplicated by id (a crash between archive sync and
/// journal rename leaves copies in both) and sorted oldest first.
pub fn load_recent_records(
    journal_path: &Path,
    csv_path: &Path,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<PerformanceRecord>> {
    let cutoff = now - Duration::days(days);
    let mut records = Vec::new();
    let mut seen_ids = HashSet::new();

    for record in crate::journal::read_records(journal_path)? {
        if record.timestamp >= cutoff && seen_ids.insert(record.id) {
            records.push(record);
        }
    }
    let from_journal = records.len();

    for record in crate::csv_rollup::read_archive(csv_path)? {
        if record.timestamp >= cutoff && seen_ids.insert(record.id) {
            records.push(record);
        }
    }

    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    tracing::debug!(
        "Loaded {} records from last {} days ({} journal, {} archive)",
        records.len(),
        days,
        from_journal,
        records.len() - from_journal
    );

    Ok(records)
}

/// `PerformanceRepository` over the journal and archive files
#[derive(Clone, Debug)]
pub struct FileRepository {
    journal_path: PathBuf,
    csv_path: PathBuf,
}

impl FileRepository {
    pub fn new(journal_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            journal_path: journal_path.into(),
            csv_path: csv_path.into(),
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(config.journal_path(), config.archive_path())
    }
}

impl PerformanceRepository for FileRepository {
    fn query_recent(
        &self,
        user_id: &str,
        exercise_id: &str,
        window_days: i64,
    ) -> Result<Vec<PerformanceRecord>> {
        let records = load_recent_records(&self.journal_path, &self.csv_path, window_days, Utc::now())?;
        Ok(records
            .into_iter()
            .filter(|r| r.user_id == user_id && r.exercise_id == exercise_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JsonlSink, RecordSink};
    use uuid::Uuid;

    fn record(user: &str, exercise: &str, days_ago: i64) -> PerformanceRecord {
        PerformanceRecord {
            id: Uuid::new_v4(),
            user_id: user.into(),
            exercise_id: exercise.into(),
            weight: 50.0,
            reps: 8,
            form_quality: 0.8,
            rpe: 7,
            volume: 400.0,
            timestamp: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_window_filters_old_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("performance.jsonl");
        let csv_path = temp_dir.path().join("performance.csv");

        let mut sink = JsonlSink::new(&journal);
        sink.append(&record("u", "row", 1)).unwrap();
        sink.append(&record("u", "row", 3)).unwrap();
        sink.append(&record("u", "row", 40)).unwrap();

        let records = load_recent_records(&journal, &csv_path, 30, Utc::now()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_records_sorted_oldest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("performance.jsonl");
        let csv_path = temp_dir.path().join("performance.csv");

        let mut sink = JsonlSink::new(&journal);
        sink.append(&record("u", "new", 1)).unwrap();
        sink.append(&record("u", "old", 5)).unwrap();

        let records = load_recent_records(&journal, &csv_path, 7, Utc::now()).unwrap();
        assert_eq!(records[0].exercise_id, "old");
        assert_eq!(records[1].exercise_id, "new");
    }

    #[test]
    fn test_deduplication_across_journal_and_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("performance.jsonl");
        let csv_path = temp_dir.path().join("performance.csv");

        let r = record("u", "press", 2);
        JsonlSink::new(&journal).append(&r).unwrap();
        crate::csv_rollup::journal_to_csv_and_archive(&journal, &csv_path).unwrap();
        // Same record journaled again, as after an interrupted rollup
        JsonlSink::new(&journal).append(&r).unwrap();

        let records = load_recent_records(&journal, &csv_path, 7, Utc::now()).unwrap();
        assert_eq!(records.iter().filter(|x| x.id == r.id).count(), 1);
    }

    #[test]
    fn test_repository_filters_user_and_exercise() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("performance.jsonl");
        let csv_path = temp_dir.path().join("performance.csv");

        let mut sink = JsonlSink::new(&journal);
        sink.append(&record("alex", "squat", 1)).unwrap();
        sink.append(&record("alex", "press", 1)).unwrap();
        sink.append(&record("sam", "squat", 1)).unwrap();

        let repo = FileRepository::new(&journal, &csv_path);
        let records = repo.query_recent("alex", "squat", 30).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "alex");
    }
}
