//! Rollup of the JSONL journal into the long-term CSV archive.
//!
//! The CSV is fsynced before the journal is moved aside, so a crash in
//! between leaves records duplicated (and deduplicated on read) rather
//! than lost.

use crate::{Error, PerformanceRecord, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// One archived record as stored in the CSV file
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    id: String,
    user_id: String,
    exercise_id: String,
    timestamp: String,
    weight: f64,
    reps: i32,
    form_quality: f64,
    rpe: u8,
    volume: f64,
}

impl From<&PerformanceRecord> for CsvRow {
    fn from(record: &PerformanceRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            user_id: record.user_id.clone(),
            exercise_id: record.exercise_id.clone(),
            timestamp: record.timestamp.to_rfc3339(),
            weight: record.weight,
            reps: record.reps,
            form_quality: record.form_quality,
            rpe: record.rpe,
            volume: record.volume,
        }
    }
}

impl TryFrom<CsvRow> for PerformanceRecord {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id).map_err(|e| Error::Other(format!("Invalid UUID: {}", e)))?;
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| Error::Other(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(PerformanceRecord {
            id,
            user_id: row.user_id,
            exercise_id: row.exercise_id,
            weight: row.weight,
            reps: row.reps,
            form_quality: row.form_quality,
            rpe: row.rpe,
            volume: row.volume,
            timestamp,
        })
    }
}

/// Roll up journal records into the CSV archive and move the journal aside
///
/// 1. Reads all records from the journal
/// 2. Appends them to the CSV (writing headers for a new file)
/// 3. Syncs the CSV to disk
/// 4. Renames the journal to `<name>.processed`
///
/// Returns the number of records archived.
pub fn journal_to_csv_and_archive(journal_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = crate::journal::read_records(journal_path)?;

    if records.is_empty() {
        tracing::info!("No records in journal to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(csv_path)?;
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);
    for record in &records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Archived {} records to {:?}", records.len(), csv_path);

    let processed_path = processed_path(journal_path);
    std::fs::rename(journal_path, &processed_path)?;
    tracing::info!("Moved journal to {:?}", processed_path);

    Ok(records.len())
}

fn processed_path(journal_path: &Path) -> std::path::PathBuf {
    let mut name = journal_path.as_os_str().to_owned();
    name.push(".processed");
    name.into()
}

/// Read every record from the CSV archive, skipping malformed rows
pub fn read_archive(path: &Path) -> Result<Vec<PerformanceRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result.map_err(Error::from).and_then(PerformanceRecord::try_from) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping archive row: {}", e),
        }
    }
    Ok(records)
}

/// Remove rolled-up journals from `dir`
pub fn cleanup_processed_journals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed journal: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed journals", count);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JsonlSink, RecordSink};
    use std::fs::File;

    fn record(exercise: &str) -> PerformanceRecord {
        PerformanceRecord {
            id: Uuid::new_v4(),
            user_id: "default".into(),
            exercise_id: exercise.into(),
            weight: 40.0,
            reps: 10,
            form_quality: 0.8,
            rpe: 6,
            volume: 400.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_rollup_creates_archive_and_moves_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("performance.jsonl");
        let csv_path = temp_dir.path().join("performance.csv");

        let mut sink = JsonlSink::new(&journal);
        for name in ["row", "press", "squat"] {
            sink.append(&record(name)).unwrap();
        }

        assert_eq!(journal_to_csv_and_archive(&journal, &csv_path).unwrap(), 3);
        assert!(!journal.exists());
        assert!(temp_dir.path().join("performance.jsonl.processed").exists());

        let archived = read_archive(&csv_path).unwrap();
        assert_eq!(archived.len(), 3);
        assert_eq!(archived[2].exercise_id, "squat");
    }

    #[test]
    fn test_second_rollup_appends_without_headers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("performance.jsonl");
        let csv_path = temp_dir.path().join("performance.csv");

        JsonlSink::new(&journal).append(&record("row")).unwrap();
        journal_to_csv_and_archive(&journal, &csv_path).unwrap();
        JsonlSink::new(&journal).append(&record("press")).unwrap();
        journal_to_csv_and_archive(&journal, &csv_path).unwrap();

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_empty_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("empty.jsonl");
        File::create(&journal).unwrap();

        let count = journal_to_csv_and_archive(&journal, &temp_dir.path().join("p.csv")).unwrap();
        assert_eq!(count, 0);
        assert!(journal.exists());
    }

    #[test]
    fn test_cleanup_processed_journals() {
        let temp_dir = tempfile::tempdir().unwrap();
        File::create(temp_dir.path().join("a.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("b.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("keep.jsonl")).unwrap();

        assert_eq!(cleanup_processed_journals(temp_dir.path()).unwrap(), 2);
        assert!(temp_dir.path().join("keep.jsonl").exists());
    }
}
