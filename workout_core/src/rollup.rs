//! Rollup of finished sessions into a flat per-set CSV.
//!
//! The finished-session log is appended to on every session end. Rolling up
//! writes one CSV row per logged set, syncs the CSV, and only then renames the
//! log to `.wal.processed` so nothing is lost if the write fails midway.

use crate::checklist::dedup_sets;
use crate::{Result, Session};
use std::fs::OpenOptions;
use std::path::Path;

pub const SETS_CSV_FILE: &str = "sets.csv";

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct SetRow<'a> {
    session_id: String,
    routine_id: Option<&'a str>,
    routine_name: Option<&'a str>,
    session_started_at: String,
    session_ended_at: Option<String>,
    exercise_id: &'a str,
    exercise_name: &'a str,
    position: u32,
    set_index: u32,
    reps: u32,
    weight: Option<f64>,
    band_label: Option<&'a str>,
    completed_at: Option<String>,
}

fn rows(session: &Session) -> Vec<SetRow<'_>> {
    session
        .exercises
        .iter()
        .flat_map(|exercise| {
            dedup_sets(&exercise.exercise_id, &exercise.sets)
                .into_iter()
                .map(move |set| SetRow {
                    session_id: session.id.to_string(),
                    routine_id: session.routine_id.as_deref(),
                    routine_name: session.routine_name.as_deref(),
                    session_started_at: session.started_at.to_rfc3339(),
                    session_ended_at: session.ended_at.map(|t| t.to_rfc3339()),
                    exercise_id: &exercise.exercise_id,
                    exercise_name: &exercise.name,
                    position: exercise.position,
                    set_index: set.set_index,
                    reps: set.reps,
                    weight: set.weight,
                    band_label: set.band_label.as_deref(),
                    completed_at: set.completed_at.map(|t| t.to_rfc3339()),
                })
        })
        .collect()
}

/// Roll up finished sessions into CSV and archive the log
///
/// Returns the number of sessions processed.
pub fn finished_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let sessions = crate::store::read_finished(log_path)?;

    if sessions.is_empty() {
        tracing::info!("No finished sessions to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Header only for a fresh file
    let needs_headers = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    let mut set_count = 0;
    for session in &sessions {
        for row in rows(session) {
            writer.serialize(row)?;
            set_count += 1;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!(
        "Wrote {} sets from {} sessions to CSV",
        set_count,
        sessions.len()
    );

    let processed_path = log_path.with_extension("wal.processed");
    std::fs::rename(log_path, &processed_path)?;
    tracing::info!("Archived finished log to {:?}", processed_path);

    Ok(sessions.len())
}

/// Remove archived `.processed` logs in a directory
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed logs", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{exercise, logged, session, ts};
    use std::fs::File;
    use std::io::Write;

    fn write_log(path: &Path, sessions: &[Session]) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        for s in sessions {
            writeln!(file, "{}", serde_json::to_string(s).unwrap()).unwrap();
        }
    }

    fn finished(sets: usize) -> Session {
        let mut s = session(vec![exercise("bench", 1, 3), exercise("row", 2, 3)]);
        s.exercises[0].sets = (1..=sets as u32).map(|i| logged(i, 8)).collect();
        s.ended_at = Some(ts(1800));
        s
    }

    #[test]
    fn test_rollup_writes_one_row_per_set() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("finished_sessions.wal");
        let csv_path = temp_dir.path().join(SETS_CSV_FILE);
        write_log(&log_path, &[finished(3), finished(1)]);

        let count = finished_to_csv_and_archive(&log_path, &csv_path).unwrap();
        assert_eq!(count, 2);

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "set_index"));
        assert_eq!(reader.records().count(), 4);

        assert!(!log_path.exists());
        assert!(log_path.with_extension("wal.processed").exists());
    }

    #[test]
    fn test_rollup_appends_without_repeating_headers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("finished_sessions.wal");
        let csv_path = temp_dir.path().join(SETS_CSV_FILE);

        write_log(&log_path, &[finished(2)]);
        finished_to_csv_and_archive(&log_path, &csv_path).unwrap();
        write_log(&log_path, &[finished(1)]);
        finished_to_csv_and_archive(&log_path, &csv_path).unwrap();

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 3);
    }

    #[test]
    fn test_duplicate_sets_written_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("finished_sessions.wal");
        let csv_path = temp_dir.path().join(SETS_CSV_FILE);
        let mut s = finished(1);
        let dup = s.exercises[0].sets[0].clone();
        s.exercises[0].sets.push(dup);
        write_log(&log_path, &[s]);

        finished_to_csv_and_archive(&log_path, &csv_path).unwrap();

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 1);
    }

    #[test]
    fn test_missing_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("finished_sessions.wal");
        let csv_path = temp_dir.path().join(SETS_CSV_FILE);

        assert_eq!(finished_to_csv_and_archive(&log_path, &csv_path).unwrap(), 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();
        File::create(temp_dir.path().join("a.wal.processed")).unwrap();
        File::create(temp_dir.path().join("b.wal.processed")).unwrap();
        File::create(temp_dir.path().join("finished_sessions.wal")).unwrap();

        let count = cleanup_processed_wals(temp_dir.path()).unwrap();
        assert_eq!(count, 2);
        assert!(temp_dir.path().join("finished_sessions.wal").exists());
    }
}
