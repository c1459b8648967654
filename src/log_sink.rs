//! Append-only run log.
//!
//! Every component writes through one [`LogSink`]. Records use the shape
//! `<ISO timestamp> | <testId> | <outcome> | <details>`; step lines written
//! by test code use `[<testId> - <stepName>] <marker> <message>`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::catalog::TestId;
use crate::error::{Error, Result};
use crate::outcome::{RunRecord, FAILURE_MARKER, SUCCESS_MARKER};

/// Kind of a step line, which decides the marker that prefixes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Plain progress step, no marker.
    Step,
    /// A check passed.
    Success,
    /// A check failed.
    Failure,
    /// Informational note.
    Info,
    /// Something worth a look that does not fail the test.
    Warning,
}

impl StepKind {
    /// Marker written before the message.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            StepKind::Step => None,
            StepKind::Success => Some(SUCCESS_MARKER),
            StepKind::Failure => Some(FAILURE_MARKER),
            StepKind::Info => Some("ℹ️"),
            StepKind::Warning => Some("⚠️"),
        }
    }
}

/// Formats a step line.
pub fn format_step(test_id: &TestId, step: &str, kind: StepKind, message: &str) -> String {
    match kind.marker() {
        Some(marker) => format!("[{} - {}] {} {}", test_id, step, marker, message),
        None => format!("[{} - {}] {}", test_id, step, message),
    }
}

/// Run-scoped log file.
///
/// The file is opened in append mode for every write so nothing is held in
/// memory between events. There is exactly one writer at a time.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    /// Opens the sink at `path`, creating the log directory if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                tracing::debug!(dir = ?dir, "creating log directory");
                fs::create_dir_all(dir)?;
            }
        }
        Ok(Self { path })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one raw line.
    pub fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Appends a run record. Write failures are reported, never propagated.
    pub fn record(&self, record: &RunRecord) {
        self.append_or_report(&record.to_log_line());
    }

    /// Appends a timestamped note, optionally attributed to a test.
    pub fn note(&self, test_id: Option<&TestId>, message: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = match test_id {
            Some(id) => format!("{} | {} | {}", timestamp, id, message),
            None => format!("{} | {}", timestamp, message),
        };
        self.append_or_report(&line);
    }

    /// Appends a step line.
    pub fn step(&self, test_id: &TestId, step: &str, kind: StepKind, message: &str) {
        self.append_or_report(&format_step(test_id, step, kind, message));
    }

    /// Appends a failure step followed by its `Error:` line.
    pub fn step_error(
        &self,
        test_id: &TestId,
        step: &str,
        message: &str,
        error: &dyn std::fmt::Display,
    ) {
        self.step(test_id, step, StepKind::Failure, message);
        self.append_or_report(&format!("[{} - {}] Error: {}", test_id, step, error));
    }

    /// Writes `value` as pretty JSON next to the log file and returns its path.
    pub fn write_artifact<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let artifact = dir.join(file_name);
        let json = serde_json::to_string_pretty(value).map_err(Error::Summary)?;
        fs::write(&artifact, json)?;
        Ok(artifact)
    }

    fn append_or_report(&self, line: &str) {
        if let Err(e) = self.append(line) {
            tracing::error!(path = ?self.path, error = %e, "failed to append to run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use tempfile::TempDir;

    fn read(sink: &LogSink) -> String {
        fs::read_to_string(sink.path()).unwrap()
    }

    #[test]
    fn open_creates_missing_log_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reports/test_results/test_results.log");

        let sink = LogSink::open(&path).unwrap();

        assert!(path.parent().unwrap().is_dir());
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn records_are_appended_in_order() {
        let temp = TempDir::new().unwrap();
        let sink = LogSink::open(temp.path().join("run.log")).unwrap();

        sink.record(&RunRecord::new(TestId::new("test01"), Outcome::Success, "✅ ok"));
        sink.record(&RunRecord::skipped(TestId::new("test07")));

        let content = read(&sink);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" | test01 | Success | ✅ ok"));
        assert!(lines[1].ends_with(" | test07 | Skipped | Due to failed dependencies"));
    }

    #[test]
    fn existing_log_is_appended_not_truncated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        fs::write(&path, "previous run\n").unwrap();

        let sink = LogSink::open(&path).unwrap();
        sink.append("next run").unwrap();

        assert_eq!(read(&sink), "previous run\nnext run\n");
    }

    #[test]
    fn step_lines_carry_markers() {
        let id = TestId::new("test03");
        assert_eq!(
            format_step(&id, "create tour", StepKind::Step, "Opening form"),
            "[test03 - create tour] Opening form"
        );
        assert_eq!(
            format_step(&id, "create tour", StepKind::Success, "Tour saved"),
            "[test03 - create tour] ✅ Tour saved"
        );
        assert_eq!(
            format_step(&id, "create tour", StepKind::Warning, "Slow page"),
            "[test03 - create tour] ⚠️ Slow page"
        );
    }

    #[test]
    fn step_error_writes_error_line() {
        let temp = TempDir::new().unwrap();
        let sink = LogSink::open(temp.path().join("run.log")).unwrap();

        sink.step_error(
            &TestId::new("test09"),
            "vote",
            "Vote not recorded",
            &"element not found",
        );

        assert_eq!(
            read(&sink),
            "[test09 - vote] ❌ Vote not recorded\n[test09 - vote] Error: element not found\n"
        );
    }

    #[test]
    fn note_is_timestamped() {
        let temp = TempDir::new().unwrap();
        let sink = LogSink::open(temp.path().join("run.log")).unwrap();

        sink.note(Some(&TestId::new("test02")), "File not found");

        let content = read(&sink);
        let parts: Vec<&str> = content.trim_end().split(" | ").collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].ends_with('Z'));
        assert_eq!(parts[1], "test02");
    }

    #[test]
    fn artifact_lands_next_to_log() {
        let temp = TempDir::new().unwrap();
        let sink = LogSink::open(temp.path().join("logs/run.log")).unwrap();

        let path = sink
            .write_artifact("last_run.json", &serde_json::json!({ "passed": 3 }))
            .unwrap();

        assert_eq!(path, temp.path().join("logs/last_run.json"));
        assert!(fs::read_to_string(path).unwrap().contains("\"passed\": 3"));
    }
}
