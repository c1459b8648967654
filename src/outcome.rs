//! Test outcomes, run records, and the marker-based classification rule.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::TestId;

/// Marker a test script prints for a passed check.
pub const SUCCESS_MARKER: &str = "✅";

/// Marker a test script prints for a failed check.
pub const FAILURE_MARKER: &str = "❌";

/// Substrings that flag a line as a failure in addition to [`FAILURE_MARKER`].
pub const FAILURE_SUBSTRINGS: &[&str] = &["Error:", "fail"];

/// Separator used when joining detail lines.
pub const DETAIL_SEPARATOR: &str = " | ";

/// Detail used when a failed process produced no output at all.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Detail recorded for tests skipped because a prerequisite failed.
pub const SKIPPED_DETAIL: &str = "Due to failed dependencies";

/// Terminal outcome of one test attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// At least one success marker and no failure markers.
    Success,
    /// Anything else, including process errors and missing scripts.
    Failure,
    /// Never ran because a declared dependency failed.
    Skipped,
}

impl Outcome {
    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Label written to the run log.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Failure => "Failure",
            Outcome::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of scanning a script's captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Success or Failure.
    pub outcome: Outcome,
    /// Trimmed lines that carried a success marker.
    pub success_details: Vec<String>,
    /// Trimmed lines that carried a failure marker.
    pub failure_details: Vec<String>,
}

impl Classification {
    /// The detail string matching the outcome, joined for the run log.
    pub fn details(&self) -> String {
        match self.outcome {
            Outcome::Success => self.success_details.join(DETAIL_SEPARATOR),
            _ => self.failure_details.join(DETAIL_SEPARATOR),
        }
    }
}

/// Returns true if `line` carries any failure marker.
pub fn is_failure_line(line: &str) -> bool {
    line.contains(FAILURE_MARKER) || FAILURE_SUBSTRINGS.iter().any(|s| line.contains(s))
}

/// Returns true if `line` carries the success marker.
pub fn is_success_line(line: &str) -> bool {
    line.contains(SUCCESS_MARKER)
}

/// Classifies the output of a script that exited cleanly.
///
/// A line is collected independently as a success and a failure detail, so a
/// line carrying both markers counts against the test.
pub fn classify(output: &str) -> Classification {
    let mut success_details = Vec::new();
    let mut failure_details = Vec::new();

    for line in output.lines() {
        if is_success_line(line) {
            success_details.push(line.trim().to_string());
        }
        if is_failure_line(line) {
            failure_details.push(line.trim().to_string());
        }
    }

    let outcome = if !success_details.is_empty() && failure_details.is_empty() {
        Outcome::Success
    } else {
        Outcome::Failure
    };

    Classification {
        outcome,
        success_details,
        failure_details,
    }
}

/// Picks the detail for a process that exited non-zero or failed to spawn.
pub fn process_failure_detail(stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    UNKNOWN_ERROR.to_string()
}

/// Logged outcome of one test attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Test that was attempted.
    pub test_id: TestId,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// When the record was finalised.
    pub timestamp: DateTime<Utc>,
    /// Matched marker lines or error text.
    pub details: String,
}

impl RunRecord {
    /// Creates a record stamped with the current time.
    pub fn new(test_id: TestId, outcome: Outcome, details: impl Into<String>) -> Self {
        Self {
            test_id,
            outcome,
            timestamp: Utc::now(),
            details: details.into(),
        }
    }

    /// Creates a skip record for a test whose dependency failed.
    pub fn skipped(test_id: TestId) -> Self {
        Self::new(test_id, Outcome::Skipped, SKIPPED_DETAIL)
    }

    /// Renders the record as a run log line (without trailing newline).
    pub fn to_log_line(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.test_id,
            self.outcome,
            self.details
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn single_success_line_is_success() {
        let output = "[test01 - login] Navigating\n[test01 - login] ✅ Logged in\n";
        let c = classify(output);
        assert_eq!(c.outcome, Outcome::Success);
        assert_eq!(c.details(), "[test01 - login] ✅ Logged in");
    }

    #[test]
    fn success_and_failure_lines_is_failure() {
        let output = "✅ step one\n❌ step two\n";
        let c = classify(output);
        assert_eq!(c.outcome, Outcome::Failure);
        assert_eq!(c.details(), "❌ step two");
    }

    #[test]
    fn empty_output_is_failure() {
        let c = classify("");
        assert_eq!(c.outcome, Outcome::Failure);
        assert_eq!(c.details(), "");
    }

    #[test]
    fn output_without_markers_is_failure() {
        let c = classify("just some chatter\nmore chatter\n");
        assert_eq!(c.outcome, Outcome::Failure);
    }

    #[test]
    fn error_and_fail_substrings_count_as_failures() {
        let c = classify("✅ created tour\n[test05] Error: timeout\n");
        assert_eq!(c.outcome, Outcome::Failure);
        assert_eq!(c.failure_details, vec!["[test05] Error: timeout"]);

        let c = classify("✅ created tour\nassertion failed\n");
        assert_eq!(c.outcome, Outcome::Failure);
    }

    #[test]
    fn fail_substring_is_case_sensitive() {
        let c = classify("✅ FAILED banner is only uppercase\n");
        assert_eq!(c.outcome, Outcome::Success);
    }

    #[test]
    fn line_with_both_markers_counts_against_test() {
        let c = classify("✅ retried after fail\n");
        assert_eq!(c.outcome, Outcome::Failure);
        assert_eq!(c.success_details.len(), 1);
        assert_eq!(c.failure_details.len(), 1);
    }

    #[test]
    fn success_details_are_trimmed_and_joined() {
        let c = classify("  ✅ one  \r\n✅ two\n");
        assert_eq!(c.outcome, Outcome::Success);
        assert_eq!(c.details(), "✅ one | ✅ two");
    }

    #[test]
    fn process_failure_detail_prefers_stderr() {
        assert_eq!(process_failure_detail(" boom \n", "out"), "boom");
        assert_eq!(process_failure_detail("  ", " out "), "out");
        assert_eq!(process_failure_detail("", ""), UNKNOWN_ERROR);
    }

    #[test]
    fn record_renders_log_line() {
        let record = RunRecord {
            test_id: TestId::new("test07"),
            outcome: Outcome::Skipped,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            details: SKIPPED_DETAIL.to_string(),
        };

        assert_eq!(
            record.to_log_line(),
            "2024-05-01T12:30:00.000Z | test07 | Skipped | Due to failed dependencies"
        );
    }

    #[test]
    fn outcome_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&Outcome::Success).unwrap(),
            "\"Success\""
        );
        assert_eq!(
            serde_json::to_string(&Outcome::Skipped).unwrap(),
            "\"Skipped\""
        );
    }
}
