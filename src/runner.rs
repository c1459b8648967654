//! Runs a single test and turns whatever happens into a [`RunRecord`].

use std::sync::Arc;

use crate::catalog::{ScriptLayout, TestId};
use crate::executor::ScriptExecutor;
use crate::log_sink::{LogSink, StepKind};
use crate::outcome::{classify, process_failure_detail, Outcome, RunRecord};

/// Executes one test identifier at a time.
///
/// Every call to [`TestRunner::run`] appends exactly one run record, whichever
/// path the attempt takes. No error escapes this boundary.
pub struct TestRunner {
    executor: Arc<dyn ScriptExecutor>,
    layout: ScriptLayout,
    sink: LogSink,
}

impl TestRunner {
    /// Creates a runner.
    pub fn new(executor: Arc<dyn ScriptExecutor>, layout: ScriptLayout, sink: LogSink) -> Self {
        Self {
            executor,
            layout,
            sink,
        }
    }

    /// Layout used to resolve script paths.
    pub fn layout(&self) -> &ScriptLayout {
        &self.layout
    }

    /// Run log.
    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    /// Runs `test_id` and returns its finalised record.
    pub async fn run(&self, test_id: &TestId) -> RunRecord {
        let script = self.layout.script_path(test_id);

        if !script.is_file() {
            let detail = format!("File not found: {}", script.display());
            tracing::warn!(test = %test_id, script = ?script, "test script missing");
            self.sink.step(test_id, "validate", StepKind::Failure, &detail);
            return self.finish(RunRecord::new(test_id.clone(), Outcome::Failure, detail));
        }

        self.sink.step(
            test_id,
            "launch",
            StepKind::Step,
            &format!("{} {}", self.executor.name(), script.display()),
        );

        let record = match self.executor.execute(&script).await {
            Ok(output) if output.success() => {
                if let Some(line) = output.stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
                    self.sink.step(
                        test_id,
                        "launch",
                        StepKind::Warning,
                        &format!("Wrote to stderr despite exiting cleanly: {}", line),
                    );
                }
                let classification = classify(&output.stdout);
                RunRecord::new(
                    test_id.clone(),
                    classification.outcome,
                    classification.details(),
                )
            }
            Ok(output) => {
                tracing::debug!(
                    test = %test_id,
                    exit_code = ?output.exit_code,
                    "test exited non-zero"
                );
                RunRecord::new(
                    test_id.clone(),
                    Outcome::Failure,
                    process_failure_detail(&output.stderr, &output.stdout),
                )
            }
            Err(e) => {
                self.sink
                    .step_error(test_id, "launch", "Failed to launch test script", &e);
                RunRecord::new(
                    test_id.clone(),
                    Outcome::Failure,
                    process_failure_detail(&e.to_string(), ""),
                )
            }
        };

        self.finish(record)
    }

    fn finish(&self, record: RunRecord) -> RunRecord {
        tracing::debug!(test = %record.test_id, outcome = %record.outcome, "test finished");
        self.sink.record(&record);
        record
    }
}
