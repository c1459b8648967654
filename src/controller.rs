//! Run controller: drives tests in order and decides skip-vs-run.
//!
//! State is threaded through the loop as a [`RunState`] accumulator rather
//! than held globally, so each step is a plain fold over the execution order.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, TestId};
use crate::error::Result;
use crate::log_sink::StepKind;
use crate::outcome::{Outcome, RunRecord};
use crate::resolver::resolve;
use crate::runner::TestRunner;

/// Lifecycle of one test within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    /// Not reached yet.
    #[default]
    Pending,
    /// Child process in flight.
    Running,
    /// Classified as Success.
    Succeeded,
    /// Classified as Failure.
    Failed,
    /// Not run because a declared dependency failed.
    Skipped,
}

impl From<Outcome> for TestState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => TestState::Succeeded,
            Outcome::Failure => TestState::Failed,
            Outcome::Skipped => TestState::Skipped,
        }
    }
}

/// Accumulated outcomes of a run in progress.
///
/// `failed` includes skipped tests so that their own dependents cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Tests that succeeded, in completion order.
    pub succeeded: Vec<TestId>,
    /// Tests that failed or were skipped, in completion order.
    pub failed: Vec<TestId>,
    /// Subset of `failed` that never ran.
    pub skipped: Vec<TestId>,
}

impl RunState {
    /// Returns true if any of `deps` is already in the failed set.
    pub fn any_failed(&self, deps: &[TestId]) -> bool {
        deps.iter().any(|dep| self.failed.contains(dep))
    }

    /// Folds one finalised record into the state.
    pub fn apply(mut self, record: &RunRecord) -> Self {
        match record.outcome {
            Outcome::Success => self.succeeded.push(record.test_id.clone()),
            Outcome::Failure => self.failed.push(record.test_id.clone()),
            Outcome::Skipped => {
                self.failed.push(record.test_id.clone());
                self.skipped.push(record.test_id.clone());
            }
        }
        self
    }
}

/// Which selection produced a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum RunScope {
    /// Whole catalog in dependency order.
    All,
    /// One named test.
    Single { test: TestId },
    /// Numbered tests in an inclusive range.
    Range { start: u32, end: u32 },
}

impl fmt::Display for RunScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunScope::All => f.write_str("all"),
            RunScope::Single { test } => write!(f, "single {}", test),
            RunScope::Range { start, end } => write!(f, "range {}..={}", start, end),
        }
    }
}

/// Outcome of a whole run, written next to the log and printed as a tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique identifier for this run.
    pub run_id: String,
    /// Selection that produced the run.
    pub scope: RunScope,
    /// Tests that succeeded.
    pub succeeded: Vec<TestId>,
    /// Tests that failed, skipped tests included.
    pub failed: Vec<TestId>,
    /// Tests skipped because of failed dependencies.
    pub skipped: Vec<TestId>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RunSummary {
    fn new(run_id: String, scope: RunScope, state: RunState, duration: Duration) -> Self {
        Self {
            run_id,
            scope,
            succeeded: state.succeeded,
            failed: state.failed,
            skipped: state.skipped,
            duration,
        }
    }

    /// Number of tests accounted for.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns true if nothing failed or was skipped.
    pub fn passed(&self) -> bool {
        self.failed.is_empty()
    }

    /// Process exit code: 0 iff the failed count (skips included) is zero.
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

/// Highest `NN` a range run probes unless the catalog names a higher one.
pub const DEFAULT_RANGE_CEILING: u32 = 99;

/// Iterates an execution order, invoking the runner for each test.
pub struct RunController {
    runner: TestRunner,
    run_id: String,
    range_ceiling: u32,
}

impl RunController {
    /// Creates a controller with a fresh run id.
    pub fn new(runner: TestRunner) -> Self {
        Self {
            runner,
            run_id: uuid::Uuid::new_v4().to_string(),
            range_ceiling: DEFAULT_RANGE_CEILING,
        }
    }

    /// Lets range runs reach the highest numbered test in `catalog`.
    ///
    /// The ceiling never drops below [`DEFAULT_RANGE_CEILING`], so scripts
    /// that exist on disk but are missing from the catalog still run.
    pub fn with_catalog_ceiling(mut self, catalog: &Catalog) -> Self {
        self.range_ceiling = catalog
            .highest_number()
            .map_or(DEFAULT_RANGE_CEILING, |n| n.max(DEFAULT_RANGE_CEILING));
        self
    }

    /// Identifier of the run this controller drives.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Underlying test runner.
    pub fn runner(&self) -> &TestRunner {
        &self.runner
    }

    /// Runs the whole catalog in dependency order with cascade skipping.
    ///
    /// Fails only if the dependency graph cannot be resolved, in which case
    /// no test is executed.
    pub async fn run_all(&self, catalog: &Catalog) -> Result<RunSummary> {
        let order = resolve(&catalog.tests, &catalog.dependencies)?;
        self.begin(&RunScope::All, order.len());

        let start = Instant::now();
        let mut state = RunState::default();

        for test_id in &order {
            state = self.step(state, test_id, catalog.dependencies_of(test_id)).await;
        }

        Ok(self.finish(RunScope::All, state, start.elapsed()))
    }

    /// Runs one test, ignoring dependencies.
    pub async fn run_single(&self, test_id: &TestId) -> RunSummary {
        let scope = RunScope::Single {
            test: test_id.clone(),
        };
        self.begin(&scope, 1);

        let start = Instant::now();
        let record = self.runner.run(test_id).await;
        let state = RunState::default().apply(&record);

        self.finish(scope, state, start.elapsed())
    }

    /// Runs `test<NN>` for every NN in `start..=end` whose script exists.
    ///
    /// Dependencies are not consulted. Missing numbers are passed over
    /// silently and an inverted range runs nothing. `end` is capped at the
    /// range ceiling.
    pub async fn run_range(&self, start_num: u32, end_num: u32) -> RunSummary {
        let scope = RunScope::Range {
            start: start_num,
            end: end_num,
        };
        let last = end_num.min(self.range_ceiling);
        if last < end_num {
            tracing::debug!(end = end_num, ceiling = last, "capping range end");
        }
        let selected: Vec<TestId> = (start_num..=last)
            .map(TestId::numbered)
            .filter(|id| {
                let exists = self.runner.layout().exists(id);
                if !exists {
                    tracing::debug!(test = %id, "no script for numbered test, passing over");
                }
                exists
            })
            .collect();
        self.begin(&scope, selected.len());

        let start = Instant::now();
        let mut state = RunState::default();
        for test_id in &selected {
            let record = self.runner.run(test_id).await;
            state = state.apply(&record);
        }

        self.finish(scope, state, start.elapsed())
    }

    /// Advances one test: skip if a dependency already failed, otherwise run.
    async fn step(&self, state: RunState, test_id: &TestId, deps: &[TestId]) -> RunState {
        if state.any_failed(deps) {
            let failed: Vec<&str> = deps
                .iter()
                .filter(|dep| state.failed.contains(dep))
                .map(TestId::as_str)
                .collect();
            tracing::debug!(test = %test_id, failed = ?failed, "skipping, a dependency failed");
            self.runner.sink().step(
                test_id,
                "dependencies",
                StepKind::Info,
                &format!("Not running, failed dependencies: {}", failed.join(", ")),
            );
            let record = RunRecord::skipped(test_id.clone());
            self.runner.sink().record(&record);
            return state.apply(&record);
        }

        tracing::debug!(test = %test_id, state = ?TestState::Running, "running test");
        let record = self.runner.run(test_id).await;
        tracing::debug!(test = %test_id, state = ?TestState::from(record.outcome), "test settled");
        state.apply(&record)
    }

    fn begin(&self, scope: &RunScope, planned: usize) {
        tracing::debug!(run_id = %self.run_id, scope = %scope, planned, "test run started");
        self.runner.sink().note(
            None,
            &format!(
                "Test Run Started | run {} | {} | {} planned",
                self.run_id, scope, planned
            ),
        );
    }

    fn finish(&self, scope: RunScope, state: RunState, duration: Duration) -> RunSummary {
        let summary = RunSummary::new(self.run_id.clone(), scope, state, duration);
        self.runner.sink().note(
            None,
            &format!(
                "Test Run Finished | run {} | passed {} | failed {} | skipped {} | {:.2}s",
                summary.run_id,
                summary.succeeded.len(),
                summary.failed.len(),
                summary.skipped.len(),
                duration.as_secs_f64()
            ),
        );
        tracing::debug!(
            run_id = %summary.run_id,
            passed = summary.succeeded.len(),
            failed = summary.failed.len(),
            "test run finished"
        );
        summary
    }
}
