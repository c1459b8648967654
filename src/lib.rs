//! VoteSmash E2E harness
//!
//! Orchestrates the VoteSmash browser test suite: resolves test dependencies,
//! runs each script as a child process, classifies its output, and appends
//! every outcome to a single run log.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod log_sink;
pub mod mode;
pub mod outcome;
pub mod resolver;
pub mod runner;

pub use catalog::{Catalog, DependencyMap, ScriptLayout, TestId};
pub use config::{BrowserConfig, HarnessConfig, Validate, ValidationResult};
pub use controller::{RunController, RunScope, RunState, RunSummary, TestState};
pub use error::{Error, Result};
pub use executor::{InterpreterExecutor, ScriptExecutor, ScriptOutput};
pub use log_sink::{format_step, LogSink, StepKind};
pub use mode::{select_mode, Mode, ModeInputs, Prompt, StdinPrompt};
pub use outcome::{classify, Classification, Outcome, RunRecord};
pub use resolver::resolve;
pub use runner::TestRunner;
