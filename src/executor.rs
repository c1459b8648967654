//! Child-process execution of test scripts.
//!
//! [`ScriptExecutor`] is the seam between the orchestrator and the operating
//! system, so the controller can be exercised without launching a browser.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured result of one script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ScriptOutput {
    /// Returns true if the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a test script to completion and captures its output.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Executes `script` and waits for it to exit.
    ///
    /// Returns `Err` only if the process could not be launched; a non-zero
    /// exit is reported through [`ScriptOutput::exit_code`].
    async fn execute(&self, script: &Path) -> Result<ScriptOutput>;

    /// Returns the name of this executor.
    fn name(&self) -> &str;
}

/// Executes scripts through an interpreter such as `node`.
#[derive(Debug, Clone)]
pub struct InterpreterExecutor {
    /// Interpreter binary.
    program: String,
    /// Arguments placed before the script path.
    args: Vec<String>,
    /// Working directory for the child, defaults to the parent's.
    working_dir: Option<PathBuf>,
}

impl Default for InterpreterExecutor {
    fn default() -> Self {
        Self::new("node")
    }
}

impl InterpreterExecutor {
    /// Creates an executor that runs `<program> <script>`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Sets arguments passed to the interpreter before the script path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Sets the working directory for launched scripts.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn command_line(&self, script: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(script.display().to_string());
        parts.join(" ")
    }
}

#[async_trait]
impl ScriptExecutor for InterpreterExecutor {
    async fn execute(&self, script: &Path) -> Result<ScriptOutput> {
        tracing::debug!(command = %self.command_line(script), "launching test script");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| Error::Spawn {
            command: self.command_line(script),
            reason: e.to_string(),
        })?;

        Ok(ScriptOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn name(&self) -> &str {
        &self.program
    }
}
