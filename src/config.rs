//! Harness configuration.
//!
//! Settings come from an optional TOML file; anything the file leaves out
//! falls back to the canonical VoteSmash layout. Browser settings are read
//! from the environment because the child scripts read the same variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ScriptLayout};
use crate::error::{Error, Result};
use crate::mode::Mode;
use crate::resolver::resolve;

/// Browsers the test scripts know how to drive.
pub const SUPPORTED_BROWSERS: &[&str] = &["chrome", "firefox"];

/// Top-level harness settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Root every relative path below is resolved against.
    #[serde(default = "default_test_root")]
    pub test_root: PathBuf,
    /// Directory holding the test scripts, relative to `test_root`.
    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,
    /// Script extension without the dot.
    #[serde(default = "default_script_extension")]
    pub script_extension: String,
    /// Interpreter used to launch scripts.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Extra interpreter arguments placed before the script path.
    #[serde(default)]
    pub interpreter_args: Vec<String>,
    /// Run log, relative to `test_root`.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Tests and their dependencies.
    #[serde(default)]
    pub catalog: Catalog,
}

fn default_test_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_script_dir() -> PathBuf {
    PathBuf::from("test")
}

fn default_script_extension() -> String {
    "js".to_string()
}

fn default_interpreter() -> String {
    "node".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("reports/test_results/test_results.log")
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_root: default_test_root(),
            script_dir: default_script_dir(),
            script_extension: default_script_extension(),
            interpreter: default_interpreter(),
            interpreter_args: Vec::new(),
            log_file: default_log_file(),
            catalog: Catalog::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads settings from `path`, or the defaults if no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::debug!("no config file given, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = ?path, tests = config.catalog.tests.len(), "loaded config");
        Ok(config)
    }

    /// Parses settings from a TOML document.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Where scripts are found.
    pub fn script_layout(&self) -> ScriptLayout {
        ScriptLayout::new(
            self.test_root.join(&self.script_dir),
            self.script_extension.clone(),
        )
    }

    /// Validates the settings a run in `mode` depends on.
    ///
    /// Duplicate ids and dependency cycles only block a dependency-ordered
    /// run; single and range runs never resolve dependencies, so for them
    /// those catalog problems are warnings.
    pub fn validate_for(&self, mode: &Mode) -> ValidationResult {
        let mut result = self.validate();
        let catalog = self.catalog.validate();
        match mode {
            Mode::All => result.merge(catalog),
            Mode::Single(_) | Mode::Range { .. } => result.merge(catalog.demoted()),
        }
        result
    }

    /// Absolute-or-relative path of the run log.
    pub fn log_path(&self) -> PathBuf {
        self.test_root.join(&self.log_file)
    }
}

/// WebDriver settings shared with the child scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Application under test.
    pub app_url: String,
    /// Browser name.
    pub browser: String,
    /// Run without a visible window.
    pub headless: bool,
    /// Window size as `width,height`.
    pub window_size: String,
    /// Selenium Grid endpoint; local WebDriver when absent.
    pub remote_url: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:8083/".to_string(),
            browser: "chrome".to_string(),
            headless: false,
            window_size: "1920,1080".to_string(),
            remote_url: None,
        }
    }
}

impl BrowserConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            app_url: non_empty("APP_URL").unwrap_or(defaults.app_url),
            browser: non_empty("BROWSER")
                .map(|b| b.trim().to_lowercase())
                .unwrap_or(defaults.browser),
            headless: lookup("HEADLESS").map_or(defaults.headless, |v| v == "true"),
            window_size: non_empty("WINDOW_SIZE").unwrap_or(defaults.window_size),
            remote_url: non_empty("REMOTE_URL"),
        }
    }

    /// Tally line naming the WebDriver endpoint.
    pub fn grid_description(&self) -> String {
        match &self.remote_url {
            Some(url) => format!("Using Selenium Grid: {}", url),
            None => "Local WebDriver".to_string(),
        }
    }
}

/// Problems found while checking settings before a run.
///
/// Errors stop the run before anything executes; warnings are only logged.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Problems that stop the run.
    pub errors: Vec<String>,
    /// Problems worth reporting that do not stop the run.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// True when nothing blocks the run.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a blocking problem.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Records a non-blocking problem.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Folds `other` into this result.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Reports every blocking problem as a warning instead.
    pub fn demoted(mut self) -> Self {
        self.warnings.append(&mut self.errors);
        self
    }

    /// Warnings if nothing blocks the run, else [`Error::Config`] listing
    /// every error.
    pub fn into_result(self) -> Result<Vec<String>> {
        match self.errors.as_slice() {
            [] => Ok(self.warnings),
            errors => Err(Error::Config(errors.join("; "))),
        }
    }
}

/// Settings that can check themselves before a run.
pub trait Validate {
    /// Collects every problem with these settings.
    fn validate(&self) -> ValidationResult;
}

impl Validate for Catalog {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.tests.is_empty() {
            result.add_warning("catalog has no tests");
        }

        for id in self.duplicates() {
            result.add_error(format!("test '{}' is listed more than once", id));
        }

        for (test, dep) in self.unknown_dependencies() {
            result.add_warning(format!(
                "test '{}' depends on '{}', which is not in the catalog",
                test, dep
            ));
        }

        if let Err(e) = resolve(&self.tests, &self.dependencies) {
            result.add_error(e.to_string());
        }

        result
    }
}

impl Validate for HarnessConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.interpreter.trim().is_empty() {
            result.add_error("interpreter cannot be empty");
        }

        if self.script_extension.starts_with('.') {
            result.add_warning(format!(
                "script_extension '{}' should not start with a dot",
                self.script_extension
            ));
        }

        let script_dir = self.test_root.join(&self.script_dir);
        if !script_dir.is_dir() {
            result.add_warning(format!(
                "script directory {} does not exist, every test will fail",
                script_dir.display()
            ));
        }

        result
    }
}

impl Validate for BrowserConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !SUPPORTED_BROWSERS.contains(&self.browser.as_str()) {
            result.add_warning(format!(
                "unsupported browser '{}', scripts expect one of: {}",
                self.browser,
                SUPPORTED_BROWSERS.join(", ")
            ));
        }

        let parsed: Vec<Option<u32>> = self
            .window_size
            .split(',')
            .map(|part| part.trim().parse().ok())
            .collect();
        if parsed.len() != 2 || parsed.iter().any(Option::is_none) {
            result.add_warning(format!(
                "WINDOW_SIZE '{}' is not in the form width,height",
                self.window_size
            ));
        }

        if !self.app_url.starts_with("http://") && !self.app_url.starts_with("https://") {
            result.add_warning(format!("APP_URL '{}' is not an http(s) URL", self.app_url));
        }

        result
    }
}
