//! Test identifiers and the catalog of browser-driven test scripts.
//!
//! A [`TestId`] is the bare script stem (`test07`); the catalog maps it to a
//! script on disk and records which tests must pass before it may run.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Prefix shared by numbered test scripts.
pub const NUMBERED_PREFIX: &str = "test";

/// Identifier of one runnable test script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// Creates an identifier from a bare name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Normalises operator input such as `test07.js` or `test/test07.js`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let file_name = Path::new(trimmed).file_name()?.to_str()?;
        let stem = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };
        if stem.is_empty() {
            return None;
        }
        Some(Self(stem.to_string()))
    }

    /// Builds the identifier for the numbered convention `test<NN>`.
    pub fn numbered(number: u32) -> Self {
        Self(format!("{}{:02}", NUMBERED_PREFIX, number))
    }

    /// Returns `NN` for identifiers of the form `test<NN>`.
    pub fn number(&self) -> Option<u32> {
        let digits = self.0.strip_prefix(NUMBERED_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared prerequisites: test -> tests that must succeed first.
pub type DependencyMap = BTreeMap<TestId, Vec<TestId>>;

/// Where scripts live and how identifiers map onto them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLayout {
    /// Directory holding the scripts.
    pub script_dir: PathBuf,
    /// Script file extension without the leading dot.
    pub extension: String,
}

impl ScriptLayout {
    /// Creates a layout rooted at `script_dir`.
    pub fn new(script_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            script_dir: script_dir.into(),
            extension: extension.into(),
        }
    }

    /// Resolves the script path backing `id`.
    pub fn script_path(&self, id: &TestId) -> PathBuf {
        if self.extension.is_empty() {
            self.script_dir.join(id.as_str())
        } else {
            self.script_dir
                .join(format!("{}.{}", id.as_str(), self.extension))
        }
    }

    /// Returns true if the script backing `id` exists.
    pub fn exists(&self, id: &TestId) -> bool {
        self.script_path(id).is_file()
    }
}

/// Ordered list of tests plus their declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Tests in catalog order.
    pub tests: Vec<TestId>,
    /// Declared prerequisites.
    #[serde(default)]
    pub dependencies: DependencyMap,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::canonical()
    }
}

impl Catalog {
    /// Creates a catalog from explicit parts.
    pub fn new(tests: Vec<TestId>, dependencies: DependencyMap) -> Self {
        Self {
            tests,
            dependencies,
        }
    }

    /// The VoteSmash suite: `test01`..`test10`, with the tour flow chained
    /// `test05 -> test07 -> test08`.
    pub fn canonical() -> Self {
        let tests = (1..=10).map(TestId::numbered).collect();
        let mut dependencies = DependencyMap::new();
        dependencies.insert(TestId::numbered(7), vec![TestId::numbered(5)]);
        dependencies.insert(TestId::numbered(8), vec![TestId::numbered(7)]);
        Self {
            tests,
            dependencies,
        }
    }

    /// Returns the declared dependencies of `id` (empty if none).
    pub fn dependencies_of(&self, id: &TestId) -> &[TestId] {
        self.dependencies
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if `id` is part of this catalog.
    pub fn contains(&self, id: &TestId) -> bool {
        self.tests.contains(id)
    }

    /// Highest `NN` among the catalogued `test<NN>` identifiers.
    pub fn highest_number(&self) -> Option<u32> {
        self.tests.iter().filter_map(TestId::number).max()
    }

    /// Returns identifiers that appear more than once, in first-seen order.
    pub fn duplicates(&self) -> Vec<TestId> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for id in &self.tests {
            if !seen.insert(id) && !dupes.contains(id) {
                dupes.push(id.clone());
            }
        }
        dupes
    }

    /// Returns `(test, dependency)` pairs whose dependency is not catalogued.
    pub fn unknown_dependencies(&self) -> Vec<(TestId, TestId)> {
        self.dependencies
            .iter()
            .flat_map(|(test, deps)| {
                deps.iter()
                    .filter(|dep| !self.contains(dep))
                    .map(move |dep| (test.clone(), dep.clone()))
            })
            .collect()
    }
}
