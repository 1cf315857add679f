//! Declarative YAML scenarios

use std::path::{Component, Path};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order; the first failure stops the scenario
    pub steps: Vec<Step>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a path (relative to the base URL)
    Goto { path: String },

    /// Check the status of the last navigation
    ExpectStatus { status: u16 },

    /// Check the page title against a regular expression
    ExpectTitle { pattern: String },

    /// Check that exactly one element matches and has the attribute value
    ExpectAttribute {
        selector: String,
        name: String,
        value: String,
    },

    /// Capture the page into the scenario's output directory
    Screenshot {
        path: String,
        #[serde(default = "default_full_page")]
        full_page: bool,
    },
}

fn default_full_page() -> bool {
    true
}

impl Step {
    /// Short label used in logs and reports
    pub fn label(&self) -> String {
        match self {
            Step::Goto { path } => format!("goto:{}", path),
            Step::ExpectStatus { status } => format!("expect_status:{}", status),
            Step::ExpectTitle { pattern } => format!("expect_title:{}", pattern),
            Step::ExpectAttribute { selector, name, .. } => format!("expect_attribute:{}[{}]", selector, name),
            Step::Screenshot { path, .. } => format!("screenshot:{}", path),
        }
    }
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::Scenario(format!("{}: {}", path.display(), e)))
    }

    /// Load one file, or every `.yaml`/`.yml` file under a directory
    pub fn load_all(path: &Path) -> E2eResult<Vec<Self>> {
        if !path.exists() {
            return Err(E2eError::Scenario(format!("{}: no such file or directory", path.display())));
        }
        if path.is_file() {
            return Ok(vec![Self::from_file(path)?]);
        }

        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(path) {
            let entry = entry.map_err(|e| E2eError::Scenario(format!("{}: {}", path.display(), e)))?;
            let is_yaml = entry
                .path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if is_yaml && entry.file_type().is_file() {
                entries.push(entry.into_path());
            }
        }
        entries.sort();

        let mut scenarios = Vec::new();
        for entry in entries {
            scenarios.push(Self::from_file(&entry)?);
        }

        let mut names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(E2eError::Scenario(format!("duplicate scenario name: {}", dup[0])));
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Reject scenarios that can never pass
    pub fn validate(&self) -> E2eResult<()> {
        let invalid = |msg: String| Err(E2eError::Scenario(format!("{}: {}", self.name, msg)));

        if self.name.trim().is_empty() {
            return Err(E2eError::Scenario("scenario name must not be empty".to_string()));
        }
        // the name doubles as the output subdirectory
        if !is_relative_file(&self.name) || self.name.contains(['/', '\\']) {
            return invalid("name must be a single path segment".to_string());
        }
        if self.steps.is_empty() {
            return invalid("no steps".to_string());
        }

        let mut navigated = false;
        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            match step {
                Step::Goto { path } => {
                    if path.is_empty() {
                        return invalid(format!("step {}: empty path", n));
                    }
                    navigated = true;
                    continue;
                }
                _ if !navigated => {
                    return invalid(format!("step {} ({}) runs before any goto", n, step.label()));
                }
                Step::ExpectStatus { status } => {
                    if !(100..=599).contains(status) {
                        return invalid(format!("step {}: {} is not an HTTP status", n, status));
                    }
                }
                Step::ExpectTitle { pattern } => {
                    if let Err(e) = Regex::new(pattern) {
                        return invalid(format!("step {}: invalid title pattern: {}", n, e));
                    }
                }
                Step::ExpectAttribute { selector, name, .. } => {
                    if selector.trim().is_empty() || name.trim().is_empty() {
                        return invalid(format!("step {}: selector and attribute name are required", n));
                    }
                }
                Step::Screenshot { path, .. } => {
                    if !is_relative_file(path) {
                        return invalid(format!(
                            "step {}: screenshot path must be relative and stay inside the output directory: {}",
                            n, path
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_relative_file(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}
