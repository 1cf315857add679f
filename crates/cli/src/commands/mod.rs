//! CLI Commands

pub mod inspect;
pub mod list;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use gitea_e2e::{homepage, Scenario};

/// Scenarios from `path`, or the built-in homepage check when no path is given
pub fn load_scenarios(path: Option<&Path>) -> Result<Vec<Scenario>> {
    match path {
        Some(path) => Scenario::load_all(path)
            .with_context(|| format!("loading scenarios from {}", path.display())),
        None => Ok(vec![homepage::scenario()]),
    }
}

/// Apply the `--tag` and `--name` filters
pub fn select(scenarios: Vec<Scenario>, tag: Option<&str>, name: Option<&str>) -> Vec<Scenario> {
    scenarios
        .into_iter()
        .filter(|s| tag.map_or(true, |t| s.tags.iter().any(|st| st == t)))
        .filter(|s| name.map_or(true, |n| s.name == n))
        .collect()
}
