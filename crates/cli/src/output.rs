//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};
use serde::Serialize;

use gitea_e2e::artifact::ScreenshotArtifact;
use gitea_e2e::runner::{StepStatus, TestResult, TestSuiteResult};
use gitea_e2e::Scenario;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for TestResult {
    fn headers() -> Vec<&'static str> {
        vec!["Test", "Result", "Kind", "Attempts", "Duration", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            if self.success { "pass".to_string() } else { "FAIL".to_string() },
            self.failure_kind.map(|k| k.to_string()).unwrap_or_default(),
            self.attempts.to_string(),
            format!("{} ms", self.duration_ms),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

impl TableDisplay for Scenario {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Tags", "Steps", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.tags.join(","),
            self.steps.len().to_string(),
            self.description.clone(),
        ]
    }
}

impl TableDisplay for ScreenshotArtifact {
    fn headers() -> Vec<&'static str> {
        vec!["Path", "Format", "Size", "Bytes", "SHA256"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.path.display().to_string(),
            self.format.clone(),
            format!("{}x{}", self.width, self.height),
            self.bytes.to_string(),
            self.sha256.clone(),
        ]
    }
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            table.add_row(item.row());

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(item).unwrap_or_default());
        }
        OutputFormat::Plain => {
            let row = item.row();
            for (header, value) in T::headers().iter().zip(row.iter()) {
                println!("{}: {}", header, value);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print a suite: the summary table plus per-step detail for failures
pub fn print_suite(suite: &TestSuiteResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(suite).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(suite).unwrap_or_default());
        }
        OutputFormat::Table | OutputFormat::Plain => {
            print_list(&suite.results, format);

            for result in suite.results.iter().filter(|r| !r.success) {
                println!();
                println!("{}", result.name.bold());
                for step in &result.steps {
                    let marker = match step.status {
                        StepStatus::Passed => "✓".green(),
                        StepStatus::Failed => "✗".red(),
                    };
                    println!("  {} {} ({} ms)", marker, step.step_name, step.duration_ms);
                    if let (Some(expected), Some(actual)) = (&step.expected, &step.actual) {
                        println!("      Expected: {}", expected.green());
                        println!("      Received: {}", actual.red());
                    } else if let Some(error) = &step.error {
                        println!("      {}", error);
                    }
                }
            }

            println!();
            let summary = format!(
                "{} passed, {} failed ({} ms)",
                suite.passed, suite.failed, suite.duration_ms
            );
            if suite.success() {
                print_success(&summary);
            } else {
                print_error(&summary);
            }
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}
