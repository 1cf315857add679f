//! gitea-e2e - Main Entry Point
//!
//! Runs browser smoke checks against a Gitea instance and reports the results.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{inspect, list, run};

/// Gitea E2E smoke checks
#[derive(Parser)]
#[command(name = "gitea-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios (the built-in homepage check by default)
    Run(run::RunArgs),

    /// List available scenarios
    List(list::ListArgs),

    /// Validate a screenshot artifact
    Inspect(inspect::InspectArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run(args) => run::execute(args, cli.format).await,
        Commands::List(args) => list::execute(args, cli.format),
        Commands::Inspect(args) => inspect::execute(args, cli.format),
    };

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(2);
        }
    }
}
