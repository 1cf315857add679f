//! List Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::output::{print_list, OutputFormat};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Scenario file or directory (default: built-in homepage check)
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Only list scenarios with this tag
    #[arg(short, long)]
    pub tag: Option<String>,
}

pub fn execute(args: ListArgs, format: OutputFormat) -> Result<bool> {
    let scenarios = super::select(
        super::load_scenarios(args.scenarios.as_deref())?,
        args.tag.as_deref(),
        None,
    );
    print_list(&scenarios, format);
    Ok(true)
}
