//! Inspect Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use gitea_e2e::artifact;
use gitea_e2e::E2eError;

use crate::output::{print_error, print_item, OutputFormat};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Screenshot to validate
    pub path: PathBuf,
}

/// Exit status reflects whether the file is a usable screenshot
pub fn execute(args: InspectArgs, format: OutputFormat) -> Result<bool> {
    match artifact::inspect(&args.path) {
        Ok(artifact) => {
            print_item(&artifact, format);
            Ok(true)
        }
        Err(e @ (E2eError::InvalidArtifact { .. } | E2eError::ArtifactWrite { .. })) => {
            print_error(&e.to_string());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
