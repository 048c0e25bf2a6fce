//! Scan command implementation.

use anyhow::Result;
use clap::Args;
use ecrm_registry::DeleteMode;

use super::{GlobalArgs, TargetArgs};

/// Arguments for the scan command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Runs the scan command. Nothing is deleted.
pub async fn run(global: &GlobalArgs, args: &ScanArgs) -> Result<()> {
    super::execute(global, &args.target, DeleteMode::DryRun).await
}
