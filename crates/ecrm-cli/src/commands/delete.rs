//! Delete command implementation.

use anyhow::Result;
use clap::Args;
use ecrm_registry::DeleteMode;

use super::{GlobalArgs, TargetArgs};

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Delete without asking for confirmation
    #[arg(long)]
    pub force: bool,
}

impl DeleteArgs {
    /// Deletion mode for these arguments.
    pub const fn mode(&self) -> DeleteMode {
        DeleteMode::Delete { force: self.force }
    }
}

/// Runs the delete command.
pub async fn run(global: &GlobalArgs, args: &DeleteArgs) -> Result<()> {
    super::execute(global, &args.target, args.mode()).await
}
