use clap::{Args, Subcommand};

use inframate::actions::{self, Step, StepOutcome};
use inframate::logging::TracingObserver;
use inframate::packer::PackerAction;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct PackerArgs {
    #[command(subcommand)]
    command: PackerCommand,
}

#[derive(Subcommand)]
enum PackerCommand {
    /// Validate the Packer template
    Validate,
    /// Inspect the Packer template
    Inspect,
    /// Build the image (runs in -debug mode with --verbose)
    Build,
    /// Roll back to a previous image
    Rollback,
    /// List built images carrying the configured prefix
    Images,
}

impl PackerCommand {
    fn action(&self) -> PackerAction {
        match self {
            PackerCommand::Validate => PackerAction::Validate,
            PackerCommand::Inspect => PackerAction::Inspect,
            PackerCommand::Build => PackerAction::Build,
            PackerCommand::Rollback => PackerAction::Rollback,
            PackerCommand::Images => PackerAction::Images,
        }
    }
}

pub fn run(args: PackerArgs, global: &GlobalArgs) -> CmdResult<StepOutcome> {
    let config = global.load_config()?;
    let ctx = global.context(&config);

    let outcome = actions::execute(Step::Packer(args.command.action()), &ctx, &mut TracingObserver)?;
    Ok((outcome, 0))
}
