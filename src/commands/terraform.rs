use clap::{Args, Subcommand};

use inframate::actions::{self, Step, StepOutcome};
use inframate::logging::TracingObserver;
use inframate::terraform::TerraformAction;

use super::{approve, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct TerraformArgs {
    #[command(subcommand)]
    command: TerraformCommand,
}

#[derive(Subcommand)]
enum TerraformCommand {
    /// Initialize the Terraform working directory
    Init,
    /// Write an execution plan
    Plan,
    /// Apply the saved plan
    Apply {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Destroy the managed infrastructure
    Destroy {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

impl TerraformCommand {
    fn action(&self) -> (TerraformAction, bool) {
        match self {
            TerraformCommand::Init => (TerraformAction::Init, false),
            TerraformCommand::Plan => (TerraformAction::Plan, false),
            TerraformCommand::Apply { yes } => (TerraformAction::Apply, *yes),
            TerraformCommand::Destroy { yes } => (TerraformAction::Destroy, *yes),
        }
    }
}

pub fn run(args: TerraformArgs, global: &GlobalArgs) -> CmdResult<StepOutcome> {
    let (action, yes) = args.command.action();
    let config = global.load_config()?;
    let mut ctx = global.context(&config);

    if action.requires_approval() {
        approve(&action.to_string(), yes)?;
        ctx.auto_approve = true;
    }

    let outcome = actions::execute(Step::Terraform(action), &ctx, &mut TracingObserver)?;
    Ok((outcome, 0))
}
