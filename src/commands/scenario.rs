use clap::{Args, Subcommand};
use serde::Serialize;

use inframate::logging::TracingObserver;
use inframate::scenario::{self, Scenario, ScenarioOutcome};

use super::{approve, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ScenarioArgs {
    #[command(subcommand)]
    command: ScenarioCommand,
}

#[derive(Subcommand)]
enum ScenarioCommand {
    /// Run a named scenario
    Run {
        /// Scenario name (see `scenario list`)
        name: String,
        /// Approve Terraform apply/destroy steps without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// List available scenarios
    List,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ScenarioOutput {
    Run(ScenarioOutcome),
    List(Vec<Scenario>),
}

pub fn run(args: ScenarioArgs, global: &GlobalArgs) -> CmdResult<ScenarioOutput> {
    match args.command {
        ScenarioCommand::Run { name, yes } => {
            let selected = scenario::find(&name)?;
            let config = global.load_config()?;
            let mut ctx = global.context(&config);

            // Approval is asked once, before the first step runs.
            if selected.requires_approval() {
                approve(&format!("scenario {}", selected.name), yes)?;
                ctx.auto_approve = true;
            }

            let outcome = scenario::run(selected, &ctx, &mut TracingObserver)?;
            Ok((ScenarioOutput::Run(outcome), 0))
        }
        ScenarioCommand::List => Ok((ScenarioOutput::List(scenario::SCENARIOS.to_vec()), 0)),
    }
}
