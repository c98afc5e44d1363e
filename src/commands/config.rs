use clap::{Args, Subcommand};
use serde::Serialize;

use inframate::actions::{self, Step};
use inframate::config::InframateConfig;
use inframate::packer::PackerAction;
use inframate::scenario;
use inframate::utils::shell;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display the resolved configuration
    Show,
    /// Print the commands each step would run, without running them
    Commands,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCommand {
    step: Step,
    command: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ConfigOutput {
    Show(InframateConfig),
    Commands(Vec<ResolvedCommand>),
}

pub fn run(args: ConfigArgs, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let config = global.load_config()?;

    match args.command {
        ConfigCommand::Show => Ok((ConfigOutput::Show(config), 0)),
        ConfigCommand::Commands => {
            let ctx = global.context(&config);
            let mut resolved = Vec::new();
            for step in all_steps() {
                let pipeline = actions::resolve(step, &ctx)?;
                let command = pipeline
                    .stages()
                    .iter()
                    .map(|stage| shell::quote_args(stage.tokens()))
                    .collect::<Vec<_>>()
                    .join(" | ");
                resolved.push(ResolvedCommand { step, command });
            }
            Ok((ConfigOutput::Commands(resolved), 0))
        }
    }
}

/// Every step that resolves to a command, in scenario order.
fn all_steps() -> Vec<Step> {
    let mut steps: Vec<Step> = Vec::new();
    for scenario in scenario::SCENARIOS {
        for step in scenario.steps {
            if !steps.contains(step) {
                steps.push(*step);
            }
        }
    }
    steps.push(Step::Packer(PackerAction::Images));
    steps
}
