use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use inframate::logging::{self, Verbosity};
use inframate::{CancelToken, RunOptions, StderrMode};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, packer, scenario, terraform};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "inframate")]
#[command(version = VERSION)]
#[command(about = "Drive Packer image builds and Terraform provisioning from one config file")]
struct Cli {
    /// Log debug output and run Packer builds in -debug mode
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (defaults to $INFRAMATE_CONFIG, then ./inframate.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write a debug-level log to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Forward tool stderr alongside stdout instead of keeping only its tail
    #[arg(long, global = true)]
    merge_stderr: bool,

    /// Kill a tool that runs longer than this many seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Packer image operations
    Packer(packer::PackerArgs),
    /// Terraform provisioning operations
    Terraform(terraform::TerraformArgs),
    /// Run or list named multi-step scenarios
    Scenario(scenario::ScenarioArgs),
    /// Inspect the resolved configuration
    Config(config::ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    if let Err(err) = logging::init_tracing(verbosity, cli.log_file.as_deref()) {
        let code = output::exit_code_for_error(&err);
        let _ = output::print_result::<serde_json::Value>(Err(err));
        return ExitCode::from(exit_code_to_u8(code));
    }

    let cancel = CancelToken::new();
    commands::install_signal_handlers(&cancel);

    let mut run = RunOptions::default().with_cancel(cancel);
    if cli.merge_stderr {
        run = run.with_stderr(StderrMode::Merge);
    }
    if let Some(seconds) = cli.timeout {
        match commands::timeout_from_secs(seconds) {
            Ok(timeout) => run = run.with_timeout(timeout),
            Err(err) => {
                let code = output::exit_code_for_error(&err);
                let _ = output::print_result::<serde_json::Value>(Err(err));
                return ExitCode::from(exit_code_to_u8(code));
            }
        }
    }

    let global = GlobalArgs {
        config: cli.config,
        verbose: cli.verbose,
        run,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if let Err(err) = &json_result {
        tracing::error!(code = err.code.as_str(), "{}", err.message);
    }
    let _ = output::print_json_result(json_result);

    ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
