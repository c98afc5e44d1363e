use std::path::PathBuf;
use std::time::Duration;

use inframate::actions::ActionContext;
use inframate::config::InframateConfig;
use inframate::{CancelToken, Error, RunOptions};
use tracing::warn;

pub type CmdResult<T> = inframate::Result<(T, i32)>;

/// Flags shared by every subcommand.
pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub run: RunOptions,
}

impl GlobalArgs {
    pub fn load_config(&self) -> inframate::Result<InframateConfig> {
        let path = inframate::config::resolve_path(self.config.as_deref());
        inframate::config::load(&path)
    }

    pub fn context<'a>(&self, config: &'a InframateConfig) -> ActionContext<'a> {
        let mut ctx = ActionContext::new(config);
        ctx.run = self.run.clone();
        ctx.debug = self.verbose;
        ctx
    }
}

/// Confirm a mutating action. `-y` skips the prompt.
pub(crate) fn approve(action: &str, yes: bool) -> inframate::Result<()> {
    if yes {
        return Ok(());
    }

    if !crate::tty::require_tty_for_interactive() {
        return Err(Error::validation_missing_argument(vec!["--yes".to_string()])
            .with_hint(format!("Re-run '{}' with -y to approve without a prompt", action)));
    }

    let answer = crate::tty::prompt(&format!("About to run '{}'. Proceed? [y/N] ", action))?;
    if crate::tty::is_affirmative(&answer) {
        Ok(())
    } else {
        Err(Error::approval_declined(action))
    }
}

/// Per-stage timeout from `--timeout`. Zero would kill every tool on start.
pub(crate) fn timeout_from_secs(seconds: u64) -> inframate::Result<Duration> {
    if seconds == 0 {
        return Err(Error::validation_invalid_argument(
            "timeout",
            "must be at least one second",
            Some(vec![seconds.to_string()]),
        ));
    }
    Ok(Duration::from_secs(seconds))
}

/// Route SIGINT and SIGTERM to the cancel token so running tools are stopped.
/// A second signal exits immediately with status 130.
#[cfg(unix)]
pub(crate) fn install_signal_handlers(token: &CancelToken) {
    use signal_hook::consts::{SIGINT, SIGTERM};

    for signal in [SIGINT, SIGTERM] {
        // Registered first so it sees the flag as it was before this signal.
        let registered = signal_hook::flag::register_conditional_shutdown(signal, 130, token.flag())
            .and_then(|_| signal_hook::flag::register(signal, token.flag()));
        if let Err(e) = registered {
            warn!(signal, error = %e, "failed to register signal handler");
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn install_signal_handlers(_token: &CancelToken) {
    warn!("signal-driven cancellation is not supported on this platform");
}

pub mod config;
pub mod packer;
pub mod scenario;
pub mod terraform;

macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (inframate::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Packer(args) => dispatch!(args, global, packer),
        crate::Commands::Terraform(args) => dispatch!(args, global, terraform),
        crate::Commands::Scenario(args) => dispatch!(args, global, scenario),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
