//! Tracing initialization and the log-backed line observer.

use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::Result;
use crate::runner::{CommandSpec, LineObserver};
use crate::utils::io;

/// Target used for lines forwarded from external tools.
pub const OUTPUT_TARGET: &str = "inframate::output";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Verbosity::Verbose,
            (false, true) => Verbosity::Quiet,
            (false, false) => Verbosity::Normal,
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Initialize tracing for the CLI.
///
/// Console output goes to stderr so stdout stays free for the JSON result.
/// `RUST_LOG` overrides the verbosity flags for the console. A log file, when
/// given, always records at debug level.
pub fn init_tracing(verbosity: Verbosity, log_file: Option<&Path>) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity == Verbosity::Verbose)
        .with_filter(console_filter);

    let file = match log_file {
        Some(path) => {
            let handle = io::open_append(path, "open log file")?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(handle))
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => None,
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();

    Ok(())
}

/// Observer that logs every forwarded line at info level.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LineObserver for TracingObserver {
    fn on_line(&mut self, line: &str) {
        info!(target: OUTPUT_TARGET, "{}", line);
    }

    fn on_stage_start(&mut self, stage: usize, command: &CommandSpec) {
        debug!(stage, "executing command < {} >", command);
    }
}
