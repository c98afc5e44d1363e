// Public modules
pub mod actions;
pub mod config;
pub mod error;
pub mod logging;
pub mod packer;
pub mod runner;
pub mod scenario;
pub mod terraform;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use runner::{
    CancelToken, CommandSpec, ExecutionResult, LineObserver, PipelineReport, PipelineRequest,
    RunOptions, StderrMode,
};
