//! Single tool actions: resolve the command, log the banner, run it.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::InframateConfig;
use crate::error::{Error, Result};
use crate::packer::{self, PackerAction};
use crate::runner::{self, LineCollector, LineObserver, PipelineReport, PipelineRequest, RunOptions};
use crate::terraform::{self, TerraformAction};

const SEPARATOR: &str = "--------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "tool", content = "action", rename_all = "lowercase")]
pub enum Step {
    Packer(PackerAction),
    Terraform(TerraformAction),
}

impl Step {
    pub fn requires_approval(&self) -> bool {
        match self {
            Step::Packer(_) => false,
            Step::Terraform(action) => action.requires_approval(),
        }
    }

    pub fn banner(&self) -> &'static str {
        match self {
            Step::Packer(action) => action.banner(),
            Step::Terraform(action) => action.banner(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Packer(action) => write!(f, "{}", action),
            Step::Terraform(action) => write!(f, "{}", action),
        }
    }
}

/// Everything a step needs besides the observer.
#[derive(Debug, Clone)]
pub struct ActionContext<'a> {
    pub config: &'a InframateConfig,
    pub run: RunOptions,
    /// Pass `-auto-approve` to Terraform.
    pub auto_approve: bool,
    /// Run Packer builds in `-debug` mode.
    pub debug: bool,
}

impl<'a> ActionContext<'a> {
    pub fn new(config: &'a InframateConfig) -> Self {
        Self {
            config,
            run: RunOptions::default(),
            auto_approve: false,
            debug: false,
        }
    }

    fn options_for(&self, step: Step) -> RunOptions {
        let mut options = self.run.clone();
        if options.working_dir.is_none() {
            if let (Step::Packer(_), Some(dir)) = (step, &self.config.packer.base_dir) {
                options.working_dir = Some(dir.clone());
            }
        }
        options
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: Step,
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    pub report: PipelineReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

pub fn resolve(step: Step, ctx: &ActionContext<'_>) -> Result<PipelineRequest> {
    let spec = match step {
        Step::Packer(action) => packer::command(ctx.config, action, ctx.debug)?,
        Step::Terraform(action) => terraform::command(ctx.config, action, ctx.auto_approve)?,
    };
    Ok(PipelineRequest::from(spec))
}

/// Run one step, forwarding tool output to `observer`.
///
/// Listing images captures output instead and returns the parsed JSON.
pub fn execute(
    step: Step,
    ctx: &ActionContext<'_>,
    observer: &mut dyn LineObserver,
) -> Result<StepOutcome> {
    info!("{}", SEPARATOR);
    info!("{}", step.banner());

    let pipeline = resolve(step, ctx)?;
    let options = ctx.options_for(step);
    debug!(step = %step, cmd = %pipeline, "resolved command");

    let command = pipeline
        .stages()
        .first()
        .map(|spec| spec.tokens().to_vec())
        .unwrap_or_default();

    let (report, data) = if step == Step::Packer(PackerAction::Images) {
        let mut collector = LineCollector::new();
        let report = runner::run(&pipeline, &options, &mut collector)?;
        (report, Some(parse_json_output(&collector.into_text())?))
    } else {
        (runner::run(&pipeline, &options, observer)?, None)
    };

    Ok(StepOutcome {
        step,
        command,
        working_dir: options.working_dir,
        report,
        data,
    })
}

fn parse_json_output(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    serde_json::from_str(text)
        .map_err(|e| Error::internal_json(e.to_string(), Some("parse gcloud output".to_string())))
}
