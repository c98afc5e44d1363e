//! Terraform invocations built from the resolved configuration.
//!
//! The working directory is passed as a positional argument and the plan is
//! written under it, so the commands behave the same from any caller cwd.

use std::fmt;

use serde::Serialize;

use crate::config::InframateConfig;
use crate::error::Result;
use crate::runner::CommandSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerraformAction {
    Init,
    Plan,
    Apply,
    Destroy,
}

impl TerraformAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerraformAction::Init => "init",
            TerraformAction::Plan => "plan",
            TerraformAction::Apply => "apply",
            TerraformAction::Destroy => "destroy",
        }
    }

    pub fn banner(&self) -> &'static str {
        match self {
            TerraformAction::Init => "Run Terraform initialization...",
            TerraformAction::Plan => "Run Terraform planning...",
            TerraformAction::Apply => "Run Terraform plan application...",
            TerraformAction::Destroy => "Run Terraform latest plan destruction...",
        }
    }

    /// Actions that mutate infrastructure and prompt unless auto-approved.
    pub fn requires_approval(&self) -> bool {
        matches!(self, TerraformAction::Apply | TerraformAction::Destroy)
    }
}

impl fmt::Display for TerraformAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terraform {}", self.as_str())
    }
}

pub fn init(config: &InframateConfig) -> Result<CommandSpec> {
    let dir = config.terraform.base_dir()?;
    CommandSpec::new([
        config.terraform.cmd_base.clone(),
        "init".to_string(),
        dir.display().to_string(),
    ])
}

pub fn plan(config: &InframateConfig) -> Result<CommandSpec> {
    let dir = config.terraform.base_dir()?;
    let plan = config.terraform.plan_path()?;
    CommandSpec::new([
        config.terraform.cmd_base.clone(),
        "plan".to_string(),
        "-out".to_string(),
        plan.display().to_string(),
        dir.display().to_string(),
    ])
}

pub fn apply(config: &InframateConfig, auto_approve: bool) -> Result<CommandSpec> {
    let plan = config.terraform.plan_path()?;
    let mut tokens = vec![config.terraform.cmd_base.clone(), "apply".to_string()];
    if auto_approve {
        tokens.push("-auto-approve".to_string());
    }
    tokens.push(plan.display().to_string());
    CommandSpec::new(tokens)
}

pub fn destroy(config: &InframateConfig, auto_approve: bool) -> Result<CommandSpec> {
    let dir = config.terraform.base_dir()?;
    let mut tokens = vec![config.terraform.cmd_base.clone(), "destroy".to_string()];
    if auto_approve {
        tokens.push("-auto-approve".to_string());
    }
    tokens.push(dir.display().to_string());
    CommandSpec::new(tokens)
}

pub fn command(
    config: &InframateConfig,
    action: TerraformAction,
    auto_approve: bool,
) -> Result<CommandSpec> {
    match action {
        TerraformAction::Init => init(config),
        TerraformAction::Plan => plan(config),
        TerraformAction::Apply => apply(config, auto_approve),
        TerraformAction::Destroy => destroy(config, auto_approve),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{fixed_now, sample, SAMPLE};

    const DIR: &str = "/opt/inframate/terraform/gcp";
    const PLAN: &str = "/opt/inframate/terraform/gcp/.terraform/terraform.tfplan";

    #[test]
    fn init_targets_base_dir() {
        let spec = init(&sample()).unwrap();
        assert_eq!(spec.tokens(), ["terraform", "init", DIR]);
    }

    #[test]
    fn plan_writes_plan_file_under_base_dir() {
        let spec = plan(&sample()).unwrap();
        assert_eq!(spec.tokens(), ["terraform", "plan", "-out", PLAN, DIR]);
    }

    #[test]
    fn apply_uses_saved_plan() {
        let spec = apply(&sample(), false).unwrap();
        assert_eq!(spec.tokens(), ["terraform", "apply", PLAN]);
    }

    #[test]
    fn auto_approve_precedes_target() {
        let apply = apply(&sample(), true).unwrap();
        let destroy = destroy(&sample(), true).unwrap();

        assert_eq!(apply.tokens(), ["terraform", "apply", "-auto-approve", PLAN]);
        assert_eq!(destroy.tokens(), ["terraform", "destroy", "-auto-approve", DIR]);
    }

    #[test]
    fn missing_base_dir_is_config_error() {
        let doc = SAMPLE.replace("  terraform_base_dir: /opt/inframate/terraform/gcp\n", "");
        let config = crate::config::parse_at(&doc, None, fixed_now()).unwrap();

        let err = command(&config, TerraformAction::Init, false).unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
    }

    #[test]
    fn only_mutating_actions_need_approval() {
        assert!(!TerraformAction::Init.requires_approval());
        assert!(!TerraformAction::Plan.requires_approval());
        assert!(TerraformAction::Apply.requires_approval());
        assert!(TerraformAction::Destroy.requires_approval());
    }
}
