//! Packer invocations built from the resolved configuration.

use std::fmt;

use serde::Serialize;

use crate::config::InframateConfig;
use crate::error::{Error, Result};
use crate::runner::CommandSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackerAction {
    Validate,
    Inspect,
    Build,
    Rollback,
    Images,
}

impl PackerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackerAction::Validate => "validate",
            PackerAction::Inspect => "inspect",
            PackerAction::Build => "build",
            PackerAction::Rollback => "rollback",
            PackerAction::Images => "images",
        }
    }

    /// Banner logged before the action runs.
    pub fn banner(&self) -> &'static str {
        match self {
            PackerAction::Validate => "Run Packer template validation...",
            PackerAction::Inspect => "Run Packer template inspection...",
            PackerAction::Build => "Run Packer image build process...",
            PackerAction::Rollback => "Run Packer image rollback...",
            PackerAction::Images => "List built images...",
        }
    }
}

impl fmt::Display for PackerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "packer {}", self.as_str())
    }
}

/// `-var key=value` pairs passed to validate and build.
pub fn template_vars(config: &InframateConfig) -> Vec<String> {
    let gcp = &config.gcp;
    let pairs = [
        ("region", gcp.region.clone()),
        ("source_image", gcp.source_image.clone()),
        ("image_name", config.image_name.clone()),
        ("machine_type", gcp.machine_type.clone()),
        ("zone", gcp.zone.clone()),
        ("service_account_json", gcp.cred_file.display().to_string()),
        ("project_id", gcp.project_id.clone()),
    ];

    pairs
        .into_iter()
        .flat_map(|(key, value)| ["-var".to_string(), format!("{}={}", key, value)])
        .collect()
}

fn template(config: &InframateConfig) -> String {
    config.packer.template_file.display().to_string()
}

pub fn validate(config: &InframateConfig) -> Result<CommandSpec> {
    let mut tokens = vec![config.packer.cmd_base.clone(), "validate".to_string()];
    tokens.extend(template_vars(config));
    tokens.push(template(config));
    CommandSpec::new(tokens)
}

pub fn inspect(config: &InframateConfig) -> Result<CommandSpec> {
    CommandSpec::new([
        config.packer.cmd_base.clone(),
        "inspect".to_string(),
        template(config),
    ])
}

/// `debug` adds Packer's step-by-step `-debug` mode.
pub fn build(config: &InframateConfig, debug: bool) -> Result<CommandSpec> {
    let mut tokens = vec![config.packer.cmd_base.clone(), "build".to_string()];
    if debug {
        tokens.push("-debug".to_string());
    }
    tokens.extend(template_vars(config));
    tokens.push(template(config));
    CommandSpec::new(tokens)
}

pub fn rollback(_config: &InframateConfig) -> Result<CommandSpec> {
    Err(Error::not_implemented("packer rollback")
        .with_hint("Delete unwanted images with 'gcloud compute images delete <name>'"))
}

/// Images in the project whose names carry the configured prefix.
pub fn list_images(config: &InframateConfig) -> Result<CommandSpec> {
    CommandSpec::new([
        config.gcloud_cmd_base.clone(),
        "compute".to_string(),
        "images".to_string(),
        "list".to_string(),
        format!("--filter=name~^{}", config.image_name_prefix),
        "--format=json".to_string(),
        format!("--project={}", config.gcp.project_id),
    ])
}

pub fn command(config: &InframateConfig, action: PackerAction, debug: bool) -> Result<CommandSpec> {
    match action {
        PackerAction::Validate => validate(config),
        PackerAction::Inspect => inspect(config),
        PackerAction::Build => build(config, debug),
        PackerAction::Rollback => rollback(config),
        PackerAction::Images => list_images(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample;

    const TEMPLATE: &str = "/opt/inframate/packer/templates/gcp_centos_nginx.json";

    #[test]
    fn template_vars_are_separate_tokens() {
        let vars = template_vars(&sample());

        assert_eq!(vars.len(), 14);
        assert_eq!(vars[0], "-var");
        assert_eq!(vars[1], "region=us-east1");
        assert_eq!(vars[5], "image_name=inframate-test-201810210905");
        assert_eq!(vars[11], "service_account_json=/secrets/gcp.json");
        assert_eq!(vars[13], "project_id=adept-cascade-216916");
    }

    #[test]
    fn validate_passes_vars_then_template() {
        let spec = validate(&sample()).unwrap();

        assert_eq!(spec.program(), "/opt/inframate/packer/./packer");
        assert_eq!(spec.args()[0], "validate");
        assert_eq!(spec.args().last().map(String::as_str), Some(TEMPLATE));
        assert_eq!(spec.args().len(), 16);
    }

    #[test]
    fn inspect_only_takes_template() {
        let spec = inspect(&sample()).unwrap();
        assert_eq!(spec.args(), ["inspect", TEMPLATE]);
    }

    #[test]
    fn build_debug_flag_precedes_vars() {
        let plain = build(&sample(), false).unwrap();
        let debug = build(&sample(), true).unwrap();

        assert_eq!(plain.args()[1], "-var");
        assert_eq!(debug.args()[1], "-debug");
        assert_eq!(debug.args().len(), plain.args().len() + 1);
    }

    #[test]
    fn rollback_is_not_implemented() {
        let err = command(&sample(), PackerAction::Rollback, false).unwrap_err();
        assert_eq!(err.code.as_str(), "not_implemented");
    }

    #[test]
    fn list_images_filters_by_prefix() {
        let spec = list_images(&sample()).unwrap();

        assert_eq!(spec.program(), "gcloud");
        assert!(spec.args().contains(&"--filter=name~^inframate-test".to_string()));
        assert!(spec.args().contains(&"--format=json".to_string()));
        assert!(spec.args().contains(&"--project=adept-cascade-216916".to_string()));
    }

    #[test]
    fn action_display_names_tool() {
        assert_eq!(PackerAction::Build.to_string(), "packer build");
    }
}
