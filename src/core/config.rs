//! Inframate configuration document.
//!
//! The YAML file carries GCP data plus Packer/Terraform locations. Loading
//! resolves it once into an immutable [`InframateConfig`]: paths expanded,
//! defaults filled, image name stamped. Command builders only ever see the
//! resolved value.

use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::io;

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_ENV: &str = "INFRAMATE_CONFIG";

/// File looked up in the working directory as a last resort.
pub const DEFAULT_CONFIG_FILE: &str = "inframate.yaml";

pub const DEFAULT_PLAN_FILE: &str = ".terraform/terraform.tfplan";

/// Image names are `<prefix>-YYYYmmddHHMM` and GCE caps names at 63 chars.
const MAX_PREFIX_LEN: usize = 63 - 13;

// ============================================================================
// Raw document
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    general: RawGeneral,
    gcp_data: RawGcpData,
    packer: RawPacker,
    terraform: RawTerraform,
    gcloud: RawGcloud,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGeneral {
    image_name_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGcpData {
    gcp_cred_file: Option<String>,
    project_id: Option<String>,
    region: Option<String>,
    zone: Option<String>,
    machine_type: Option<String>,
    source_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPacker {
    packer_base_dir: Option<String>,
    packer_cmd_base: Option<String>,
    packer_tmplt_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTerraform {
    terraform_cmd_base: Option<String>,
    terraform_base_dir: Option<String>,
    plan_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGcloud {
    gcloud_cmd_base: Option<String>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InframateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub image_name_prefix: String,
    pub image_name: String,
    pub gcp: GcpData,
    pub packer: PackerSettings,
    pub terraform: TerraformSettings,
    pub gcloud_cmd_base: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpData {
    pub cred_file: PathBuf,
    pub project_id: String,
    pub region: String,
    pub zone: String,
    pub machine_type: String,
    pub source_image: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    pub cmd_base: String,
    pub template_file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerraformSettings {
    pub cmd_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    pub plan_file: String,
}

impl TerraformSettings {
    /// Terraform working directory. Only Terraform actions require it.
    pub fn base_dir(&self) -> Result<&Path> {
        self.base_dir
            .as_deref()
            .ok_or_else(|| Error::config_missing_key("terraform.terraform_base_dir", None))
    }

    pub fn plan_path(&self) -> Result<PathBuf> {
        Ok(self.base_dir()?.join(&self.plan_file))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Pick the config file: explicit flag, then `$INFRAMATE_CONFIG`, then
/// `./inframate.yaml`.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env::var(CONFIG_ENV) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

pub fn load(path: &Path) -> Result<InframateConfig> {
    let content = io::read_file(path, "read config")?;
    parse_at(&content, Some(path), Local::now())
}

/// Parse and resolve with an explicit clock for the image-name stamp.
pub fn parse_at(
    content: &str,
    source: Option<&Path>,
    now: DateTime<Local>,
) -> Result<InframateConfig> {
    let source_str = source.map(|p| p.display().to_string());

    // An empty document deserializes to null; treat it as all-defaults so the
    // missing-key error names the first absent field.
    let raw: RawConfig = if content.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yml::from_str(content).map_err(|e| {
            Error::config_invalid_yaml(source_str.clone().unwrap_or_else(|| "<inline>".into()), e)
        })?
    };

    resolve(raw, source, now)
}

fn resolve(raw: RawConfig, source: Option<&Path>, now: DateTime<Local>) -> Result<InframateConfig> {
    let source_str = source.map(|p| p.display().to_string());
    let required = |value: Option<String>, key: &str| -> Result<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config_missing_key(key, source_str.clone()))
    };

    let prefix = required(raw.general.image_name_prefix, "general.image_name_prefix")?;
    validate_prefix(&prefix)?;

    let gcp = GcpData {
        cred_file: PathBuf::from(expand(
            &required(raw.gcp_data.gcp_cred_file, "gcp_data.gcp_cred_file")?,
            "gcp_data.gcp_cred_file",
        )?),
        project_id: required(raw.gcp_data.project_id, "gcp_data.project_id")?,
        region: required(raw.gcp_data.region, "gcp_data.region")?,
        zone: required(raw.gcp_data.zone, "gcp_data.zone")?,
        machine_type: required(raw.gcp_data.machine_type, "gcp_data.machine_type")?,
        source_image: required(raw.gcp_data.source_image, "gcp_data.source_image")?,
    };

    // Packer steps run inside the base dir, so anchored paths must not be
    // relative to it a second time.
    let packer_base_dir = optional(raw.packer.packer_base_dir)
        .map(|dir| {
            expand(&dir, "packer.packer_base_dir")
                .and_then(|dir| absolute(PathBuf::from(dir), "packer.packer_base_dir"))
        })
        .transpose()?;
    let template = expand(
        &required(raw.packer.packer_tmplt_file, "packer.packer_tmplt_file")?,
        "packer.packer_tmplt_file",
    )?;
    let packer_cmd = optional(raw.packer.packer_cmd_base).unwrap_or_else(|| "packer".to_string());
    let packer_cmd = expand(&packer_cmd, "packer.packer_cmd_base")?;

    let packer = PackerSettings {
        cmd_base: anchor_program(&packer_cmd, packer_base_dir.as_deref()),
        template_file: anchor(PathBuf::from(template), packer_base_dir.as_deref()),
        base_dir: packer_base_dir,
    };

    let terraform_cmd =
        optional(raw.terraform.terraform_cmd_base).unwrap_or_else(|| "terraform".to_string());
    let terraform = TerraformSettings {
        cmd_base: expand(&terraform_cmd, "terraform.terraform_cmd_base")?,
        base_dir: optional(raw.terraform.terraform_base_dir)
            .map(|dir| expand(&dir, "terraform.terraform_base_dir").map(PathBuf::from))
            .transpose()?,
        plan_file: optional(raw.terraform.plan_file)
            .unwrap_or_else(|| DEFAULT_PLAN_FILE.to_string()),
    };

    let gcloud_cmd = optional(raw.gcloud.gcloud_cmd_base).unwrap_or_else(|| "gcloud".to_string());

    Ok(InframateConfig {
        source: source.map(Path::to_path_buf),
        image_name: image_name(&prefix, now),
        image_name_prefix: prefix,
        gcp,
        packer,
        terraform,
        gcloud_cmd_base: expand(&gcloud_cmd, "gcloud.gcloud_cmd_base")?,
    })
}

/// `<prefix>-YYYYmmddHHMM`.
pub fn image_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}-{}", prefix, now.format("%Y%m%d%H%M"))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn expand(value: &str, key: &str) -> Result<String> {
    shellexpand::full(value)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| Error::config_invalid_value(key, Some(value.to_string()), e.to_string()))
}

fn absolute(path: PathBuf, key: &str) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    env::current_dir()
        .map(|cwd| cwd.join(&path))
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("resolve {}", key))))
}

fn anchor(path: PathBuf, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

/// Bare program names stay bare so they resolve through PATH.
fn anchor_program(program: &str, base: Option<&Path>) -> String {
    if !program.contains(std::path::MAIN_SEPARATOR) && !program.contains('/') {
        return program.to_string();
    }
    anchor(PathBuf::from(program), base).display().to_string()
}

fn validate_prefix(prefix: &str) -> Result<()> {
    let pattern = Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$")
        .map_err(|e| Error::internal_unexpected(e.to_string()))?;

    if !pattern.is_match(prefix) {
        return Err(Error::config_invalid_value(
            "general.image_name_prefix",
            Some(prefix.to_string()),
            "must start with a lowercase letter and contain only lowercase letters, digits and hyphens",
        ));
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(Error::config_invalid_value(
            "general.image_name_prefix",
            Some(prefix.to_string()),
            format!("must be at most {} characters", MAX_PREFIX_LEN),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) const SAMPLE: &str = r#"
general:
  image_name_prefix: inframate-test
gcp_data:
  gcp_cred_file: /secrets/gcp.json
  project_id: adept-cascade-216916
  region: us-east1
  zone: us-east1-b
  machine_type: f1-micro
  source_image: centos-7-v20181011
packer:
  packer_base_dir: /opt/inframate/packer
  packer_cmd_base: ./packer
  packer_tmplt_file: templates/gcp_centos_nginx.json
terraform:
  terraform_base_dir: /opt/inframate/terraform/gcp
"#;

    pub(crate) fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2018, 10, 21, 9, 5, 0).unwrap()
    }

    pub(crate) fn sample() -> InframateConfig {
        parse_at(SAMPLE, None, fixed_now()).unwrap()
    }

    #[test]
    fn parses_sample_document() {
        let config = sample();

        assert_eq!(config.image_name, "inframate-test-201810210905");
        assert_eq!(config.gcp.project_id, "adept-cascade-216916");
        assert_eq!(config.gcp.cred_file, PathBuf::from("/secrets/gcp.json"));
        assert_eq!(config.gcloud_cmd_base, "gcloud");
        assert_eq!(config.terraform.cmd_base, "terraform");
        assert_eq!(config.terraform.plan_file, DEFAULT_PLAN_FILE);
    }

    #[test]
    fn anchors_relative_packer_paths_to_base_dir() {
        let config = sample();

        assert_eq!(
            config.packer.template_file,
            PathBuf::from("/opt/inframate/packer/templates/gcp_centos_nginx.json")
        );
        assert_eq!(config.packer.cmd_base, "/opt/inframate/packer/./packer");
    }

    #[test]
    fn relative_packer_base_dir_becomes_absolute() {
        let doc = SAMPLE.replace("packer_base_dir: /opt/inframate/packer", "packer_base_dir: build/packer");
        let config = parse_at(&doc, None, fixed_now()).unwrap();
        let base = env::current_dir().unwrap().join("build/packer");

        assert_eq!(config.packer.base_dir.as_deref(), Some(base.as_path()));
        assert_eq!(config.packer.template_file, base.join("templates/gcp_centos_nginx.json"));
        assert_eq!(config.packer.cmd_base, base.join("./packer").display().to_string());
    }

    #[test]
    fn bare_packer_program_stays_on_path() {
        let doc = SAMPLE.replace("packer_cmd_base: ./packer", "packer_cmd_base: packer");
        let config = parse_at(&doc, None, fixed_now()).unwrap();
        assert_eq!(config.packer.cmd_base, "packer");
    }

    #[test]
    fn missing_key_names_dotted_path() {
        let doc = SAMPLE.replace("  zone: us-east1-b\n", "");
        let err = parse_at(&doc, Some(Path::new("inframate.yaml")), fixed_now()).unwrap_err();

        assert_eq!(err.code.as_str(), "config.missing_key");
        assert_eq!(err.details["key"], "gcp_data.zone");
        assert_eq!(err.details["path"], "inframate.yaml");
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let doc = SAMPLE.replace("project_id: adept-cascade-216916", "project_id: \"  \"");
        let err = parse_at(&doc, None, fixed_now()).unwrap_err();
        assert_eq!(err.details["key"], "gcp_data.project_id");
    }

    #[test]
    fn empty_document_reports_first_missing_key() {
        let err = parse_at("", None, fixed_now()).unwrap_err();
        assert_eq!(err.details["key"], "general.image_name_prefix");
    }

    #[test]
    fn malformed_yaml_is_invalid_yaml() {
        let err = parse_at("general: [unclosed", None, fixed_now()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_yaml");
    }

    #[test]
    fn rejects_uppercase_prefix() {
        let doc = SAMPLE.replace("inframate-test", "Inframate");
        let err = parse_at(&doc, None, fixed_now()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "general.image_name_prefix");
    }

    #[test]
    fn rejects_overlong_prefix() {
        let long = "a".repeat(MAX_PREFIX_LEN + 1);
        let doc = SAMPLE.replace("inframate-test", &long);
        let err = parse_at(&doc, None, fixed_now()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn terraform_dir_is_only_required_on_use() {
        let doc = SAMPLE.replace("  terraform_base_dir: /opt/inframate/terraform/gcp\n", "");
        let config = parse_at(&doc, None, fixed_now()).unwrap();

        let err = config.terraform.base_dir().unwrap_err();
        assert_eq!(err.details["key"], "terraform.terraform_base_dir");
    }

    #[test]
    fn plan_path_joins_base_dir() {
        let config = sample();
        assert_eq!(
            config.terraform.plan_path().unwrap(),
            PathBuf::from("/opt/inframate/terraform/gcp/.terraform/terraform.tfplan")
        );
    }

    #[test]
    fn expands_home_in_paths() {
        let doc = SAMPLE.replace("/secrets/gcp.json", "~/.gcp/creds.json");
        let config = parse_at(&doc, None, fixed_now()).unwrap();
        let rendered = config.gcp.cred_file.display().to_string();

        assert!(!rendered.starts_with('~'));
        assert!(rendered.ends_with(".gcp/creds.json"));
    }

    #[test]
    fn load_reads_file_and_records_source() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.source.as_deref(), Some(file.path()));
        assert!(config.image_name.starts_with("inframate-test-"));
        assert_eq!(config.image_name.len(), "inframate-test-".len() + 12);
    }

    #[test]
    fn explicit_path_wins() {
        let path = resolve_path(Some(Path::new("/etc/inframate.yaml")));
        assert_eq!(path, PathBuf::from("/etc/inframate.yaml"));
    }
}
