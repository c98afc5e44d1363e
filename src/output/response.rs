//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use inframate::error::Hint;
use inframate::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_result<T: Serialize>(result: Result<T>) -> Result<()> {
    match result {
        Ok(data) => print_response(&CliResponse::success(data)),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(&err);
            (Err(err), exit_code)
        }
    }
}

/// Process exit code for an error. Failed tools propagate their own status.
pub fn exit_code_for_error(err: &Error) -> i32 {
    match err.code {
        ErrorCode::CommandFailed => err.exit_code().unwrap_or(1).clamp(1, 255),

        ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::ValidationApprovalDeclined
        | ErrorCode::ScenarioNotFound => 2,

        ErrorCode::NotImplemented => 3,

        ErrorCode::ConfigMissingKey
        | ErrorCode::ConfigInvalidYaml
        | ErrorCode::ConfigInvalidValue => 10,

        ErrorCode::CommandSpawnFailed => 127,
        ErrorCode::CommandCancelled => 130,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    print_result(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inframate::error::CommandFailedDetails;

    fn failed(exit_code: i32) -> Error {
        Error::command_failed(CommandFailedDetails {
            command: vec!["terraform".to_string(), "apply".to_string()],
            stage: 0,
            exit_code,
            stderr_tail: vec!["Error: provider crashed".to_string()],
        })
    }

    #[test]
    fn command_failure_propagates_child_status() {
        assert_eq!(exit_code_for_error(&failed(3)), 3);
        assert_eq!(exit_code_for_error(&failed(1)), 1);
    }

    #[test]
    fn command_failure_status_is_clamped() {
        assert_eq!(exit_code_for_error(&failed(-1)), 1);
        assert_eq!(exit_code_for_error(&failed(300)), 255);
    }

    #[test]
    fn error_kinds_map_to_fixed_codes() {
        assert_eq!(exit_code_for_error(&Error::config_missing_key("general.image_name_prefix", None)), 10);
        assert_eq!(exit_code_for_error(&Error::not_implemented("packer rollback")), 3);
        assert_eq!(exit_code_for_error(&Error::approval_declined("terraform apply")), 2);
    }

    #[test]
    fn error_envelope_carries_code_and_details() {
        let json = CliResponse::<()>::from_error(&failed(2)).to_json().unwrap();

        assert!(json.contains("\"success\": false"));
        assert!(json.contains("\"code\": \"command.failed\""));
        assert!(json.contains("\"exitCode\": 2"));
        assert!(json.contains("provider crashed"));
    }

    #[test]
    fn map_result_keeps_success_exit_code() {
        let (value, code) = map_cmd_result_to_json(Ok((serde_json::json!({"ok": true}), 0)));
        assert_eq!(code, 0);
        assert_eq!(value.unwrap()["ok"], true);
    }
}
