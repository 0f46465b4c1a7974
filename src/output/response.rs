//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use jenkins_artifact::error::Hint;
use jenkins_artifact::{Error, ErrorCode, Result};
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

    pub fn to_json(&self) -> Result<String> {
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

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
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
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigMissingKey
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::TargetNotFound => 4,

        ErrorCode::SshServerInvalid | ErrorCode::SshIdentityFileNotFound => 10,

        ErrorCode::RemoteApiFailed
        | ErrorCode::ArtifactNotFound
        | ErrorCode::RemoteCommandFailed => 20,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jenkins_artifact::error::RemoteCommandFailedDetails;

    #[test]
    fn remote_command_failed_serializes_stdout_stderr() {
        let err = Error::remote_command_failed(RemoteCommandFailedDetails {
            command: "mkdir -p /srv/app/releases/1".to_string(),
            exit_code: 2,
            stdout: "some stdout".to_string(),
            stderr: "tar: Error is not recoverable".to_string(),
            host: Some("web1.example.com".to_string()),
        });

        let json = CliResponse::<()>::from_error(&err).to_json().unwrap();

        assert!(json.contains("\"code\": \"remote.command_failed\""));
        assert!(json.contains("some stdout"));
        assert!(json.contains("tar: Error is not recoverable"));
        assert!(json.contains("\"exitCode\": 2"));
    }

    #[test]
    fn success_envelope_omits_error() {
        let json = CliResponse::success(serde_json::json!({ "releaseName": "20231114221320" }))
            .to_json()
            .unwrap();
        assert!(json.contains("\"success\": true"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn error_categories_map_to_exit_codes() {
        let cases = [
            (Error::config_missing_key("jenkins_origin"), 2),
            (Error::target_not_found("prod"), 4),
            (Error::ssh_server_invalid("prod", vec!["host".to_string()]), 10),
            (Error::remote_api_failed("https://ci", Some(503), "unavailable"), 20),
            (Error::artifact_not_found("app", None, Vec::new()), 20),
            (Error::internal_unexpected("boom"), 1),
        ];

        for (err, expected) in cases {
            let (value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));
            assert!(value.is_err());
            assert_eq!(exit_code, expected);
        }
    }

    #[test]
    fn hints_are_included_when_present() {
        let err = Error::target_not_found("prod").with_hint("Create the target file");
        let json = CliResponse::<()>::from_error(&err).to_json().unwrap();
        assert!(json.contains("Create the target file"));
    }
}
