//! Declarative request validation (§4.7), built on `garde` the way the
//! teacher's `r2e-core` validation feature does: derive `Validate` on the
//! request body, run it before handler logic, and turn violations into
//! an `AppError::Validation` with a machine-readable field list.

use garde::Validate;
use serde::Deserialize;

use crate::error::{AppError, FieldError};

/// Run a `garde`-validated request body and translate failures into the
/// envelope's validation error shape.
pub fn validate<T: Validate<Context = ()>>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(|report| {
        let fields = report
            .iter()
            .map(|(path, err)| FieldError {
                field: path.to_string(),
                message: err.to_string(),
            })
            .collect();
        AppError::Validation {
            message: "validation failed".to_string(),
            fields,
        }
    })
}

/// Share/container/VM name pattern: alphanumeric, dash, underscore, 1-64
/// chars, first char alphanumeric.
pub const NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContainerRequest {
    #[garde(pattern(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$"))]
    pub name: String,
    #[garde(length(min = 1, max = 256))]
    pub image: String,
    #[garde(range(min = 1024, max = 65535))]
    pub port: Option<u16>,
    #[garde(range(min = 1))]
    pub cpu: Option<u32>,
    #[garde(range(min = 1))]
    pub memory_mb: Option<u64>,
    #[garde(range(min = 1, max = 300))]
    pub timeout_seconds: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkContainerRequest {
    #[garde(length(min = 1))]
    pub container_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VmActionRequest {
    #[garde(pattern(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShareRequest {
    #[garde(pattern(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$"))]
    pub share_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteCommandRequest {
    pub command: String,
}

/// Curated substring blacklist for the command-execution endpoint: refuse
/// anything that smells like mass-delete, device-format, filesystem-level
/// destroy, power-off, or privilege escalation.
const DESTRUCTIVE_PATTERNS: &[&str] = &[
    "rm -rf",
    "mkfs",
    "dd if=",
    "shred",
    "wipefs",
    "fdisk",
    "shutdown",
    "poweroff",
    "halt",
    "sudo ",
    "su -",
    "chmod 777",
    ":(){ :|:& };:",
];

/// Returns the first matched destructive pattern, if any.
pub fn find_destructive_pattern(command: &str) -> Option<&'static str> {
    let lower = command.to_lowercase();
    DESTRUCTIVE_PATTERNS
        .iter()
        .find(|p| lower.contains(&p.to_lowercase()))
        .copied()
}

pub fn validate_command(command: &str) -> Result<(), AppError> {
    if let Some(pattern) = find_destructive_pattern(command) {
        return Err(AppError::Validation {
            message: format!("command refused: matches destructive pattern '{pattern}'"),
            fields: vec![FieldError {
                field: "command".to_string(),
                message: "contains a disallowed destructive pattern".to_string(),
            }],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_container_request() {
        let req = CreateContainerRequest {
            name: "my-app".into(),
            image: "alpine:latest".into(),
            port: Some(8080),
            cpu: Some(2),
            memory_mb: Some(512),
            timeout_seconds: Some(30),
        };
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn rejects_out_of_range_port() {
        let req = CreateContainerRequest {
            name: "my-app".into(),
            image: "alpine:latest".into(),
            port: Some(80),
            cpu: None,
            memory_mb: None,
            timeout_seconds: None,
        };
        let err = validate(&req).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn rejects_empty_bulk_ids() {
        let req = BulkContainerRequest {
            container_ids: vec![],
        };
        assert!(validate(&req).is_err());
    }

    #[test]
    fn destructive_command_blacklist_matches() {
        assert_eq!(find_destructive_pattern("rm -rf /mnt/user"), Some("rm -rf"));
        assert_eq!(find_destructive_pattern("mkfs.ext4 /dev/sda1"), Some("mkfs"));
        assert!(find_destructive_pattern("ls -la /mnt/user").is_none());
    }

    #[test]
    fn validate_command_surfaces_field_error() {
        let err = validate_command("sudo shutdown now").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
