// 🚨 Error Types - classified failures surfaced to the operator
//
// Input and file errors abort the run. Registry errors are isolated per
// subaccount by the suggestion builder.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal input errors (bad rows, missing files)
#[derive(Debug, Error)]
pub enum AuditError {
    /// A row did not match the fixed layout
    #[error("line {line}: {reason}")]
    InputFormat { line: u64, reason: String },

    #[error("input file not found: {}", path.display())]
    MissingFile { path: PathBuf },
}

/// Failures talking to the runtime registry (KCP CLI)
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to start registry command: {0}")]
    Spawn(std::io::Error),

    #[error("failed waiting on registry command: {0}")]
    Wait(std::io::Error),

    #[error("registry command timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("registry command exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("invalid registry response: {0}")]
    InvalidResponse(String),

    #[error("no runtime found for subaccount")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_format_names_line() {
        let err = AuditError::InputFormat {
            line: 7,
            reason: "expected 8 columns, found 3".to_string(),
        };
        assert_eq!(err.to_string(), "line 7: expected 8 columns, found 3");
    }

    #[test]
    fn test_wait_is_not_reported_as_start_failure() {
        let err = RegistryError::Wait(std::io::Error::new(
            std::io::ErrorKind::Interrupted,
            "interrupted",
        ));
        assert_eq!(err.to_string(), "failed waiting on registry command: interrupted");
    }

    #[test]
    fn test_timeout_message() {
        let err = RegistryError::Timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "registry command timed out after 3s");
    }
}
