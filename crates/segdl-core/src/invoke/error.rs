//! Invocation error type for retry classification.

use std::fmt;
use std::process::ExitStatus;

/// Error from a single ffmpeg attempt (spawn failure, non-zero exit, or a
/// post-invocation validation failure). Classified before deciding retries,
/// then converted to anyhow at the job boundary.
#[derive(Debug)]
pub enum InvokeError {
    /// The tool could not be started (missing binary, permissions).
    Spawn(std::io::Error),
    /// The tool exited non-zero; stderr kept for classification.
    Subprocess { status: ExitStatus, stderr: String },
    /// The produced output's duration differed from the requested duration.
    WrongDuration { target: f64, actual: f64 },
    /// The produced output failed a validation check.
    Validation(String),
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Spawn(e) => write!(f, "failed to spawn tool: {}", e),
            InvokeError::Subprocess { status, stderr } => {
                write!(f, "tool exited with {}: {}", status, stderr.trim_end())
            }
            InvokeError::WrongDuration { target, actual } => write!(
                f,
                "output duration {}s does not match requested {}s",
                actual, target
            ),
            InvokeError::Validation(msg) => write!(f, "output did not validate: {}", msg),
        }
    }
}

impl std::error::Error for InvokeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvokeError::Spawn(e) => Some(e),
            InvokeError::Subprocess { .. }
            | InvokeError::WrongDuration { .. }
            | InvokeError::Validation(_) => None,
        }
    }
}
