//! Classify one failed invocation attempt into the retry loop's next action.

use regex::Regex;
use std::sync::LazyLock;

use super::error::InvokeError;

/// ffmpeg refuses to overwrite with `-n` set and ends stderr with this
/// marker; the output on disk is treated as already satisfied.
const ALREADY_EXISTS_MARKER: &str = "already exists. Exiting.";

/// HTTP 4xx/5xx reported by ffmpeg's network layer, e.g.
/// `Server returned 403 Forbidden` or `HTTP error 503 Service Unavailable`.
static HTTP_ERR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(HTTP error [45][0-9]{2}|Server returned [45][0-9]{2})")
        .expect("HTTP error pattern compiles")
});

/// What the retry loop does next after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disposition {
    /// Output already on disk; stop, report success, delete nothing.
    AlreadyExists,
    /// Likely-transient failure (network or otherwise); clean up and retry.
    TransientRetry,
    /// Output duration was off by this many seconds (target minus actual);
    /// adjust the duration argument and retry.
    DurationAdjustRetry(f64),
    /// Output failed validation; clean up and retry.
    ValidationRetry,
}

/// Map one attempt's error to a disposition. Pure; the loop owns all side
/// effects (deletion, argument rewriting, logging).
pub fn classify(err: &InvokeError) -> Disposition {
    match err {
        InvokeError::Subprocess { stderr, .. } => {
            let stderr = stderr.trim_end();
            if stderr.ends_with(ALREADY_EXISTS_MARKER) {
                Disposition::AlreadyExists
            } else if HTTP_ERR_PATTERN.is_match(stderr) {
                // 4XX/5XX could be a passing network issue.
                Disposition::TransientRetry
            } else {
                // Arbitrary tool failures also consume an attempt.
                Disposition::TransientRetry
            }
        }
        InvokeError::WrongDuration { target, actual } => {
            Disposition::DurationAdjustRetry(target - actual)
        }
        InvokeError::Validation(_) => Disposition::ValidationRetry,
        InvokeError::Spawn(_) => Disposition::TransientRetry,
    }
}
