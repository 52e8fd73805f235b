//! Retry loop: run one invocation until success, satisfaction, or exhaustion.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use super::classify::{classify, Disposition};
use super::error::InvokeError;
use super::spec::{InvocationSpec, OutputValidator};

/// Terminal result of one retry sequence.
#[derive(Debug)]
pub enum Outcome {
    /// The tool produced an output that passed validation.
    Completed,
    /// The output existed before the invocation; it was left untouched.
    AlreadySatisfied,
    /// Every attempt was consumed without a valid output.
    Exhausted { last_error: InvokeError },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed | Outcome::AlreadySatisfied)
    }
}

/// Run the tool up to `spec.max_attempts` times, classifying each failure and
/// mutating the spec's duration argument when the output comes up short.
///
/// Returns `Err` only for configuration mistakes (zero attempts, a duration
/// adjustment with no duration argument); every tool-level failure mode ends
/// in an `Outcome`. Duration adjustments compound across attempts.
pub fn run_invocation(
    spec: &mut InvocationSpec,
    validator: Option<&dyn OutputValidator>,
) -> Result<Outcome> {
    anyhow::ensure!(spec.max_attempts >= 1, "max_attempts must be at least 1");

    let mut last_error = None;
    for attempt in 1..=spec.max_attempts {
        let err = match execute_once(spec) {
            Ok(()) => match validator.map(|v| v.validate(&spec.output)) {
                None | Some(Ok(())) => return Ok(Outcome::Completed),
                Some(Err(e)) => e,
            },
            Err(e) => e,
        };

        let final_attempt = attempt == spec.max_attempts;
        match classify(&err) {
            Disposition::AlreadyExists => {
                tracing::info!(
                    output = %spec.output.display(),
                    "output file already exists; leaving it in place"
                );
                return Ok(Outcome::AlreadySatisfied);
            }
            Disposition::TransientRetry => {
                tracing::warn!(attempt, error = %err, "invocation failed; retrying");
                if !final_attempt {
                    remove_output(&spec.output);
                }
            }
            Disposition::DurationAdjustRetry(diff) => {
                if !final_attempt {
                    remove_output(&spec.output);
                }
                // Compound the shortfall onto the requested duration so the
                // next attempt asks for more.
                spec.adjust_duration(diff)?;
                tracing::warn!(
                    attempt,
                    diff_secs = diff,
                    adjusted_secs = spec.duration_secs,
                    error = %err,
                    "output duration off; adjusting duration argument and retrying"
                );
            }
            Disposition::ValidationRetry => {
                tracing::info!(
                    attempt,
                    output = %spec.output.display(),
                    error = %err,
                    "output did not validate; retrying"
                );
                if !final_attempt {
                    remove_output(&spec.output);
                }
            }
        }
        last_error = Some(err);
    }

    let last_error = last_error
        .ok_or_else(|| anyhow::anyhow!("retry loop finished without recording an error"))?;
    tracing::error!(
        attempts = spec.max_attempts,
        inputs = %spec.inputs,
        error = %last_error,
        "maximum number of retries reached; could not obtain inputs"
    );
    Ok(Outcome::Exhausted { last_error })
}

/// Execute the tool once, synchronously, capturing stderr for classification.
fn execute_once(spec: &InvocationSpec) -> Result<(), InvokeError> {
    let argv = spec.argv();
    tracing::debug!(tool = %spec.tool.display(), args = ?argv, "spawning tool");
    let output = Command::new(&spec.tool)
        .args(&argv)
        .output()
        .map_err(InvokeError::Spawn)?;
    if output.status.success() {
        Ok(())
    } else {
        Err(InvokeError::Subprocess {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Best-effort deletion of a partial output before the next attempt.
fn remove_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}
