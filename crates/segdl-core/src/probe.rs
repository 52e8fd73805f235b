//! ffprobe boundary: measure the duration of a produced artifact.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::invoke::{InvokeError, OutputValidator};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Run ffprobe against a media file and return its container duration in
/// seconds.
pub fn probe_duration(ffprobe: &Path, media: &Path) -> Result<f64> {
    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(media)
        .output()
        .with_context(|| format!("failed to spawn ffprobe at {}", ffprobe.display()))?;
    anyhow::ensure!(
        output.status.success(),
        "ffprobe exited with {} for {}",
        output.status,
        media.display()
    );
    parse_duration(&output.stdout, media)
}

fn parse_duration(stdout: &[u8], media: &Path) -> Result<f64> {
    let parsed: ProbeOutput =
        serde_json::from_slice(stdout).context("ffprobe output was not valid JSON")?;
    let duration = parsed
        .format
        .duration
        .ok_or_else(|| anyhow::anyhow!("ffprobe reported no duration for {}", media.display()))?;
    duration
        .trim()
        .parse::<f64>()
        .with_context(|| format!("ffprobe duration {:?} was not a number", duration))
}

/// Default slack allowed between requested and measured duration before a
/// mismatch is reported.
pub const DURATION_TOLERANCE_SECS: f64 = 0.1;

/// Validator comparing the produced file's duration against the requested
/// one; a shortfall drives the retry loop's duration adjustment.
pub struct DurationValidator {
    ffprobe: PathBuf,
    target_secs: f64,
    tolerance_secs: f64,
}

impl DurationValidator {
    pub fn new(ffprobe: PathBuf, target_secs: f64) -> Self {
        Self {
            ffprobe,
            target_secs,
            tolerance_secs: DURATION_TOLERANCE_SECS,
        }
    }
}

impl OutputValidator for DurationValidator {
    fn validate(&self, output: &Path) -> Result<(), InvokeError> {
        let actual = probe_duration(&self.ffprobe, output)
            .map_err(|e| InvokeError::Validation(format!("{e:#}")))?;
        if (actual - self.target_secs).abs() > self.tolerance_secs {
            return Err(InvokeError::WrongDuration {
                target: self.target_secs,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_duration() {
        let stdout = br#"{"format": {"filename": "x.wav", "duration": "9.966000"}}"#;
        let secs = parse_duration(stdout, Path::new("x.wav")).unwrap();
        assert!((secs - 9.966).abs() < 1e-9);
    }

    #[test]
    fn missing_duration_is_an_error() {
        let stdout = br#"{"format": {"filename": "x.wav"}}"#;
        assert!(parse_duration(stdout, Path::new("x.wav")).is_err());
    }

    #[test]
    fn garbage_json_is_an_error() {
        assert!(parse_duration(b"not json", Path::new("x.wav")).is_err());
    }
}
