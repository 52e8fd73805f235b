//! Invocation argument model: inputs, flag vectors, and the typed duration.

use std::fmt;
use std::path::{Path, PathBuf};

use super::error::InvokeError;

/// One or many `-i` inputs for a single invocation. Inputs may be local
/// paths or direct URLs; they are expanded to repeated `-i <input>` pairs at
/// dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Single(String),
    Multi(Vec<String>),
}

impl InputSource {
    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            InputSource::Single(input) => {
                args.push("-i".to_string());
                args.push(input.clone());
            }
            InputSource::Multi(inputs) => {
                for input in inputs {
                    args.push("-i".to_string());
                    args.push(input.clone());
                }
            }
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Single(input) => f.write_str(input),
            InputSource::Multi(inputs) => f.write_str(&inputs.join(", ")),
        }
    }
}

/// Post-invocation output check, run after a successful tool exit. A failure
/// is classified exactly like a process failure.
pub trait OutputValidator: Send + Sync {
    fn validate(&self, output: &Path) -> Result<(), InvokeError>;
}

/// Fully specified ffmpeg invocation, owned by one retry sequence.
///
/// The target duration is a typed field rather than a `-t` token spliced into
/// a flag list; it is serialized into the argument vector only at dispatch,
/// and rewritten between attempts when the output duration comes up short.
#[derive(Debug, Clone)]
pub struct InvocationSpec {
    pub tool: PathBuf,
    pub inputs: InputSource,
    /// Flags placed before the `-i` inputs (e.g. `-n`, `-ss <offset>`).
    pub input_args: Vec<String>,
    /// Flags placed after the inputs (codec, format, rate settings).
    pub output_args: Vec<String>,
    /// Requested output duration, serialized as `-t <secs>` ahead of the
    /// output args. `None` for invocations with no duration bound (mux).
    pub duration_secs: Option<f64>,
    pub output: PathBuf,
    pub log_level: String,
    /// Attempts (including the first) before the invocation is abandoned.
    pub max_attempts: u32,
}

impl InvocationSpec {
    /// Assemble the argument vector passed to the tool, excluding the tool
    /// path itself: `input_args {-i <input>}+ [-t <secs>] output_args
    /// <output> -loglevel <level>`.
    pub fn argv(&self) -> Vec<String> {
        let mut args = self.input_args.clone();
        self.inputs.push_args(&mut args);
        if let Some(duration) = self.duration_secs {
            args.push("-t".to_string());
            args.push(duration.to_string());
        }
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args.push("-loglevel".to_string());
        args.push(self.log_level.clone());
        args
    }

    /// Compound a duration adjustment onto the current value. Each retry's
    /// diff applies to the already-adjusted duration, not the original.
    /// A mismatch reported for a spec with no duration bound means the spec
    /// was assembled wrong, which is fatal.
    pub fn adjust_duration(&mut self, diff_secs: f64) -> anyhow::Result<()> {
        match self.duration_secs.as_mut() {
            Some(duration) => {
                *duration += diff_secs;
                Ok(())
            }
            None => anyhow::bail!(
                "duration mismatch reported for an invocation without a duration argument (output {})",
                self.output.display()
            ),
        }
    }
}
