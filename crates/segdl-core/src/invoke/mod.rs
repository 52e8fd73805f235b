//! Retrying ffmpeg invocation.
//!
//! This module encapsulates the invocation argument model, classification of
//! failed attempts (already-exists marker, HTTP errors in stderr, duration
//! mismatches, validation failures) and the retry loop that mutates the
//! typed duration argument between attempts. Higher layers (acquire,
//! scheduler) share a consistent policy through it.

mod classify;
mod error;
mod run;
mod spec;

pub use classify::{classify, Disposition};
pub use error::InvokeError;
pub use run::{run_invocation, Outcome};
pub use spec::{InputSource, InvocationSpec, OutputValidator};
