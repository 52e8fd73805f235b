//! Input manifest: one CSV row per segment request.
//!
//! Rows are `<id>,<hour>,<minute>,<second>`; the first row is a header and is
//! skipped, as are commented lines. A malformed row aborts the whole run: a
//! corrupt job list cannot be partially trusted.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SEGMENT_DURATION_SECS;

/// One segment acquisition request, immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRequest {
    /// External media identifier; valid ids are exactly 11 characters.
    pub external_id: String,
    /// Segment start offset in seconds from the beginning of the media.
    pub start_secs: f64,
}

impl SegmentRequest {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + SEGMENT_DURATION_SECS
    }

    /// True if the identifier has the expected 11-character shape. Requests
    /// failing this are skipped without any invocation, not treated as fatal.
    pub fn has_valid_id(&self) -> bool {
        self.external_id.chars().count() == 11
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed row at line {line}: {reason}")]
    Row { line: usize, reason: String },
}

/// Parse the manifest into an ordered request list.
pub fn parse_manifest(path: &Path) -> Result<Vec<SegmentRequest>, ManifestError> {
    let data = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rows(&data)
}

fn parse_rows(data: &str) -> Result<Vec<SegmentRequest>, ManifestError> {
    let mut requests = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        let line_no = idx + 1;
        // Header row.
        if idx == 0 {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fields.len() < 4 {
            return Err(ManifestError::Row {
                line: line_no,
                reason: format!("expected 4 fields, got {}", fields.len()),
            });
        }

        let external_id = fields[0].to_string();
        if external_id.is_empty() {
            return Err(ManifestError::Row {
                line: line_no,
                reason: "empty identifier".to_string(),
            });
        }

        let mut clock = [0u32; 3];
        for (slot, raw) in clock.iter_mut().zip(&fields[1..4]) {
            *slot = raw.parse::<u32>().map_err(|e| ManifestError::Row {
                line: line_no,
                reason: format!("bad time field {:?}: {}", raw, e),
            })?;
        }
        // Computed in f64: the fields are parser-validated u32s, and large
        // hour values must not wrap.
        let start_secs =
            f64::from(clock[0]) * 3600.0 + f64::from(clock[1]) * 60.0 + f64::from(clock[2]);

        requests.push(SegmentRequest {
            external_id,
            start_secs,
        });
    }
    Ok(requests)
}
