//! Output artifact layout and the on-disk resumability ledger.
//!
//! Each segment owns three artifacts (audio-only, video-only, muxed) whose
//! names derive deterministically from the segment key. Their joint presence
//! marks the segment as already acquired; the scheduler never re-dispatches it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::manifest::SegmentRequest;

pub const AUDIO_DIR: &str = "audio";
pub const VIDEO_DIR: &str = "video";
pub const MUXED_DIR: &str = "video_audio";

/// Shared filename stem: `<id>_<start ms>_<end ms>`.
pub fn media_stem(external_id: &str, start_secs: f64, end_secs: f64) -> String {
    format!(
        "{}_{}_{}",
        external_id,
        (start_secs * 1000.0) as i64,
        (end_secs * 1000.0) as i64
    )
}

/// The three artifact paths for one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPaths {
    pub audio: PathBuf,
    pub video: PathBuf,
    pub muxed: PathBuf,
}

impl SegmentPaths {
    pub fn for_request(
        root: &Path,
        req: &SegmentRequest,
        audio_ext: &str,
        video_ext: &str,
    ) -> Self {
        let stem = media_stem(&req.external_id, req.start_secs, req.end_secs());
        Self {
            audio: root.join(AUDIO_DIR).join(format!("{stem}.{audio_ext}")),
            video: root.join(VIDEO_DIR).join(format!("{stem}.{video_ext}")),
            muxed: root.join(MUXED_DIR).join(format!("{stem}.{video_ext}")),
        }
    }

    /// True when all three artifacts exist: the segment is already acquired.
    pub fn all_exist(&self) -> bool {
        self.audio.exists() && self.video.exists() && self.muxed.exists()
    }

    /// Delete whichever artifacts exist. Run before an acquisition attempt so
    /// a resumed job never merges stale partial output.
    pub fn remove_existing(&self) -> io::Result<()> {
        for path in [&self.muxed, &self.video, &self.audio] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Create the `audio/`, `video/` and `video_audio/` subdirectories.
pub fn ensure_layout(root: &Path) -> io::Result<()> {
    for dir in [AUDIO_DIR, VIDEO_DIR, MUXED_DIR] {
        fs::create_dir_all(root.join(dir))?;
    }
    Ok(())
}
