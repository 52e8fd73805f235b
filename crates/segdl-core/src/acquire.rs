//! Three-stage segment acquisition: audio extraction, video extraction, mux.
//!
//! One acquisition drives three chained ffmpeg invocations against a resolved
//! streaming URL. Each stage runs through the retry loop; a stage that
//! exhausts its retries ends the acquisition for this segment without
//! raising past the job boundary.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{SegdlConfig, AUDIO_CHANNELS, SEGMENT_DURATION_SECS};
use crate::invoke::{run_invocation, InputSource, InvocationSpec, Outcome};
use crate::manifest::SegmentRequest;
use crate::paths::SegmentPaths;
use crate::probe::DurationValidator;
use crate::resolve::StreamResolver;

/// Artifacts produced for one fully acquired segment. The muxed path is
/// implied by convention and not returned.
#[derive(Debug, Clone)]
pub struct SegmentOutputs {
    pub video: std::path::PathBuf,
    pub audio: std::path::PathBuf,
}

/// How one acquisition ended.
#[derive(Debug)]
pub enum Acquisition {
    /// Malformed identifier; nothing was attempted.
    Skipped,
    /// A stage exhausted its retries; the segment produced no usable output.
    Abandoned,
    /// All three artifacts are in place.
    Complete(SegmentOutputs),
}

/// Acquire one segment: resolve the stream URL, then extract audio, extract
/// video, and mux, in strict sequence.
///
/// Pre-existing artifacts for the request are deleted first so a resumed job
/// never merges stale partial output. Errors returned here (resolution
/// failure, unsupported codec, filesystem trouble) are job-fatal; the
/// scheduler contains them at the job boundary.
pub fn acquire_segment(
    req: &SegmentRequest,
    root: &Path,
    cfg: &SegdlConfig,
    resolver: &dyn StreamResolver,
) -> Result<Acquisition> {
    if !req.has_valid_id() {
        tracing::warn!(id = %req.external_id, "identifier is not 11 characters; skipping");
        return Ok(Acquisition::Skipped);
    }
    cfg.video.ensure_supported()?;

    let paths = SegmentPaths::for_request(root, req, &cfg.audio.container, &cfg.video.container);
    paths
        .remove_existing()
        .context("failed to clear previous artifacts")?;

    let url = resolver
        .resolve(&req.external_id)
        .with_context(|| format!("could not resolve stream URL for {}", req.external_id))?;

    let duration_check =
        DurationValidator::new(cfg.ffprobe_path.clone(), SEGMENT_DURATION_SECS);

    // Audio extraction.
    let mut audio = audio_spec(req, &url, &paths, cfg);
    if let Outcome::Exhausted { last_error } = run_invocation(&mut audio, Some(&duration_check))? {
        tracing::error!(
            id = %req.external_id,
            error = %last_error,
            "audio extraction gave up; abandoning segment"
        );
        return Ok(Acquisition::Abandoned);
    }

    // Video extraction.
    let mut video = video_spec(req, &url, &paths, cfg);
    if let Outcome::Exhausted { last_error } = run_invocation(&mut video, Some(&duration_check))? {
        tracing::error!(
            id = %req.external_id,
            error = %last_error,
            "video extraction gave up; abandoning segment"
        );
        return Ok(Acquisition::Abandoned);
    }

    // Mux the two artifacts with audio re-encoded for delivery.
    let mut mux = mux_spec(&paths, cfg);
    if let Outcome::Exhausted { last_error } = run_invocation(&mut mux, None)? {
        tracing::error!(
            id = %req.external_id,
            error = %last_error,
            "mux gave up; abandoning segment"
        );
        return Ok(Acquisition::Abandoned);
    }

    tracing::info!(
        id = %req.external_id,
        start = req.start_secs,
        end = req.end_secs(),
        "downloaded segment"
    );
    Ok(Acquisition::Complete(SegmentOutputs {
        video: paths.video,
        audio: paths.audio,
    }))
}

/// `-n -ss <start>` input, fixed duration, sample rate, two channels, bit
/// depth, container and codec on the output side.
fn audio_spec(
    req: &SegmentRequest,
    url: &str,
    paths: &SegmentPaths,
    cfg: &SegdlConfig,
) -> InvocationSpec {
    InvocationSpec {
        tool: cfg.ffmpeg_path.clone(),
        inputs: InputSource::Single(url.to_string()),
        input_args: vec!["-n".into(), "-ss".into(), req.start_secs.to_string()],
        output_args: vec![
            "-ar".into(),
            cfg.audio.sample_rate.to_string(),
            "-vn".into(),
            "-ac".into(),
            AUDIO_CHANNELS.to_string(),
            "-sample_fmt".into(),
            format!("s{}", cfg.audio.bit_depth),
            "-f".into(),
            cfg.audio.container.clone(),
            "-acodec".into(),
            cfg.audio.codec.clone(),
        ],
        duration_secs: Some(SEGMENT_DURATION_SECS),
        output: paths.audio.clone(),
        log_level: "error".to_string(),
        max_attempts: cfg.max_attempts,
    }
}

/// Same seek input args; lossless quality, frame rate and codec on the
/// output side, audio stripped.
fn video_spec(
    req: &SegmentRequest,
    url: &str,
    paths: &SegmentPaths,
    cfg: &SegdlConfig,
) -> InvocationSpec {
    InvocationSpec {
        tool: cfg.ffmpeg_path.clone(),
        inputs: InputSource::Single(url.to_string()),
        input_args: vec!["-n".into(), "-ss".into(), req.start_secs.to_string()],
        output_args: vec![
            "-f".into(),
            cfg.video.container.clone(),
            "-crf".into(),
            "0".into(),
            "-preset".into(),
            "medium".into(),
            "-r".into(),
            cfg.video.frame_rate.to_string(),
            "-an".into(),
            "-vcodec".into(),
            cfg.video.codec.clone(),
        ],
        duration_secs: Some(SEGMENT_DURATION_SECS),
        output: paths.video.clone(),
        log_level: "error".to_string(),
        max_attempts: cfg.max_attempts,
    }
}

/// Merge the video-only and audio-only artifacts; audio is re-encoded to the
/// delivery codec at the configured rate and channel count.
fn mux_spec(paths: &SegmentPaths, cfg: &SegdlConfig) -> InvocationSpec {
    InvocationSpec {
        tool: cfg.ffmpeg_path.clone(),
        inputs: InputSource::Multi(vec![
            paths.video.to_string_lossy().into_owned(),
            paths.audio.to_string_lossy().into_owned(),
        ]),
        input_args: vec!["-n".into()],
        output_args: vec![
            "-f".into(),
            cfg.video.container.clone(),
            "-r".into(),
            cfg.video.frame_rate.to_string(),
            "-vcodec".into(),
            cfg.video.codec.clone(),
            "-acodec".into(),
            "aac".into(),
            "-ar".into(),
            cfg.audio.sample_rate.to_string(),
            "-ac".into(),
            AUDIO_CHANNELS.to_string(),
            "-strict".into(),
            "experimental".into(),
        ],
        duration_secs: None,
        output: paths.muxed.clone(),
        log_level: "error".to_string(),
        max_attempts: cfg.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Resolver that records whether it was ever called.
    struct TrackingResolver(AtomicBool);

    impl StreamResolver for TrackingResolver {
        fn resolve(&self, _external_id: &str) -> Result<String> {
            self.0.store(true, Ordering::SeqCst);
            anyhow::bail!("offline")
        }
    }

    #[test]
    fn malformed_id_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let req = SegmentRequest {
            external_id: "tooshort".to_string(),
            start_secs: 0.0,
        };
        let resolver = TrackingResolver(AtomicBool::new(false));
        let result =
            acquire_segment(&req, dir.path(), &SegdlConfig::default(), &resolver).unwrap();
        assert!(matches!(result, Acquisition::Skipped));
        assert!(!resolver.0.load(Ordering::SeqCst), "resolver must not run");
    }

    #[test]
    fn unsupported_codec_fails_before_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let req = SegmentRequest {
            external_id: "abcdefghijk".to_string(),
            start_secs: 0.0,
        };
        let mut cfg = SegdlConfig::default();
        cfg.video.codec = "av1".to_string();
        let resolver = TrackingResolver(AtomicBool::new(false));
        assert!(acquire_segment(&req, dir.path(), &cfg, &resolver).is_err());
        assert!(!resolver.0.load(Ordering::SeqCst), "resolver must not run");
    }

    #[test]
    fn resolution_failure_is_job_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let req = SegmentRequest {
            external_id: "abcdefghijk".to_string(),
            start_secs: 0.0,
        };
        let resolver = TrackingResolver(AtomicBool::new(false));
        let err = acquire_segment(&req, dir.path(), &SegdlConfig::default(), &resolver)
            .unwrap_err();
        assert!(format!("{err:#}").contains("could not resolve stream URL"));
        assert!(resolver.0.load(Ordering::SeqCst));
    }

    #[test]
    fn audio_video_specs_share_seek_args() {
        let req = SegmentRequest {
            external_id: "abcdefghijk".to_string(),
            start_secs: 42.0,
        };
        let cfg = SegdlConfig::default();
        let paths = SegmentPaths::for_request(
            Path::new("/data"),
            &req,
            &cfg.audio.container,
            &cfg.video.container,
        );
        let audio = audio_spec(&req, "https://cdn.example/s", &paths, &cfg);
        let video = video_spec(&req, "https://cdn.example/s", &paths, &cfg);
        assert_eq!(audio.input_args, video.input_args);
        assert_eq!(audio.input_args, vec!["-n", "-ss", "42"]);
        assert_eq!(audio.duration_secs, Some(10.0));
        assert_eq!(video.duration_secs, Some(10.0));

        let mux = mux_spec(&paths, &cfg);
        assert_eq!(mux.duration_secs, None);
        match &mux.inputs {
            InputSource::Multi(inputs) => {
                assert_eq!(inputs.len(), 2);
                assert!(inputs[0].contains("/video/"));
                assert!(inputs[1].contains("/audio/"));
            }
            other => panic!("expected two mux inputs, got {other:?}"),
        }
    }
}
