//! CLI for the segdl segment downloader.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use segdl_core::config::{self, SegdlConfig};
use segdl_core::control::{self, ShutdownFlag};
use segdl_core::manifest;
use segdl_core::resolve::PlayerApiResolver;
use segdl_core::scheduler;

/// Download fixed ten-second audio/video segments listed in a CSV manifest.
#[derive(Debug, Parser)]
#[command(name = "segdl")]
#[command(about = "Concurrent, resumable downloader of fixed media segments", long_about = None)]
pub struct Cli {
    /// Input manifest (rows of id,hour,minute,second; first row is a header).
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output root; audio/, video/ and video_audio/ are created beneath it.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Path to the ffmpeg executable.
    #[arg(short = 'f', long = "ffmpeg")]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe executable.
    #[arg(long = "ffprobe")]
    pub ffprobe: Option<PathBuf>,

    /// Audio codec used to encode extracted audio.
    #[arg(long = "audio-codec")]
    pub audio_codec: Option<String>,

    /// Target audio sample rate in Hz.
    #[arg(long = "audio-sample-rate")]
    pub audio_sample_rate: Option<u32>,

    /// Target audio sample bit depth.
    #[arg(long = "audio-bit-depth")]
    pub audio_bit_depth: Option<u32>,

    /// Audio container format for output audio.
    #[arg(long = "audio-format")]
    pub audio_format: Option<String>,

    /// Video codec used to encode output video (only h264 is supported).
    #[arg(long = "video-codec")]
    pub video_codec: Option<String>,

    /// Video container format for output video.
    #[arg(long = "video-format")]
    pub video_format: Option<String>,

    /// Target video frame rate in fps.
    #[arg(long = "video-frame-rate")]
    pub video_frame_rate: Option<u32>,

    /// Attempts per ffmpeg invocation, covering unpredictable network
    /// behavior behind the tool.
    #[arg(long = "num-retries")]
    pub num_retries: Option<u32>,

    /// Number of concurrent download workers.
    #[arg(short = 'n', long = "num-workers")]
    pub num_workers: Option<usize>,

    /// Disable the log file (console logging only).
    #[arg(long = "no-logging")]
    pub no_logging: bool,

    /// Log file path (default ./segdl.log).
    #[arg(long = "log-path")]
    pub log_path: Option<PathBuf>,

    /// Print debug output.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Layer CLI flags over the loaded config file.
    fn apply_overrides(&self, cfg: &mut SegdlConfig) {
        if let Some(path) = &self.ffmpeg {
            cfg.ffmpeg_path = path.clone();
        }
        if let Some(path) = &self.ffprobe {
            cfg.ffprobe_path = path.clone();
        }
        if let Some(codec) = &self.audio_codec {
            cfg.audio.codec = codec.clone();
        }
        if let Some(rate) = self.audio_sample_rate {
            cfg.audio.sample_rate = rate;
        }
        if let Some(depth) = self.audio_bit_depth {
            cfg.audio.bit_depth = depth;
        }
        if let Some(format) = &self.audio_format {
            cfg.audio.container = format.clone();
        }
        if let Some(codec) = &self.video_codec {
            cfg.video.codec = codec.clone();
        }
        if let Some(format) = &self.video_format {
            cfg.video.container = format.clone();
        }
        if let Some(fps) = self.video_frame_rate {
            cfg.video.frame_rate = fps;
        }
        if let Some(retries) = self.num_retries {
            cfg.max_attempts = retries;
        }
        if let Some(workers) = self.num_workers {
            cfg.workers = workers;
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let mut cfg = config::load_or_init()?;
    args.apply_overrides(&mut cfg);
    tracing::debug!("effective config: {:?}", cfg);

    // Configuration and manifest errors are the only run-fatal conditions.
    cfg.video.ensure_supported()?;
    anyhow::ensure!(
        args.output.is_dir(),
        "output directory {} does not exist",
        args.output.display()
    );
    let requests = manifest::parse_manifest(&args.input)?;
    tracing::info!(
        manifest = %args.input.display(),
        rows = requests.len(),
        "starting download jobs"
    );

    let shutdown = ShutdownFlag::new();
    control::install_interrupt_handler(shutdown.clone());

    let resolver = Arc::new(PlayerApiResolver::new());
    let stats = scheduler::run_all(requests, args.output.clone(), cfg, resolver, shutdown).await?;

    tracing::info!(
        submitted = stats.submitted,
        completed = stats.completed,
        skipped = stats.skipped,
        failed = stats.failed,
        "finished download jobs"
    );
    Ok(())
}
