use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Fixed segment length: every job acquires exactly ten seconds of media.
pub const SEGMENT_DURATION_SECS: f64 = 10.0;

/// Output audio is always downmixed/kept at two channels.
pub const AUDIO_CHANNELS: u32 = 2;

/// Audio encoding settings for the extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Codec ffmpeg encodes extracted audio with.
    pub codec: String,
    /// Target sample rate in Hz.
    pub sample_rate: u32,
    /// Target sample bit depth (serialized as `-sample_fmt s<depth>`).
    pub bit_depth: u32,
    /// Container format and file extension for audio artifacts.
    pub container: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            codec: "pcm_s16le".to_string(),
            sample_rate: 48000,
            bit_depth: 16,
            container: "wav".to_string(),
        }
    }
}

/// Video encoding settings for the extraction and mux stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Codec ffmpeg encodes video with. Only `h264` is supported.
    pub codec: String,
    /// Container format and file extension for video artifacts.
    pub container: String,
    /// Target frame rate in fps.
    pub frame_rate: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            codec: "h264".to_string(),
            container: "mp4".to_string(),
            frame_rate: 30,
        }
    }
}

impl VideoConfig {
    /// The mux stage can only merge streams encoded with h264; any other
    /// codec is a configuration error raised before any invocation.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.codec != "h264" {
            anyhow::bail!(
                "merging best quality video is not supported for codec: {}",
                self.codec
            );
        }
        Ok(())
    }
}

/// Global configuration loaded from `~/.config/segdl/config.toml`.
/// Every field can be overridden from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegdlConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub video: VideoConfig,
    /// Attempts per ffmpeg invocation (including the first) before a stage
    /// is abandoned. Covers unpredictable network behavior behind ffmpeg.
    pub max_attempts: u32,
    /// Number of concurrent segment workers.
    pub workers: usize,
    /// Path to the ffmpeg executable.
    pub ffmpeg_path: PathBuf,
    /// Path to the ffprobe executable.
    pub ffprobe_path: PathBuf,
}

impl Default for SegdlConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            video: VideoConfig::default(),
            max_attempts: 10,
            workers: 6,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("segdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SegdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SegdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SegdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
