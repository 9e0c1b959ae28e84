/*!
    Application configuration, loaded from a JSON file.
*/

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ffmpeg_source::SourceOptions;

use crate::error::CaptureError;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub keys: QueueKeys,
    pub capture: CaptureConfig,
    pub ffmpeg_log_level: FfmpegLogLevel,
}

/**
    Connection pool settings for the queue store.

    Field aliases accept the camelCase names of older config files.
*/
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    /// `host:port`
    pub host: String,
    /// Empty means no AUTH.
    pub password: String,
    pub db: i64,
    /// Idle connections kept for reuse.
    #[serde(alias = "maxIdle")]
    pub max_idle: usize,
    /// Connections checked out at once; 0 is unlimited.
    #[serde(alias = "maxActive")]
    pub max_active: usize,
    /// Seconds an idle connection may sit in the pool; 0 keeps it forever.
    #[serde(alias = "idleTimeout")]
    pub idle_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:6379".to_string(),
            password: String::new(),
            db: 0,
            max_idle: 10,
            max_active: 0,
            idle_timeout: 300,
        }
    }
}

impl RedisConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }
}

/**
    Queue keys the three capture artifacts are pushed under.
*/
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct QueueKeys {
    pub video: String,
    pub audio: String,
    pub image: String,
}

impl Default for QueueKeys {
    fn default() -> Self {
        Self {
            video: "VideoData".to_string(),
            audio: "AudioData".to_string(),
            image: "ImageData".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub rtsp_transport: String,
    /// Socket buffer size in bytes.
    pub buffer_size: u32,
    /// Maximum demuxing delay in microseconds.
    pub max_delay: u32,
    /// Container of the audio+video artifact.
    pub av_format: String,
    /// Container of the audio-only artifact.
    pub audio_format: String,
    /// AAC bit rate in bits per second.
    pub audio_bitrate: u64,
    /// AAC sample rate; the source rate when unset.
    pub audio_sample_rate: Option<u32>,
    /// JPEG quality, 1-100.
    pub thumbnail_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            rtsp_transport: "tcp".to_string(),
            buffer_size: 8192,
            max_delay: 5000,
            av_format: "mp4".to_string(),
            audio_format: "wav".to_string(),
            audio_bitrate: 48_000,
            audio_sample_rate: None,
            thumbnail_quality: 75,
        }
    }
}

impl CaptureConfig {
    /**
        Options passed to the demuxer when opening the camera.
    */
    pub fn input_options(&self) -> SourceOptions {
        SourceOptions::default()
            .with_option("rtsp_transport", &self.rtsp_transport)
            .with_option("buffer_size", self.buffer_size.to_string())
            .with_option("max_delay", self.max_delay.to_string())
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FfmpegLogLevel {
    Quiet,
    Error,
    #[default]
    Warning,
    Info,
    Debug,
}

impl FfmpegLogLevel {
    pub fn to_ffmpeg(self) -> ffmpeg_next::util::log::Level {
        use ffmpeg_next::util::log::Level;

        match self {
            Self::Quiet => Level::Quiet,
            Self::Error => Level::Error,
            Self::Warning => Level::Warning,
            Self::Info => Level::Info,
            Self::Debug => Level::Debug,
        }
    }
}

impl AppConfig {
    /**
        Load configuration from `path`. A missing file yields the defaults.
    */
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(CaptureError::config(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let config: Self = serde_json::from_str(&text).map_err(|e| {
            CaptureError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        let capture = &self.capture;
        if !(1..=100).contains(&capture.thumbnail_quality) {
            return Err(CaptureError::config(format!(
                "thumbnail_quality must be 1-100, got {}",
                capture.thumbnail_quality
            )));
        }
        if capture.audio_bitrate == 0 {
            return Err(CaptureError::config("audio_bitrate must be positive"));
        }
        if capture.audio_sample_rate == Some(0) {
            return Err(CaptureError::config("audio_sample_rate must be positive"));
        }
        if capture.av_format.is_empty() || capture.audio_format.is_empty() {
            return Err(CaptureError::config("container formats must be named"));
        }
        Ok(())
    }
}
