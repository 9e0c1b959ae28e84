/*!
    Bounded capture sessions.

    A session opens the camera, copies its video into an in-memory A/V
    container alongside a re-encoded AAC track, copies its audio into an
    audio-only container, grabs one JPEG thumbnail, and pushes all three
    artifacts to the blob queue once the read loop ends.
*/

mod audio;
mod duration;
mod muxer;
mod thumbnail;

pub use self::audio::AudioPipeline;
pub use self::duration::{OVERSHOOT, effective_duration, requested_duration};
pub use self::muxer::{Containers, DualSink, MuxStats};
pub use self::thumbnail::{ThumbnailExtractor, encode_jpeg};

use std::time::{Duration, Instant};

use ffmpeg_source::Source;
use ffmpeg_types::{MediaInfo, StreamType};

use crate::config::{CaptureConfig, QueueKeys};
use crate::error::{CaptureError, Stage, StageContext};
use crate::queue::BlobQueue;

/**
    Where a session is in its lifecycle.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Running,
    Finalizing,
    Done,
    Failed,
}

/**
    Outcome of pushing one artifact to the queue.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistOutcome {
    pub key: String,
    pub bytes: usize,
    pub error: Option<String>,
}

impl PersistOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/**
    Summary of a finished session.
*/
#[derive(Clone, Debug)]
pub struct CaptureReport {
    pub bound: Duration,
    pub elapsed: Duration,
    pub av_bytes: usize,
    pub audio_bytes: usize,
    pub thumbnail_bytes: Option<usize>,
    pub mux: MuxStats,
    pub persisted: Vec<PersistOutcome>,
}

impl CaptureReport {
    /// True when every artifact reached the queue.
    pub fn fully_persisted(&self) -> bool {
        self.persisted.iter().all(PersistOutcome::is_ok)
    }
}

struct Recording {
    bound: Duration,
    elapsed: Duration,
    containers: Containers,
    thumbnail: Option<Vec<u8>>,
    mux: MuxStats,
}

/**
    One capture run against one input.
*/
pub struct CaptureSession<'a> {
    queue: &'a dyn BlobQueue,
    keys: &'a QueueKeys,
    settings: &'a CaptureConfig,
    state: SessionState,
}

impl<'a> CaptureSession<'a> {
    pub fn new(queue: &'a dyn BlobQueue, keys: &'a QueueKeys, settings: &'a CaptureConfig) -> Self {
        Self {
            queue,
            keys,
            settings,
            state: SessionState::Initializing,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /**
        Capture `seconds` of `url` and persist the artifacts.

        Any open, decode, encode or write failure ends the session with no
        partial artifacts pushed. Queue failures do not: each push is
        attempted and its outcome recorded in the report.
    */
    pub fn run(&mut self, url: &str, seconds: i64) -> Result<CaptureReport, CaptureError> {
        self.state = SessionState::Initializing;
        let requested = match requested_duration(seconds) {
            Ok(requested) => requested,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        let recording = match self.record(url, requested) {
            Ok(recording) => recording,
            Err(e) => {
                self.state = SessionState::Failed;
                tracing::error!(%url, error = %e, "capture failed");
                return Err(e);
            }
        };

        let persisted = self.persist(&recording);
        self.state = SessionState::Done;

        Ok(CaptureReport {
            bound: recording.bound,
            elapsed: recording.elapsed,
            av_bytes: recording.containers.av.len(),
            audio_bytes: recording.containers.audio.len(),
            thumbnail_bytes: recording.thumbnail.as_ref().map(Vec::len),
            mux: recording.mux,
            persisted,
        })
    }

    fn record(&mut self, url: &str, requested: Duration) -> Result<Recording, CaptureError> {
        let mut source = Source::open(url, self.settings.input_options()).stage(Stage::OpenInput)?;
        log_media_info(url, source.media_info());

        let (Some(video_config), Some(video_time_base)) =
            (source.video_codec_config().cloned(), source.video_time_base())
        else {
            return Err(CaptureError::config(format!("{url} has no video stream")));
        };
        let (Some(audio_config), Some(audio_time_base)) =
            (source.audio_codec_config().cloned(), source.audio_time_base())
        else {
            return Err(CaptureError::config(format!("{url} has no audio stream")));
        };

        let bound = effective_duration(requested, source.media_info().duration);

        let mut muxer = DualSink::open(&self.settings.av_format, &self.settings.audio_format)?;
        let mut thumbnails = ThumbnailExtractor::new(
            &video_config,
            video_time_base,
            self.settings.thumbnail_quality,
        )?;
        let mut audio = AudioPipeline::new(
            &audio_config,
            audio_time_base,
            self.settings,
            muxer.needs_global_header(),
        )?;
        muxer.start(&video_config, &audio.codec_config(), &audio_config)?;

        tracing::info!(
            video_decoder = %thumbnails.decoder().name(),
            audio_decoder = %audio.decoder().name(),
            sample_format = ?audio.decoder().sample_format(),
            sample_rate = audio.decoder().sample_rate(),
            bit_rate = audio.decoder().bit_rate(),
            aac_frame_size = audio.frame_size(),
            ?bound,
            "capture running"
        );
        self.state = SessionState::Running;

        let mut thumbnail = None;
        let started = Instant::now();
        while started.elapsed() < bound {
            let Some(packet) = source.next_packet().stage(Stage::ReadPacket)? else {
                tracing::debug!("input ended before the capture bound");
                break;
            };

            match packet.stream_type {
                StreamType::Video => {
                    if !thumbnails.is_done() {
                        thumbnail = thumbnails.offer(&packet)?;
                    }
                    muxer.write_video(&packet)?;
                }
                StreamType::Audio => {
                    muxer.write_source_audio(&packet)?;
                    for encoded in audio.process(&packet)? {
                        muxer.write_encoded_audio(&encoded)?;
                    }
                }
            }
        }
        let elapsed = started.elapsed();

        self.state = SessionState::Finalizing;
        for encoded in audio.finish()? {
            muxer.write_encoded_audio(&encoded)?;
        }

        let mux = muxer.stats();
        let containers = muxer.finish()?;
        if thumbnail.is_none() {
            tracing::warn!(%url, "no video frame decoded, capture has no thumbnail");
        }

        tracing::info!(
            ?elapsed,
            av_bytes = containers.av.len(),
            audio_bytes = containers.audio.len(),
            video_packets = mux.video_packets,
            encoded_audio_packets = mux.encoded_audio_packets,
            copied_audio_packets = mux.copied_audio_packets,
            "capture finished"
        );

        Ok(Recording {
            bound,
            elapsed,
            containers,
            thumbnail,
            mux,
        })
    }

    fn persist(&self, recording: &Recording) -> Vec<PersistOutcome> {
        let mut artifacts = vec![
            (self.keys.video.as_str(), recording.containers.av.as_slice()),
            (self.keys.audio.as_str(), recording.containers.audio.as_slice()),
        ];
        if let Some(jpeg) = &recording.thumbnail {
            artifacts.push((self.keys.image.as_str(), jpeg.as_slice()));
        }

        artifacts
            .into_iter()
            .map(|(key, bytes)| push_artifact(self.queue, key, bytes))
            .collect()
    }
}

fn push_artifact(queue: &dyn BlobQueue, key: &str, bytes: &[u8]) -> PersistOutcome {
    let error = match queue.push(key, bytes) {
        Ok(()) => {
            tracing::info!(key, bytes = bytes.len(), "artifact stored");
            None
        }
        Err(e) => {
            tracing::error!(key, bytes = bytes.len(), error = %e, "failed to store artifact");
            Some(e.to_string())
        }
    };

    PersistOutcome {
        key: key.to_string(),
        bytes: bytes.len(),
        error,
    }
}

fn log_media_info(url: &str, info: &MediaInfo) {
    tracing::info!(%url, format = %info.format_name, duration = ?info.duration, "input opened");

    if let Some(video) = &info.video {
        tracing::info!(
            codec = ?video.codec_id,
            width = video.width,
            height = video.height,
            pixel_format = ?video.pixel_format,
            fps = ?video.fps(),
            time_base = %video.time_base,
            "video stream"
        );
    }
    if let Some(audio) = &info.audio {
        tracing::info!(
            codec = ?audio.codec_id,
            sample_rate = audio.sample_rate,
            channels = audio.channels,
            sample_format = ?audio.sample_format,
            bitrate = ?audio.bitrate,
            time_base = %audio.time_base,
            "audio stream"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::queue::MemoryQueue;

    struct FailingQueue;

    impl BlobQueue for FailingQueue {
        fn push(&self, _key: &str, _bytes: &[u8]) -> Result<(), QueueError> {
            Err(QueueError::PoolExhausted(1))
        }

        fn get_all(&self, _key: &str) -> Result<Vec<Vec<u8>>, QueueError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn non_positive_durations_fail_before_opening() {
        let queue = MemoryQueue::new();
        let keys = QueueKeys::default();
        let settings = CaptureConfig::default();
        let mut session = CaptureSession::new(&queue, &keys, &settings);

        let result = session.run("rtsp://unreachable.invalid/stream", 0);
        assert!(matches!(result, Err(CaptureError::Config(_))));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn unopenable_inputs_fail_the_session() {
        let queue = MemoryQueue::new();
        let keys = QueueKeys::default();
        let settings = CaptureConfig::default();
        let mut session = CaptureSession::new(&queue, &keys, &settings);

        let result = session.run("/definitely/not/a/real/file.mp4", 5);
        assert!(matches!(
            result,
            Err(CaptureError::Stage { stage: Stage::OpenInput, .. })
        ));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(queue.len("VideoData"), 0);
    }

    #[test]
    fn push_failures_are_recorded_not_raised() {
        let outcome = push_artifact(&FailingQueue, "VideoData", b"mp4");
        assert_eq!(outcome.key, "VideoData");
        assert_eq!(outcome.bytes, 3);
        assert!(!outcome.is_ok());

        let queue = MemoryQueue::new();
        let outcome = push_artifact(&queue, "ImageData", b"jpeg");
        assert!(outcome.is_ok());
        assert_eq!(queue.get_all("ImageData").unwrap(), vec![b"jpeg".to_vec()]);
    }
}
