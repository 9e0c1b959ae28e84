use std::fmt;

use thiserror::Error;

/**
    Pipeline stage a fatal error happened in.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    OpenInput,
    OpenDecoder,
    OpenEncoder,
    OpenSink,
    WriteHeader,
    ReadPacket,
    Decode,
    Resample,
    Encode,
    WritePacket,
    WriteTrailer,
    Thumbnail,
    ConcatOpen,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::OpenInput => "open-input",
            Stage::OpenDecoder => "open-decoder",
            Stage::OpenEncoder => "open-encoder",
            Stage::OpenSink => "open-sink",
            Stage::WriteHeader => "write-header",
            Stage::ReadPacket => "read-packet",
            Stage::Decode => "decode",
            Stage::Resample => "resample",
            Stage::Encode => "encode",
            Stage::WritePacket => "write-packet",
            Stage::WriteTrailer => "write-trailer",
            Stage::Thumbnail => "thumbnail",
            Stage::ConcatOpen => "concat-open",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("connection pool exhausted ({0} active)")]
    PoolExhausted(usize),

    #[error("queue lock poisoned")]
    Poisoned,
}

/**
    Errors from a capture or concatenation run.
*/
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Rejected before any resource was opened.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ffmpeg_types::Error,
    },

    #[error("queue: {0}")]
    Queue(#[from] QueueError),

    #[error("thumbnail encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("no clips stored under key {0}")]
    NoClips(String),
}

impl CaptureError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/**
    Attach a pipeline stage to a library error.
*/
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, CaptureError>;
}

impl<T> StageContext<T> for ffmpeg_types::Result<T> {
    fn stage(self, stage: Stage) -> Result<T, CaptureError> {
        self.map_err(|source| CaptureError::Stage { stage, source })
    }
}
