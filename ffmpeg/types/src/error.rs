/*!
    Error type shared by every crate in the pipeline.
*/

use thiserror::Error;

/**
    Result alias used throughout the ffmpeg crates.
*/
pub type Result<T, E = Error> = std::result::Result<T, E>;

/**
    Errors raised by the media primitives.

    Stream-control signals from FFmpeg ("try again", "end of file") are not
    represented here; the wrappers consume them as loop conditions.
*/
#[derive(Debug, Error)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid seek origin {0}")]
    InvalidOrigin(i32),
    #[error("negative offset {0}")]
    NegativeOffset(i64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }
}
