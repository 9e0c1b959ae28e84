/*!
    Shared types for the capture pipeline's ffmpeg crates.

    This crate defines the vocabulary passed between the source, decode,
    transform, encode and sink crates. It has no dependency on FFmpeg, so the
    timestamp arithmetic and stream descriptions can be tested on their own.
*/

mod error;
mod format;
mod frame;
mod packet;
mod rational;
mod stream;

pub use error::{Error, Result};
pub use format::{CodecId, PixelFormat, SampleFormat};
pub use frame::{AudioFrame, VideoFrame};
pub use packet::{MediaDuration, Packet, Pts, StreamType};
pub use rational::{Rational, rescale};
pub use stream::{AudioStreamInfo, MediaInfo, VideoStreamInfo};
