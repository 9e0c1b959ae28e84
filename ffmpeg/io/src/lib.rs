/*!
    In-memory byte I/O for the capture pipeline's ffmpeg crates.

    Muxers write into, and demuxers read from, a [`MemoryBuffer`] instead of a
    file. [`AvioContext`] adapts a buffer to FFmpeg's custom I/O callbacks so
    that a container can be produced or consumed entirely in memory.
*/

mod avio;
mod buffer;

pub use avio::AvioContext;
pub use buffer::{MemoryBuffer, Whence};
