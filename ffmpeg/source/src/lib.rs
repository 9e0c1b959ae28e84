/*!
    Input opening, stream discovery and demuxing for the capture pipeline.

    A [`Source`] is opened either from a location (file path or network URL,
    with string-keyed options such as `rtsp_transport`) or from a
    [`MemoryBuffer`](ffmpeg_io::MemoryBuffer) holding a previously captured
    container. It locates the first video and first audio stream and yields
    their encoded packets in container order.
*/

mod codec_config;
pub mod convert;
mod probe;
mod source;

pub use codec_config::CodecConfig;
pub use source::{Source, SourceOptions};
