/*!
    Audio and video decoding for the capture pipeline.

    Decoders are built from a [`CodecConfig`](ffmpeg_source::CodecConfig)
    taken from a source and turn encoded packets into raw frames. The codec
    library's "try again" and "end of stream" signals are handled here and
    never surface as errors.
*/

mod audio;
mod packet;
mod pump;
mod video;

pub use audio::AudioDecoder;
pub use video::VideoDecoder;
