/*!
    AAC encoding for the capture pipeline.

    The capture session re-encodes the camera's audio track to AAC for the
    audio+video container. AAC consumes fixed-size blocks; callers feed it
    through a FIFO and only the final block may be short.

    ```ignore
    use ffmpeg_encode::{AacEncoder, AacSettings};

    let mut encoder = AacEncoder::open(AacSettings::new(8000, 1).global_header(true))?;
    let block_size = encoder.frame_size().unwrap_or(1024);

    for block in fifo.drain(block_size, false) {
        for packet in encoder.encode(&block)? {
            sink.write(&packet)?;
        }
    }
    ```
*/

mod audio;
mod settings;

pub use audio::AacEncoder;
pub use settings::{AacSettings, DEFAULT_AAC_BITRATE};
