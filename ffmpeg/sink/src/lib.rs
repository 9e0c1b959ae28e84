/*!
    In-memory container muxing for the capture pipeline.

    A [`Sink`] writes a container (mp4, wav, ...) into a
    [`MemoryBuffer`](ffmpeg_io::MemoryBuffer) instead of a file. Streams are
    declared by copying codec parameters, either from a source stream
    (stream copy) or from an opened encoder. The header is written once all
    streams are declared, and the trailer exactly once at the end; no packet
    may be written outside that window.

    ```ignore
    let mut sink = Sink::memory("mp4")?;
    sink.add_stream(StreamType::Video, source.video_codec_config().unwrap())?;
    sink.add_stream(StreamType::Audio, &encoder.codec_config())?;
    sink.write_header()?;

    while let Some(packet) = source.next_packet()? {
        sink.write(&packet)?;
    }

    sink.finish()?;
    let bytes = sink.take_bytes()?;
    ```
*/

mod sink;

pub use sink::Sink;
