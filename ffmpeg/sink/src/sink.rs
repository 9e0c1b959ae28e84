/*!
    Media sink implementation.
*/

use std::ffi::{CString, c_int};
use std::ptr;

use ffmpeg_next::{codec, ffi, format, format::context::Output as OutputContext};

use ffmpeg_io::{AvioContext, MemoryBuffer};
use ffmpeg_source::{CodecConfig, convert::rational_from_ffmpeg};
use ffmpeg_types::{Error, Packet, Rational, Result, StreamType, rescale};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SinkState {
    /// Streams may still be added.
    Configuring,
    /// Header written; packets may be written.
    Writing,
    /// Trailer written; the buffer is complete.
    Finished,
}

#[derive(Clone, Copy, Debug)]
struct OutputStream {
    index: usize,
    /// Only known once the header is written; the muxer may replace the
    /// time base requested when the stream was added.
    time_base: Option<Rational>,
    packets: u64,
}

/**
    Container writer bound to a memory buffer.
*/
pub struct Sink {
    output: OutputContext,
    format_name: String,
    video: Option<OutputStream>,
    audio: Option<OutputStream>,
    state: SinkState,
    /// Declared after `output` so the muxer is freed before its I/O.
    io: AvioContext,
}

impl Sink {
    /**
        Create a sink writing the named container format (e.g. "mp4", "wav")
        into a fresh memory buffer.
    */
    pub fn memory(format_name: &str) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

        let c_name = CString::new(format_name)
            .map_err(|_| Error::invalid_data("format name contains a NUL byte"))?;
        let mut io = AvioContext::writer(MemoryBuffer::new())?;

        let output = unsafe {
            let mut ctx: *mut ffi::AVFormatContext = ptr::null_mut();
            let ret = ffi::avformat_alloc_output_context2(
                &mut ctx,
                ptr::null(),
                c_name.as_ptr(),
                ptr::null(),
            );
            if ret < 0 || ctx.is_null() {
                return Err(Error::unsupported_format(format!(
                    "no muxer for format {format_name}"
                )));
            }
            (*ctx).pb = io.as_mut_ptr();
            (*ctx).flags |= ffi::AVFMT_FLAG_CUSTOM_IO as c_int;
            OutputContext::wrap(ctx)
        };

        Ok(Self {
            output,
            format_name: format_name.to_string(),
            video: None,
            audio: None,
            state: SinkState::Configuring,
            io,
        })
    }

    pub fn format_name(&self) -> &str {
        &self.format_name
    }

    /**
        Whether encoders feeding this container must put their extradata in
        the header (`AV_CODEC_FLAG_GLOBAL_HEADER`).
    */
    pub fn needs_global_header(&self) -> bool {
        self.output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER)
    }

    /**
        Declare an output stream with the given codec parameters.

        The codec tag is cleared so the container picks its own. Returns the
        output stream index.
    */
    pub fn add_stream(
        &mut self,
        stream_type: StreamType,
        codec_config: &CodecConfig,
    ) -> Result<usize> {
        if self.state != SinkState::Configuring {
            return Err(Error::invalid_data("cannot add streams after the header"));
        }
        if self.stream(stream_type).is_some() {
            return Err(Error::invalid_data(format!(
                "{stream_type:?} stream already declared"
            )));
        }
        let medium_matches = match stream_type {
            StreamType::Video => codec_config.is_video(),
            StreamType::Audio => codec_config.is_audio(),
        };
        if !medium_matches {
            return Err(Error::invalid_data(format!(
                "{} parameters cannot back a {stream_type:?} stream",
                codec_config.codec_name()
            )));
        }

        let mut stream = self
            .output
            .add_stream(ffmpeg_next::encoder::find(codec::Id::None))
            .map_err(|e| Error::codec(format!("failed to add {stream_type:?} stream: {e}")))?;
        stream.set_parameters(codec_config.parameters().clone());
        unsafe {
            (*stream.parameters().as_mut_ptr()).codec_tag = 0;
        }

        let index = stream.index();
        let declared = Some(OutputStream {
            index,
            time_base: None,
            packets: 0,
        });
        match stream_type {
            StreamType::Video => self.video = declared,
            StreamType::Audio => self.audio = declared,
        }
        Ok(index)
    }

    /**
        Write the container header and record each stream's final time base.
    */
    pub fn write_header(&mut self) -> Result<()> {
        if self.state != SinkState::Configuring {
            return Err(Error::invalid_data("header already written"));
        }
        if self.video.is_none() && self.audio.is_none() {
            return Err(Error::invalid_data("sink has no streams"));
        }

        self.output
            .write_header()
            .map_err(|e| Error::codec(format!("failed to write header: {e}")))?;

        for declared in [&mut self.video, &mut self.audio].into_iter().flatten() {
            let stream = self
                .output
                .stream(declared.index)
                .ok_or_else(|| Error::codec("output stream vanished after header"))?;
            declared.time_base = Some(rational_from_ffmpeg(stream.time_base()));
        }

        self.state = SinkState::Writing;
        Ok(())
    }

    /**
        Time base of an output stream. Only available after the header.
    */
    pub fn time_base(&self, stream_type: StreamType) -> Option<Rational> {
        self.stream(stream_type).and_then(|s| s.time_base)
    }

    pub fn stream_index(&self, stream_type: StreamType) -> Option<usize> {
        self.stream(stream_type).map(|s| s.index)
    }

    /**
        Number of packets written to a stream so far.
    */
    pub fn packets_written(&self, stream_type: StreamType) -> u64 {
        self.stream(stream_type).map_or(0, |s| s.packets)
    }

    fn stream(&self, stream_type: StreamType) -> Option<&OutputStream> {
        match stream_type {
            StreamType::Video => self.video.as_ref(),
            StreamType::Audio => self.audio.as_ref(),
        }
    }

    /**
        Write a packet to the output stream matching its type.

        Timestamps are rescaled from the packet's time base to the stream's,
        and the byte position is left for the muxer to fill in.
    */
    pub fn write(&mut self, packet: &Packet) -> Result<()> {
        match self.state {
            SinkState::Configuring => return Err(Error::invalid_data("header not written")),
            SinkState::Finished => {
                return Err(Error::invalid_data("packet written after trailer"));
            }
            SinkState::Writing => {}
        }

        let declared = match packet.stream_type {
            StreamType::Video => self.video.as_mut(),
            StreamType::Audio => self.audio.as_mut(),
        }
        .ok_or_else(|| {
            Error::invalid_data(format!("no {:?} stream declared", packet.stream_type))
        })?;
        let stream_tb = declared
            .time_base
            .ok_or_else(|| Error::codec("stream time base unknown"))?;

        let mut ffmpeg_pkt = if packet.data.is_empty() {
            ffmpeg_next::Packet::empty()
        } else {
            ffmpeg_next::Packet::copy(&packet.data)
        };

        ffmpeg_pkt.set_stream(declared.index);
        ffmpeg_pkt.set_pts(packet.pts.map(|p| rescale(p.0, packet.time_base, stream_tb)));
        ffmpeg_pkt.set_dts(packet.dts.map(|d| rescale(d.0, packet.time_base, stream_tb)));
        ffmpeg_pkt.set_duration(rescale(packet.duration.0, packet.time_base, stream_tb));
        ffmpeg_pkt.set_position(-1);
        if packet.is_keyframe {
            ffmpeg_pkt.set_flags(ffmpeg_next::packet::Flags::KEY);
        }

        ffmpeg_pkt
            .write_interleaved(&mut self.output)
            .map_err(|e| Error::codec(format!("failed to write packet: {e}")))?;
        declared.packets += 1;

        Ok(())
    }

    /**
        Write the trailer and flush everything into the buffer.

        Must be called exactly once, after the header; the buffer is
        incomplete until then.
    */
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            SinkState::Configuring => return Err(Error::invalid_data("header not written")),
            SinkState::Finished => return Err(Error::invalid_data("trailer already written")),
            SinkState::Writing => {}
        }

        // No second attempt at the trailer, whatever the outcome
        self.state = SinkState::Finished;
        self.output
            .write_trailer()
            .map_err(|e| Error::codec(format!("failed to write trailer: {e}")))?;
        self.io.flush();

        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.state == SinkState::Finished
    }

    /**
        Bytes written so far.
    */
    pub fn bytes(&self) -> &[u8] {
        self.io.buffer().bytes()
    }

    /**
        Take the finished container out of the sink.
    */
    pub fn take_bytes(&mut self) -> Result<Vec<u8>> {
        if self.state != SinkState::Finished {
            return Err(Error::invalid_data("container taken before trailer"));
        }
        Ok(self.io.take_buffer().into_bytes())
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        // The output context would otherwise avio_close() our custom I/O
        unsafe {
            (*self.output.as_mut_ptr()).pb = ptr::null_mut();
        }
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("format", &self.format_name)
            .field("video", &self.video)
            .field("audio", &self.audio)
            .field("state", &self.state)
            .field("bytes", &self.io.buffer().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_encode::{AacEncoder, AacSettings};
    use ffmpeg_source::{Source, SourceOptions};
    use ffmpeg_types::{AudioFrame, MediaDuration, Pts, SampleFormat};

    fn audio_packet() -> Packet {
        Packet::new(
            vec![0; 16],
            Some(Pts(0)),
            Some(Pts(0)),
            MediaDuration(1024),
            Rational::new(1, 48000),
            true,
            StreamType::Audio,
        )
    }

    #[test]
    fn unknown_formats_are_rejected() {
        assert!(Sink::memory("definitely-not-a-muxer").is_err());
    }

    #[test]
    fn packets_before_header_are_rejected() {
        let mut sink = Sink::memory("wav").unwrap();
        assert!(sink.write(&audio_packet()).is_err());
        assert!(sink.finish().is_err());
        assert!(sink.take_bytes().is_err());
    }

    #[test]
    fn header_needs_a_stream() {
        let mut sink = Sink::memory("mp4").unwrap();
        assert!(sink.write_header().is_err());
        assert!(sink.time_base(StreamType::Video).is_none());
    }

    fn aac_packets(encoder: &mut AacEncoder, blocks: usize) -> Vec<Packet> {
        let mut packets = Vec::new();
        for _ in 0..blocks {
            let block = AudioFrame::new(
                vec![vec![0u8; 1024 * 4]],
                1024,
                8000,
                1,
                SampleFormat::F32p,
                None,
                Rational::new(1, 8000),
            );
            packets.extend(encoder.encode(&block).unwrap());
        }
        packets.extend(encoder.flush().unwrap());
        packets
    }

    #[test]
    fn written_packets_read_back() {
        let mut sink = Sink::memory("mp4").unwrap();
        let settings = AacSettings::new(8000, 1).global_header(sink.needs_global_header());
        let mut encoder = AacEncoder::open(settings).unwrap();
        sink.add_stream(StreamType::Audio, &encoder.codec_config()).unwrap();
        sink.write_header().unwrap();
        assert!(sink.time_base(StreamType::Audio).is_some());

        let packets = aac_packets(&mut encoder, 8);
        for packet in &packets {
            sink.write(packet).unwrap();
        }
        assert_eq!(sink.packets_written(StreamType::Audio), packets.len() as u64);
        sink.finish().unwrap();

        let bytes = sink.take_bytes().unwrap();
        let options = SourceOptions::default().with_format("mp4");
        let mut source = Source::from_memory(MemoryBuffer::from_bytes(bytes), options).unwrap();
        assert!(source.video_codec_config().is_none());
        assert_eq!(source.audio_codec_config().unwrap().codec_name(), "aac");

        let mut read = 0;
        while let Some(packet) = source.next_packet().unwrap() {
            assert_eq!(packet.stream_type, StreamType::Audio);
            read += 1;
        }
        assert_eq!(read, packets.len());
    }

    #[test]
    fn lifecycle_is_header_then_packets_then_one_trailer() {
        let mut sink = Sink::memory("mp4").unwrap();
        let settings = AacSettings::new(8000, 1).global_header(true);
        let mut encoder = AacEncoder::open(settings).unwrap();
        let config = encoder.codec_config();

        sink.add_stream(StreamType::Audio, &config).unwrap();
        assert!(sink.add_stream(StreamType::Audio, &config).is_err());
        assert!(sink.add_stream(StreamType::Video, &config).is_err());
        sink.write_header().unwrap();
        assert!(sink.write_header().is_err());

        let packets = aac_packets(&mut encoder, 2);
        sink.write(&packets[0]).unwrap();
        sink.finish().unwrap();
        assert!(sink.is_finished());

        assert!(sink.write(&packets[1]).is_err());
        assert!(sink.finish().is_err());
        assert_eq!(sink.packets_written(StreamType::Audio), 1);
        assert!(!sink.take_bytes().unwrap().is_empty());
    }
}
