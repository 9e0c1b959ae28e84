/*!
    The two in-memory outputs of a capture session.
*/

use ffmpeg_sink::Sink;
use ffmpeg_source::CodecConfig;
use ffmpeg_types::{Packet, StreamType};

use crate::error::{CaptureError, Stage, StageContext};

/**
    Audio/video container plus audio-only container.

    The A/V output carries the copied video stream and the re-encoded AAC
    stream. The audio-only output carries the source audio stream copied
    as-is. Both live in memory until [`finish`](Self::finish) hands back
    their bytes.
*/
pub struct DualSink {
    av: Sink,
    audio: Sink,
}

/**
    Bytes of both finished containers.
*/
#[derive(Debug)]
pub struct Containers {
    pub av: Vec<u8>,
    pub audio: Vec<u8>,
}

/**
    Packet counts per output stream.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MuxStats {
    pub video_packets: u64,
    pub encoded_audio_packets: u64,
    pub copied_audio_packets: u64,
}

impl DualSink {
    pub fn open(av_format: &str, audio_format: &str) -> Result<Self, CaptureError> {
        Ok(Self {
            av: Sink::memory(av_format).stage(Stage::OpenSink)?,
            audio: Sink::memory(audio_format).stage(Stage::OpenSink)?,
        })
    }

    /// Whether encoders feeding the A/V output must put extradata in the header.
    pub fn needs_global_header(&self) -> bool {
        self.av.needs_global_header()
    }

    /**
        Declare the output streams and write both container headers.
    */
    pub fn start(
        &mut self,
        video: &CodecConfig,
        encoded_audio: &CodecConfig,
        source_audio: &CodecConfig,
    ) -> Result<(), CaptureError> {
        self.av
            .add_stream(StreamType::Video, video)
            .stage(Stage::OpenSink)?;
        self.av
            .add_stream(StreamType::Audio, encoded_audio)
            .stage(Stage::OpenSink)?;
        self.audio
            .add_stream(StreamType::Audio, source_audio)
            .stage(Stage::OpenSink)?;

        self.av.write_header().stage(Stage::WriteHeader)?;
        self.audio.write_header().stage(Stage::WriteHeader)?;

        tracing::debug!(
            av_format = self.av.format_name(),
            audio_format = self.audio.format_name(),
            video_time_base = ?self.av.time_base(StreamType::Video),
            audio_time_base = ?self.av.time_base(StreamType::Audio),
            "output headers written"
        );
        Ok(())
    }

    /// Stream-copy a source video packet into the A/V output.
    pub fn write_video(&mut self, packet: &Packet) -> Result<(), CaptureError> {
        self.av.write(packet).stage(Stage::WritePacket)
    }

    /// Stream-copy a source audio packet into the audio-only output.
    pub fn write_source_audio(&mut self, packet: &Packet) -> Result<(), CaptureError> {
        self.audio.write(packet).stage(Stage::WritePacket)
    }

    /// Write an AAC packet into the A/V output.
    pub fn write_encoded_audio(&mut self, packet: &Packet) -> Result<(), CaptureError> {
        self.av.write(packet).stage(Stage::WritePacket)
    }

    pub fn stats(&self) -> MuxStats {
        MuxStats {
            video_packets: self.av.packets_written(StreamType::Video),
            encoded_audio_packets: self.av.packets_written(StreamType::Audio),
            copied_audio_packets: self.audio.packets_written(StreamType::Audio),
        }
    }

    /**
        Write both trailers and take the container bytes.
    */
    pub fn finish(mut self) -> Result<Containers, CaptureError> {
        self.av.finish().stage(Stage::WriteTrailer)?;
        self.audio.finish().stage(Stage::WriteTrailer)?;

        Ok(Containers {
            av: self.av.take_bytes().stage(Stage::WriteTrailer)?,
            audio: self.audio.take_bytes().stage(Stage::WriteTrailer)?,
        })
    }
}
