/*!
    Audio decoder.
*/

use ffmpeg_next::{codec::decoder::Audio as OpenedAudio, util::frame::audio::Audio as RawAudio};

use ffmpeg_source::{
    CodecConfig,
    convert::{audio_frame_from_ffmpeg, sample_format_from_ffmpeg},
};
use ffmpeg_types::{AudioFrame, Error, Packet, Rational, Result, SampleFormat};

use crate::packet::to_ffmpeg_packet;
use crate::pump::{decoder_for, pump};

/**
    Decodes the capture source's audio stream.

    Frames keep the decoder's native layout: planar formats come out with
    one plane per channel, packed formats as a single interleaved plane.
    Empty frames are dropped.
*/
pub struct AudioDecoder {
    decoder: OpenedAudio,
    scratch: RawAudio,
    time_base: Rational,
}

impl AudioDecoder {
    /**
        Open a decoder for a source audio stream whose packets are stamped
        in `time_base`.
    */
    pub fn new(codec_config: &CodecConfig, time_base: Rational) -> Result<Self> {
        let decoder = decoder_for(codec_config)?
            .audio()
            .map_err(|e| Error::codec(format!("failed to open audio decoder: {e}")))?;

        Ok(Self {
            decoder,
            scratch: RawAudio::empty(),
            time_base,
        })
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Codec implementation name, e.g. "aac" or "pcm_alaw".
    pub fn name(&self) -> String {
        self.decoder
            .codec()
            .map_or_else(|| "unknown".to_string(), |c| c.name().to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.decoder.rate()
    }

    pub fn channels(&self) -> u16 {
        self.decoder.channels() as u16
    }

    pub fn sample_format(&self) -> Option<SampleFormat> {
        sample_format_from_ffmpeg(self.decoder.format())
    }

    pub fn bit_rate(&self) -> usize {
        self.decoder.bit_rate()
    }

    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<AudioFrame>> {
        let packet = to_ffmpeg_packet(packet);
        self.run(Some(&packet))
    }

    /**
        Signal end of input and collect whatever the decoder still holds.
    */
    pub fn flush(&mut self) -> Result<Vec<AudioFrame>> {
        self.run(None)
    }

    fn run(&mut self, packet: Option<&ffmpeg_next::Packet>) -> Result<Vec<AudioFrame>> {
        let time_base = self.time_base;
        let mut frames = Vec::new();
        pump(&mut self.decoder, packet, &mut self.scratch, |raw| {
            if raw.samples() > 0 {
                frames.push(audio_frame_from_ffmpeg(raw, time_base)?);
            }
            Ok(())
        })?;
        Ok(frames)
    }
}

impl std::fmt::Debug for AudioDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDecoder")
            .field("name", &self.name())
            .field("sample_rate", &self.sample_rate())
            .field("channels", &self.channels())
            .field("time_base", &self.time_base)
            .finish_non_exhaustive()
    }
}
