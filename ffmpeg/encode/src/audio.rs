/*!
    AAC encoder.
*/

use ffmpeg_next::{
    codec::{self, encoder::Audio as OpenedEncoder},
    ffi,
};

use ffmpeg_source::{
    CodecConfig,
    convert::{audio_frame_to_ffmpeg, channel_layout_for, pts_from_ffmpeg, sample_format_to_ffmpeg},
};
use ffmpeg_types::{AudioFrame, Error, MediaDuration, Packet, Rational, Result, StreamType};

use crate::settings::AacSettings;

/**
    Encodes planar float blocks into AAC packets.

    Every block is stamped with the number of samples sent before it, so
    packet timestamps count samples in a `1/sample_rate` time base.
*/
pub struct AacEncoder {
    encoder: OpenedEncoder,
    settings: AacSettings,
    time_base: Rational,
    samples_sent: i64,
}

impl AacEncoder {
    pub fn open(settings: AacSettings) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

        let aac = ffmpeg_next::encoder::find(codec::Id::AAC)
            .ok_or_else(|| Error::unsupported_format("this FFmpeg build has no AAC encoder"))?;
        let mut encoder = codec::context::Context::new_with_codec(aac)
            .encoder()
            .audio()
            .map_err(|e| Error::codec(e.to_string()))?;

        let time_base = Rational::new(1, settings.sample_rate as i32);
        encoder.set_format(sample_format_to_ffmpeg(AacSettings::SAMPLE_FORMAT)?);
        encoder.set_rate(settings.sample_rate as i32);
        encoder.set_channel_layout(channel_layout_for(settings.channels));
        encoder.set_time_base(ffmpeg_next::Rational::new(time_base.num, time_base.den));
        encoder.set_bit_rate(settings.bitrate as usize);
        if settings.global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open()
            .map_err(|e| Error::codec(format!("failed to open AAC encoder: {e}")))?;

        Ok(Self {
            encoder,
            settings,
            time_base,
            samples_sent: 0,
        })
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn settings(&self) -> &AacSettings {
        &self.settings
    }

    /**
        Samples per block the encoder wants, `None` when any size goes.
    */
    pub fn frame_size(&self) -> Option<usize> {
        match self.encoder.frame_size() {
            0 => None,
            size => Some(size as usize),
        }
    }

    /// Parameters of the opened encoder, for declaring the stream it feeds.
    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig::from_parameters(codec::Parameters::from(&self.encoder))
    }

    /**
        Encode one block. Depending on the encoder's lookahead this yields
        no packets, one, or several.
    */
    pub fn encode(&mut self, block: &AudioFrame) -> Result<Vec<Packet>> {
        if block.samples == 0 {
            return Ok(Vec::new());
        }
        if block.format != AacSettings::SAMPLE_FORMAT || block.channels != self.settings.channels {
            return Err(Error::invalid_data(format!(
                "AAC block must be {:?} x{}, got {:?} x{}",
                AacSettings::SAMPLE_FORMAT,
                self.settings.channels,
                block.format,
                block.channels
            )));
        }

        let mut raw = audio_frame_to_ffmpeg(block)?;
        raw.set_pts(Some(self.samples_sent));
        self.samples_sent += block.samples as i64;

        let mut packets = Vec::new();
        if let Err(e) = self.encoder.send_frame(&raw) {
            if !is_again(&e) {
                return Err(Error::codec(e.to_string()));
            }
            // Full input queue: take what is ready, then the block fits
            self.collect(&mut packets)?;
            self.encoder
                .send_frame(&raw)
                .map_err(|e| Error::codec(e.to_string()))?;
        }
        self.collect(&mut packets)?;
        Ok(packets)
    }

    /**
        Signal end of input and collect the encoder's remaining packets.
    */
    pub fn flush(&mut self) -> Result<Vec<Packet>> {
        match self.encoder.send_eof() {
            Ok(()) | Err(ffmpeg_next::Error::Eof) => {}
            Err(e) => return Err(Error::codec(e.to_string())),
        }

        let mut packets = Vec::new();
        self.collect(&mut packets)?;
        Ok(packets)
    }

    fn collect(&mut self, packets: &mut Vec<Packet>) -> Result<()> {
        let mut encoded = ffmpeg_next::Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut encoded) {
                Ok(()) => packets.push(Packet::new(
                    encoded.data().map(<[u8]>::to_vec).unwrap_or_default(),
                    pts_from_ffmpeg(encoded.pts()),
                    pts_from_ffmpeg(encoded.dts()),
                    MediaDuration(encoded.duration()),
                    self.time_base,
                    encoded.is_key(),
                    StreamType::Audio,
                )),
                Err(ffmpeg_next::Error::Eof) => return Ok(()),
                Err(e) if is_again(&e) => return Ok(()),
                Err(e) => return Err(Error::codec(e.to_string())),
            }
        }
    }
}

fn is_again(error: &ffmpeg_next::Error) -> bool {
    matches!(error, ffmpeg_next::Error::Other { errno } if *errno == ffi::EAGAIN)
}

impl std::fmt::Debug for AacEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AacEncoder")
            .field("settings", &self.settings)
            .field("frame_size", &self.frame_size())
            .field("samples_sent", &self.samples_sent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_types::SampleFormat;

    fn silence(format: SampleFormat, channels: u16, samples: usize) -> AudioFrame {
        let planes = AudioFrame::plane_count(format, channels);
        let bytes = samples * AudioFrame::bytes_per_plane_sample(format, channels);
        AudioFrame::new(
            vec![vec![0u8; bytes]; planes],
            samples,
            8000,
            channels,
            format,
            None,
            Rational::new(1, 8000),
        )
    }

    #[test]
    fn encoder_reports_aac_block_size() {
        let encoder = AacEncoder::open(AacSettings::new(8000, 1)).unwrap();
        assert_eq!(encoder.frame_size(), Some(1024));
        assert_eq!(encoder.time_base(), Rational::new(1, 8000));
        assert_eq!(encoder.codec_config().codec_name(), "aac");
    }

    #[test]
    fn wrong_layout_blocks_are_rejected() {
        let mut encoder = AacEncoder::open(AacSettings::new(8000, 1)).unwrap();
        let packed = silence(SampleFormat::S16, 1, 1024);
        assert!(encoder.encode(&packed).is_err());
    }

    #[test]
    fn silence_encodes_and_flushes() {
        let mut encoder = AacEncoder::open(AacSettings::new(8000, 1)).unwrap();
        let mut packets = Vec::new();
        for _ in 0..4 {
            packets.extend(encoder.encode(&silence(SampleFormat::F32p, 1, 1024)).unwrap());
        }
        packets.extend(encoder.flush().unwrap());

        assert!(!packets.is_empty());
        assert!(packets.iter().all(|p| p.stream_type == StreamType::Audio));
        assert!(packets.iter().all(|p| p.time_base == Rational::new(1, 8000)));
    }
}
