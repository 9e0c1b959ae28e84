/*!
    Audio re-encoding path: decode, resample, re-block, encode.
*/

use ffmpeg_decode::AudioDecoder;
use ffmpeg_encode::{AacEncoder, AacSettings};
use ffmpeg_source::CodecConfig;
use ffmpeg_transform::{AudioFifo, ResampleTarget, Resampler};
use ffmpeg_types::{AudioFrame, Packet, Rational};

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Stage, StageContext};

/// Frame size assumed when the encoder accepts any block size.
const DEFAULT_FRAME_SIZE: usize = 1024;

/**
    Turns source audio packets into AAC packets.

    Decoded frames are resampled to the encoder's planar float format and
    queued in a FIFO, which hands the encoder blocks of exactly its frame
    size. Only [`finish`](Self::finish) may emit a shorter final block.
*/
pub struct AudioPipeline {
    decoder: AudioDecoder,
    resampler: Resampler,
    fifo: AudioFifo,
    encoder: AacEncoder,
    frame_size: usize,
}

impl AudioPipeline {
    /**
        Open the decoder for the source stream and an AAC encoder matching
        its channel count. The encoder rate is the configured one, else the
        source rate.
    */
    pub fn new(
        codec_config: &CodecConfig,
        time_base: Rational,
        settings: &CaptureConfig,
        global_header: bool,
    ) -> Result<Self, CaptureError> {
        let decoder = AudioDecoder::new(codec_config, time_base).stage(Stage::OpenDecoder)?;

        let sample_rate = settings.audio_sample_rate.unwrap_or(decoder.sample_rate());
        let channels = decoder.channels();
        let aac = AacSettings::new(sample_rate, channels)
            .bitrate(settings.audio_bitrate)
            .global_header(global_header);
        let sample_format = AacSettings::SAMPLE_FORMAT;

        let encoder = AacEncoder::open(aac).stage(Stage::OpenEncoder)?;
        let frame_size = encoder.frame_size().unwrap_or(DEFAULT_FRAME_SIZE);

        tracing::debug!(
            decoder = %decoder.name(),
            sample_rate,
            channels,
            frame_size,
            "audio pipeline ready"
        );

        Ok(Self {
            decoder,
            resampler: Resampler::new(ResampleTarget::new(
                sample_rate,
                channels,
                sample_format,
            )),
            fifo: AudioFifo::new(sample_format, channels, sample_rate),
            encoder,
            frame_size,
        })
    }

    pub fn decoder(&self) -> &AudioDecoder {
        &self.decoder
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Parameters of the encoded stream, for declaring it on a sink.
    pub fn codec_config(&self) -> CodecConfig {
        self.encoder.codec_config()
    }

    /**
        Run one source packet through the pipeline. Returned packets are in
        the encoder's time base.
    */
    pub fn process(&mut self, packet: &Packet) -> Result<Vec<Packet>, CaptureError> {
        let frames = self.decoder.decode(packet).stage(Stage::Decode)?;

        let mut packets = Vec::new();
        for frame in &frames {
            packets.extend(self.push_frame(frame)?);
        }
        Ok(packets)
    }

    /**
        Drain everything still buffered: decoder, resampler delay, the FIFO
        remainder as one short block, then the encoder itself.
    */
    pub fn finish(&mut self) -> Result<Vec<Packet>, CaptureError> {
        let mut packets = Vec::new();

        for frame in self.decoder.flush().stage(Stage::Decode)? {
            packets.extend(self.push_frame(&frame)?);
        }

        while let Some(frame) = self.resampler.flush().stage(Stage::Resample)? {
            if frame.is_empty() {
                break;
            }
            self.fifo.write(&frame).stage(Stage::Resample)?;
            packets.extend(self.encode_blocks(false)?);
        }

        packets.extend(self.encode_blocks(true)?);
        packets.extend(self.encoder.flush().stage(Stage::Encode)?);
        Ok(packets)
    }

    fn push_frame(&mut self, frame: &AudioFrame) -> Result<Vec<Packet>, CaptureError> {
        let resampled = self.resampler.convert(frame).stage(Stage::Resample)?;
        if !resampled.is_empty() {
            self.fifo.write(&resampled).stage(Stage::Resample)?;
        }

        // Keep the resampler from hoarding more than a frame's worth
        while self.resampler.delay() >= self.frame_size {
            match self.resampler.flush().stage(Stage::Resample)? {
                Some(buffered) if !buffered.is_empty() => {
                    self.fifo.write(&buffered).stage(Stage::Resample)?;
                }
                _ => break,
            }
        }

        self.encode_blocks(false)
    }

    fn encode_blocks(&mut self, flush: bool) -> Result<Vec<Packet>, CaptureError> {
        let mut packets = Vec::new();
        for block in self.fifo.drain(self.frame_size, flush) {
            packets.extend(self.encoder.encode(&block).stage(Stage::Encode)?);
        }
        Ok(packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn pipeline_at(sample_rate: u32) -> (AudioPipeline, Vec<Packet>) {
        let mut camera = fixtures::open_aac(true);
        let mut packets = fixtures::silence_packets(&mut camera, 8 * 1024);
        packets.extend(camera.flush().unwrap());

        let settings = CaptureConfig {
            audio_sample_rate: Some(sample_rate),
            ..CaptureConfig::default()
        };
        let pipeline =
            AudioPipeline::new(&camera.codec_config(), camera.time_base(), &settings, true)
                .unwrap();
        (pipeline, packets)
    }

    #[test]
    fn encoder_follows_the_configured_rate() {
        let (pipeline, _) = pipeline_at(11025);
        assert_eq!(pipeline.frame_size(), 1024);
        assert_eq!(pipeline.decoder().sample_rate(), fixtures::SAMPLE_RATE);
        assert_eq!(pipeline.codec_config().codec_name(), "aac");
    }

    #[test]
    fn finish_encodes_the_fifo_remainder() {
        let (mut pipeline, packets) = pipeline_at(11025);

        let mut encoded = Vec::new();
        for packet in &packets {
            encoded.extend(pipeline.process(packet).unwrap());
        }
        assert!(!encoded.is_empty());
        assert!(pipeline.fifo.size() < pipeline.frame_size());
        let buffered = pipeline.fifo.size() + pipeline.resampler.delay();

        let tail = pipeline.finish().unwrap();
        assert!(pipeline.fifo.is_empty());
        assert!(!tail.is_empty());

        let tail_samples: i64 = tail.iter().map(|p| p.duration.0).sum();
        assert!(tail_samples >= buffered as i64);
        assert!(
            encoded
                .iter()
                .chain(&tail)
                .all(|p| p.time_base == Rational::new(1, 11025))
        );
    }
}
