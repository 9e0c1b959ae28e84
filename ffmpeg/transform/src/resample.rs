/*!
    Sample format, rate and channel conversion.
*/

use ffmpeg_next::{
    software::resampling::context::Context as SwrContext,
    util::frame::audio::Audio as RawAudio,
};

use ffmpeg_source::convert::{
    audio_frame_from_ffmpeg, audio_frame_to_ffmpeg, channel_layout_for, sample_format_to_ffmpeg,
};
use ffmpeg_types::{AudioFrame, Error, Rational, Result, SampleFormat};

/// Extra output room on top of the rate-scaled input length.
const OUTPUT_SLACK: usize = 32;

/**
    What the resampler converts to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResampleTarget {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
}

impl ResampleTarget {
    pub fn new(sample_rate: u32, channels: u16, format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            format,
        }
    }

    fn time_base(&self) -> Rational {
        Rational::new(1, self.sample_rate as i32)
    }
}

/// Shape of the input the current context was built for.
#[derive(Clone, Copy, PartialEq, Eq)]
struct InputShape {
    sample_rate: u32,
    channels: u16,
    format: SampleFormat,
}

impl InputShape {
    fn of(frame: &AudioFrame) -> Self {
        Self {
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            format: frame.format,
        }
    }
}

/**
    Converts decoded audio into the encoder's sample layout.

    The underlying context is built on the first frame and rebuilt when the
    input shape changes mid-stream. Conversion is stateful: a call may return
    fewer samples than it was given, or none, with the rest held back in the
    context. [`delay`](Self::delay) tells how much is held and
    [`flush`](Self::flush) releases it.

    Output frames are stamped in `1/target_rate` without a pts; the encoder
    assigns its own timestamps.
*/
pub struct Resampler {
    target: ResampleTarget,
    context: Option<(InputShape, SwrContext)>,
}

impl Resampler {
    pub fn new(target: ResampleTarget) -> Self {
        Self {
            target,
            context: None,
        }
    }

    pub fn target(&self) -> ResampleTarget {
        self.target
    }

    /**
        Convert one frame. The result may hold zero samples.
    */
    pub fn convert(&mut self, frame: &AudioFrame) -> Result<AudioFrame> {
        if frame.planes.is_empty() || frame.sample_rate == 0 {
            return Err(Error::invalid_data("cannot resample a frame without samples or rate"));
        }

        let shape = InputShape::of(frame);
        let rebuild = self.context.as_ref().is_none_or(|(current, _)| *current != shape);
        if rebuild {
            self.context = Some((shape, self.build_context(shape)?));
        }

        let held = self.delay();
        let scaled = (frame.samples as u64 * u64::from(self.target.sample_rate))
            .div_ceil(u64::from(frame.sample_rate)) as usize;
        let mut output = self.output_frame(scaled + held + OUTPUT_SLACK)?;

        let input = audio_frame_to_ffmpeg(frame)?;
        let Some((_, context)) = self.context.as_mut() else {
            return Err(Error::codec("resampler context missing"));
        };
        context
            .run(&input, &mut output)
            .map_err(|e| Error::codec(format!("resampling failed: {e}")))?;

        audio_frame_from_ffmpeg(&output, self.target.time_base())
    }

    /**
        Output samples currently held back inside the context.
    */
    pub fn delay(&self) -> usize {
        self.context
            .as_ref()
            .and_then(|(_, context)| context.delay())
            .map_or(0, |delay| delay.output.max(0) as usize)
    }

    /**
        Release held-back samples. `None` once the context is empty.
    */
    pub fn flush(&mut self) -> Result<Option<AudioFrame>> {
        let held = self.delay();
        if held == 0 {
            return Ok(None);
        }

        let mut output = self.output_frame(held)?;
        let Some((_, context)) = self.context.as_mut() else {
            return Ok(None);
        };
        let flushed = context.flush(&mut output);

        match flushed {
            Ok(_) if output.samples() > 0 => {
                audio_frame_from_ffmpeg(&output, self.target.time_base()).map(Some)
            }
            Ok(_) => Ok(None),
            Err(_) if output.samples() == 0 => Ok(None),
            Err(e) => Err(Error::codec(format!("resampler flush failed: {e}"))),
        }
    }

    fn build_context(&self, input: InputShape) -> Result<SwrContext> {
        SwrContext::get(
            sample_format_to_ffmpeg(input.format)?,
            channel_layout_for(input.channels),
            input.sample_rate,
            sample_format_to_ffmpeg(self.target.format)?,
            channel_layout_for(self.target.channels),
            self.target.sample_rate,
        )
        .map_err(|e| Error::codec(format!("failed to create resampler: {e}")))
    }

    fn output_frame(&self, capacity: usize) -> Result<RawAudio> {
        let mut output = RawAudio::new(
            sample_format_to_ffmpeg(self.target.format)?,
            capacity,
            channel_layout_for(self.target.channels),
        );
        output.set_rate(self.target.sample_rate);
        Ok(output)
    }
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("target", &self.target)
            .field("active", &self.context.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s16_mono(samples: usize, rate: u32) -> AudioFrame {
        let pcm: Vec<u8> = (0..samples)
            .flat_map(|i| ((i as i16).wrapping_mul(37)).to_le_bytes())
            .collect();
        AudioFrame::new(
            vec![pcm],
            samples,
            rate,
            1,
            SampleFormat::S16,
            None,
            Rational::new(1, rate as i32),
        )
    }

    #[test]
    fn converts_packed_s16_to_planar_float() {
        let mut resampler = Resampler::new(ResampleTarget::new(8000, 1, SampleFormat::F32p));
        let out = resampler.convert(&s16_mono(800, 8000)).unwrap();

        assert_eq!(out.format, SampleFormat::F32p);
        assert_eq!(out.channels, 1);
        assert_eq!(out.sample_rate, 8000);
        assert_eq!(out.planes.len(), 1);
        assert_eq!(out.planes[0].len(), out.samples * 4);
        assert_eq!(out.time_base, Rational::new(1, 8000));
    }

    #[test]
    fn nothing_is_lost_across_a_rate_change() {
        let mut resampler = Resampler::new(ResampleTarget::new(16000, 1, SampleFormat::F32p));
        let mut produced = 0;
        for _ in 0..10 {
            produced += resampler.convert(&s16_mono(800, 8000)).unwrap().samples;
        }
        while let Some(rest) = resampler.flush().unwrap() {
            produced += rest.samples;
        }

        // 8000 input samples at double rate, give or take filter edges
        assert!((15_900..=16_100).contains(&produced), "{produced}");
        assert_eq!(resampler.delay(), 0);
    }

    #[test]
    fn flushing_an_unused_resampler_yields_nothing() {
        let mut resampler = Resampler::new(ResampleTarget::new(8000, 1, SampleFormat::F32p));
        assert_eq!(resampler.delay(), 0);
        assert!(resampler.flush().unwrap().is_none());
    }

    #[test]
    fn frames_without_data_are_rejected() {
        let mut resampler = Resampler::new(ResampleTarget::new(8000, 1, SampleFormat::F32p));
        let mut frame = s16_mono(10, 8000);
        frame.planes.clear();
        assert!(resampler.convert(&frame).is_err());
    }
}
