/*!
    Audio sample FIFO.
*/

use std::collections::VecDeque;

use ffmpeg_types::{AudioFrame, Error, Rational, Result, SampleFormat};

/**
    An unbounded queue of audio samples in one fixed format.

    Samples are stored per plane, so the queue only ever holds whole sample
    groups across all channels. Frames are drained in encoder-sized chunks,
    or until empty when flushing.
*/
#[derive(Debug)]
pub struct AudioFifo {
    format: SampleFormat,
    channels: u16,
    sample_rate: u32,
    planes: Vec<VecDeque<u8>>,
    samples: usize,
}

impl AudioFifo {
    pub fn new(format: SampleFormat, channels: u16, sample_rate: u32) -> Self {
        let plane_count = AudioFrame::plane_count(format, channels);
        Self {
            format,
            channels,
            sample_rate,
            planes: vec![VecDeque::new(); plane_count],
            samples: 0,
        }
    }

    /**
        Number of buffered samples (per channel).
    */
    pub fn size(&self) -> usize {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    fn bytes_per_plane_sample(&self) -> usize {
        AudioFrame::bytes_per_plane_sample(self.format, self.channels)
    }

    /**
        Append every sample of `frame`.

        The frame must already be in the FIFO's format and channel count.
    */
    pub fn write(&mut self, frame: &AudioFrame) -> Result<()> {
        if frame.format != self.format || frame.channels != self.channels {
            return Err(Error::invalid_data(format!(
                "fifo holds {:?} x{}, got {:?} x{}",
                self.format, self.channels, frame.format, frame.channels
            )));
        }
        if frame.planes.len() != self.planes.len() {
            return Err(Error::invalid_data(format!(
                "expected {} planes, got {}",
                self.planes.len(),
                frame.planes.len()
            )));
        }

        let plane_bytes = frame.samples * self.bytes_per_plane_sample();
        if let Some(short) = frame.planes.iter().find(|p| p.len() < plane_bytes) {
            return Err(Error::invalid_data(format!(
                "plane holds {} bytes, expected {plane_bytes}",
                short.len()
            )));
        }

        for (queue, plane) in self.planes.iter_mut().zip(&frame.planes) {
            queue.extend(&plane[..plane_bytes]);
        }
        self.samples += frame.samples;
        Ok(())
    }

    /**
        Remove up to `max_samples` samples from the front of the queue.

        Returns `None` when the queue is empty.
    */
    pub fn read(&mut self, max_samples: usize) -> Option<AudioFrame> {
        let samples = max_samples.min(self.samples);
        if samples == 0 {
            return None;
        }

        let plane_bytes = samples * self.bytes_per_plane_sample();
        let planes = self
            .planes
            .iter_mut()
            .map(|queue| queue.drain(..plane_bytes).collect())
            .collect();
        self.samples -= samples;

        Some(AudioFrame::new(
            planes,
            samples,
            self.sample_rate,
            self.channels,
            self.format,
            None,
            Rational::new(1, self.sample_rate as i32),
        ))
    }

    /**
        Drain encoder frames of exactly `frame_size` samples while enough are
        buffered. With `flush` set, the remainder is drained as a final short
        frame.
    */
    pub fn drain(&mut self, frame_size: usize, flush: bool) -> Vec<AudioFrame> {
        let mut frames = Vec::new();
        while self.samples >= frame_size || (flush && self.samples > 0) {
            match self.read(frame_size) {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        frames
    }
}
