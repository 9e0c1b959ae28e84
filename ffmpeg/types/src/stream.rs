/*!
    What an opened input carries.
*/

use std::time::Duration;

use crate::{CodecId, PixelFormat, Rational, SampleFormat};

#[derive(Clone, Debug)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec_id: CodecId,
    pub width: u32,
    pub height: u32,
    /// `None` when the decoder reports a layout the pipeline has no name for.
    pub pixel_format: Option<PixelFormat>,
    /// Average frame rate; RTSP sources often leave it unset.
    pub frame_rate: Option<Rational>,
    pub time_base: Rational,
}

impl VideoStreamInfo {
    pub fn fps(&self) -> Option<f64> {
        self.frame_rate.filter(|r| r.is_valid()).map(Rational::to_f64)
    }
}

#[derive(Clone, Debug)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec_id: CodecId,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: Option<SampleFormat>,
    pub time_base: Rational,
    /// Bits per second, when the stream declares it.
    pub bitrate: Option<u64>,
}

/**
    Description of an opened input: its demuxer, advertised length and the
    first video and audio streams.
*/
#[derive(Clone, Debug, Default)]
pub struct MediaInfo {
    /// Demuxer short name, e.g. "rtsp" or "mov,mp4,m4a,3gp,3g2,mj2".
    pub format_name: String,
    /// `None` for live inputs, which advertise no length.
    pub duration: Option<Duration>,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

impl MediaInfo {
    /// Inputs without an advertised length are treated as live.
    pub fn is_live(&self) -> bool {
        self.duration.is_none()
    }
}
