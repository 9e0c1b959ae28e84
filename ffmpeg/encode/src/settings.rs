/*!
    AAC encoder settings.
*/

use ffmpeg_types::SampleFormat;

/// Bit rate used when none is configured.
pub const DEFAULT_AAC_BITRATE: u64 = 48_000;

/**
    How the AAC track of a capture is encoded.

    The channel count follows the source. The sample rate is either the
    source's or a configured override.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AacSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub bitrate: u64,
    /// Put the AudioSpecificConfig in the container header instead of in-band.
    pub global_header: bool,
}

impl AacSettings {
    /// FFmpeg's native AAC encoder only takes planar float.
    pub const SAMPLE_FORMAT: SampleFormat = SampleFormat::F32p;

    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bitrate: DEFAULT_AAC_BITRATE,
            global_header: false,
        }
    }

    pub fn bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn global_header(mut self, global_header: bool) -> Self {
        self.global_header = global_header;
        self
    }
}
