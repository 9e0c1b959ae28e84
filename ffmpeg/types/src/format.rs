/*!
    Sample, pixel and codec identifiers.
*/

/**
    Audio sample layouts the capture pipeline handles.

    Packed formats interleave every channel in one plane; the `p` variants
    keep one plane per channel.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    F32,
    F64,
    S16p,
    S32p,
    /// AAC encoder input.
    F32p,
    F64p,
}

impl SampleFormat {
    /// Bytes one channel's sample takes.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 | Self::S16p => 2,
            Self::S32 | Self::S32p | Self::F32 | Self::F32p => 4,
            Self::F64 | Self::F64p => 8,
        }
    }

    pub const fn is_planar(self) -> bool {
        matches!(self, Self::S16p | Self::S32p | Self::F32p | Self::F64p)
    }
}

/**
    Picture layouts a camera decoder may hand out.

    Anything else is reported as unsupported when a thumbnail is taken.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    Yuv420p,
    /// Full-range 4:2:0, common on MJPEG and IP cameras.
    Yuvj420p,
    /// 4:2:0 with interleaved chroma, typical of hardware decoders.
    Nv12,
    Yuv422p,
    Yuv444p,
    Rgb24,
}

impl PixelFormat {
    /**
        Whether the picture already has the three-plane 4:2:0 layout the
        RGB conversion reads.
    */
    pub const fn is_yuv420_planar(self) -> bool {
        matches!(self, Self::Yuv420p | Self::Yuvj420p)
    }
}

/**
    Codecs reported in stream descriptions.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    H264,
    H265,
    Mjpeg,
    Aac,
    PcmAlaw,
    PcmMulaw,
    /// Anything else, by FFmpeg's codec name.
    Other(&'static str),
}

impl CodecId {
    /// FFmpeg's short codec name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Mjpeg => "mjpeg",
            Self::Aac => "aac",
            Self::PcmAlaw => "pcm_alaw",
            Self::PcmMulaw => "pcm_mulaw",
            Self::Other(name) => name,
        }
    }
}
