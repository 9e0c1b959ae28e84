/*!
    Decoded (raw) frame types.
*/

use crate::format::{PixelFormat, SampleFormat};
use crate::packet::Pts;
use crate::rational::Rational;

/**
    A decoded audio frame.

    Planar formats hold one plane per channel; interleaved formats hold a
    single plane with channels interleaved sample by sample. Every plane is
    exactly `samples * bytes_per_plane_sample` bytes long.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct AudioFrame {
    pub planes: Vec<Vec<u8>>,
    pub samples: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
    pub pts: Option<Pts>,
    pub time_base: Rational,
}

impl AudioFrame {
    pub fn new(
        planes: Vec<Vec<u8>>,
        samples: usize,
        sample_rate: u32,
        channels: u16,
        format: SampleFormat,
        pts: Option<Pts>,
        time_base: Rational,
    ) -> Self {
        Self {
            planes,
            samples,
            sample_rate,
            channels,
            format,
            pts,
            time_base,
        }
    }

    /**
        Number of planes a frame of this format and channel count carries.
    */
    pub const fn plane_count(format: SampleFormat, channels: u16) -> usize {
        if format.is_planar() {
            channels as usize
        } else {
            1
        }
    }

    /**
        Bytes one sample occupies within a single plane.
    */
    pub const fn bytes_per_plane_sample(format: SampleFormat, channels: u16) -> usize {
        if format.is_planar() {
            format.bytes_per_sample()
        } else {
            format.bytes_per_sample() * channels as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/**
    A decoded video picture stored contiguously.

    For YUV 4:2:0 planar formats the buffer holds the Y plane (`width * height`)
    followed by the U and V planes (`ceil(width/2) * ceil(height/2)` each),
    with no row padding.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pts: Option<Pts>,
    pub time_base: Rational,
}

impl VideoFrame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        pts: Option<Pts>,
        time_base: Rational,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format,
            pts,
            time_base,
        }
    }

    /**
        Row width in bytes and row count of each plane of a contiguous
        picture, in plane order.

        Returns `None` for formats without a known layout.
    */
    pub fn plane_layout(
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Option<Vec<(usize, usize)>> {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        match format {
            PixelFormat::Yuv420p | PixelFormat::Yuvj420p => Some(vec![(w, h), (cw, ch), (cw, ch)]),
            PixelFormat::Yuv422p => Some(vec![(w, h), (cw, h), (cw, h)]),
            PixelFormat::Yuv444p => Some(vec![(w, h), (w, h), (w, h)]),
            PixelFormat::Nv12 => Some(vec![(w, h), (2 * cw, ch)]),
            PixelFormat::Rgb24 => Some(vec![(3 * w, h)]),
        }
    }

    /**
        Dimensions of one chroma plane of a 4:2:0 picture.
    */
    pub const fn chroma_dimensions(width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(2), height.div_ceil(2))
    }

    /**
        Size in bytes of a contiguous 4:2:0 picture.
    */
    pub const fn yuv420_size(width: u32, height: u32) -> usize {
        let (cw, ch) = Self::chroma_dimensions(width, height);
        (width as usize * height as usize) + 2 * (cw as usize * ch as usize)
    }

    /**
        Split a contiguous 4:2:0 picture into its Y, U and V planes.

        Returns `None` if the frame is not 4:2:0 planar or is too short.
    */
    pub fn yuv420_planes(&self) -> Option<(&[u8], &[u8], &[u8])> {
        if !self.format.is_yuv420_planar() {
            return None;
        }
        let luma = self.width as usize * self.height as usize;
        let (cw, ch) = Self::chroma_dimensions(self.width, self.height);
        let chroma = cw as usize * ch as usize;
        if self.data.len() < luma + 2 * chroma {
            return None;
        }
        let (y, rest) = self.data.split_at(luma);
        let (u, rest) = rest.split_at(chroma);
        Some((y, u, &rest[..chroma]))
    }
}
