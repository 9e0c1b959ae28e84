/*!
    Video decoder.
*/

use ffmpeg_next::{
    codec::decoder::Video as OpenedVideo,
    format::Pixel,
    software::scaling::{Context as ScalerContext, Flags as ScalerFlags},
    util::frame::video::Video as RawVideo,
};

use ffmpeg_source::{
    CodecConfig,
    convert::{pixel_format_from_ffmpeg, pts_from_ffmpeg},
};
use ffmpeg_types::{Error, Packet, PixelFormat, Rational, Result, VideoFrame};

use crate::packet::to_ffmpeg_packet;
use crate::pump::{decoder_for, pump};

/**
    Decodes the capture source's video stream into tightly packed pictures.

    Live streams joined mid-GOP usually need several packets before the
    first picture appears, so an empty result from [`decode`](Self::decode)
    is normal.

    Pictures in a pixel format [`PixelFormat`] has no variant for (10-bit,
    full-range 4:2:2 and the like) come out as YUV 4:2:0.
*/
pub struct VideoDecoder {
    decoder: OpenedVideo,
    scratch: RawVideo,
    fallback: FallbackScaler,
    time_base: Rational,
}

impl VideoDecoder {
    pub fn new(codec_config: &CodecConfig, time_base: Rational) -> Result<Self> {
        let decoder = decoder_for(codec_config)?
            .video()
            .map_err(|e| Error::codec(format!("failed to open video decoder: {e}")))?;

        Ok(Self {
            decoder,
            scratch: RawVideo::empty(),
            fallback: FallbackScaler::default(),
            time_base,
        })
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn name(&self) -> String {
        self.decoder
            .codec()
            .map_or_else(|| "unknown".to_string(), |c| c.name().to_string())
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    pub fn pixel_format(&self) -> Option<PixelFormat> {
        pixel_format_from_ffmpeg(self.decoder.format())
    }

    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<VideoFrame>> {
        let packet = to_ffmpeg_packet(packet);
        self.run(Some(&packet))
    }

    pub fn flush(&mut self) -> Result<Vec<VideoFrame>> {
        self.run(None)
    }

    fn run(&mut self, packet: Option<&ffmpeg_next::Packet>) -> Result<Vec<VideoFrame>> {
        let Self {
            decoder,
            scratch,
            fallback,
            time_base,
        } = self;

        let mut pictures = Vec::new();
        pump(decoder, packet, scratch, |raw| {
            pictures.push(take_picture(raw, fallback, *time_base)?);
            Ok(())
        })?;
        Ok(pictures)
    }
}

/**
    Software scaler for decoder output with no [`PixelFormat`] mapping,
    rebuilt when the source format or size changes.
*/
#[derive(Default)]
struct FallbackScaler {
    state: Option<(Pixel, u32, u32, ScalerContext)>,
}

impl FallbackScaler {
    fn to_yuv420p(&mut self, raw: &RawVideo) -> Result<RawVideo> {
        let (format, width, height) = (raw.format(), raw.width(), raw.height());
        let stale = self
            .state
            .as_ref()
            .is_none_or(|(f, w, h, _)| (*f, *w, *h) != (format, width, height));
        if stale {
            let context = ScalerContext::get(
                format,
                width,
                height,
                Pixel::YUV420P,
                width,
                height,
                ScalerFlags::BILINEAR,
            )
            .map_err(|e| Error::codec(format!("no scaler from {format:?}: {e}")))?;
            self.state = Some((format, width, height, context));
        }

        let Some((_, _, _, context)) = self.state.as_mut() else {
            return Err(Error::codec("scaler not initialized"));
        };

        let mut converted = RawVideo::empty();
        context
            .run(raw, &mut converted)
            .map_err(|e| Error::codec(format!("{format:?} to yuv420p failed: {e}")))?;
        converted.set_pts(raw.pts());
        Ok(converted)
    }
}

fn take_picture(
    raw: &RawVideo,
    fallback: &mut FallbackScaler,
    time_base: Rational,
) -> Result<VideoFrame> {
    if pixel_format_from_ffmpeg(raw.format()).is_some() {
        return to_video_frame(raw, time_base);
    }

    let converted = fallback.to_yuv420p(raw)?;
    to_video_frame(&converted, time_base)
}

fn to_video_frame(raw: &RawVideo, time_base: Rational) -> Result<VideoFrame> {
    let format = pixel_format_from_ffmpeg(raw.format()).ok_or_else(|| {
        Error::unsupported_format(format!("unsupported pixel format: {:?}", raw.format()))
    })?;
    let layout = VideoFrame::plane_layout(format, raw.width(), raw.height()).ok_or_else(|| {
        Error::unsupported_format(format!("no plane layout for {format:?}"))
    })?;

    let size = layout.iter().map(|(row_bytes, rows)| row_bytes * rows).sum();
    let mut data = Vec::with_capacity(size);
    for (index, (row_bytes, rows)) in layout.into_iter().enumerate() {
        unpad_plane(&mut data, raw.data(index), raw.stride(index), row_bytes, rows)?;
    }

    Ok(VideoFrame::new(
        data,
        raw.width(),
        raw.height(),
        format,
        pts_from_ffmpeg(raw.pts()),
        time_base,
    ))
}

/**
    Append `rows` rows of `row_bytes` each from a plane laid out with
    `stride` bytes per row.
*/
fn unpad_plane(
    out: &mut Vec<u8>,
    plane: &[u8],
    stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<()> {
    for row in 0..rows {
        let start = row * stride;
        let line = plane.get(start..start + row_bytes).ok_or_else(|| {
            Error::invalid_data(format!(
                "row {row} needs bytes up to {} but the plane has {}",
                start + row_bytes,
                plane.len()
            ))
        })?;
        out.extend_from_slice(line);
    }
    Ok(())
}

impl std::fmt::Debug for VideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("name", &self.name())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("time_base", &self.time_base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_padding_is_removed() {
        // 3 picture bytes and 2 padding bytes per row
        let plane = [1, 2, 3, 0, 0, 4, 5, 6, 0, 0];
        let mut out = Vec::new();
        unpad_plane(&mut out, &plane, 5, 3, 2).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn short_planes_are_rejected() {
        let mut out = Vec::new();
        assert!(unpad_plane(&mut out, &[1, 2, 3, 4], 4, 4, 2).is_err());
    }

    #[test]
    fn unpadding_appends_after_earlier_planes() {
        let mut out = vec![9, 9];
        unpad_plane(&mut out, &[7, 8, 0, 6, 5, 0], 3, 2, 2).unwrap();
        assert_eq!(out, vec![9, 9, 7, 8, 6, 5]);
    }

    fn filled(format: Pixel, width: u32, height: u32, luma: u8) -> RawVideo {
        let mut raw = RawVideo::new(format, width, height);
        raw.data_mut(0).fill(luma);
        for plane in 1..raw.planes() {
            raw.data_mut(plane).fill(128);
        }
        raw.set_pts(Some(7));
        raw
    }

    #[test]
    fn unmapped_formats_are_scaled_to_yuv420p() {
        let raw = filled(Pixel::YUVJ422P, 4, 2, 200);
        assert!(pixel_format_from_ffmpeg(raw.format()).is_none());

        let mut fallback = FallbackScaler::default();
        let frame = take_picture(&raw, &mut fallback, Rational::new(1, 25)).unwrap();

        assert_eq!(frame.format, PixelFormat::Yuv420p);
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.data.len(), 4 * 2 + 2 * 2);
        assert_eq!(frame.pts, Some(ffmpeg_types::Pts(7)));

        let (y, u, v) = frame.yuv420_planes().unwrap();
        assert!(y.iter().all(|&luma| luma > 150));
        assert!(u.iter().chain(v).all(|&chroma| chroma.abs_diff(128) <= 2));
    }

    #[test]
    fn fallback_scaler_follows_size_changes() {
        let time_base = Rational::new(1, 25);
        let mut fallback = FallbackScaler::default();
        let small = take_picture(&filled(Pixel::YUVJ422P, 4, 2, 90), &mut fallback, time_base);
        let large = take_picture(&filled(Pixel::YUVJ422P, 8, 4, 90), &mut fallback, time_base);

        assert_eq!(small.unwrap().data.len(), 12);
        assert_eq!(large.unwrap().data.len(), 8 * 4 + 2 * 4 * 2);
    }

    #[test]
    fn mapped_formats_skip_the_scaler() {
        let raw = filled(Pixel::YUV420P, 4, 2, 60);
        let mut fallback = FallbackScaler::default();
        let frame = take_picture(&raw, &mut fallback, Rational::new(1, 25)).unwrap();

        assert!(fallback.state.is_none());
        assert!(frame.data[..8].iter().all(|&luma| luma == 60));
    }
}
