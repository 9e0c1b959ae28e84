/*!
    Video frame transformation.
*/

use ffmpeg_next::{
    software::scaling::{Context as ScalerContext, Flags as ScalerFlags},
    util::frame::video::Video as VideoFrameFFmpeg,
};

use ffmpeg_source::convert::pixel_format_to_ffmpeg;
use ffmpeg_types::{Error, PixelFormat, Result, VideoFrame};

/**
    Convert a planar YUV 4:2:0 picture to packed RGB24.

    Chroma planes are `ceil(width/2) * ceil(height/2)`; each chroma sample
    covers a 2x2 block of luma. Per pixel:

    ```text
    r = y + 1.402   (v - 128)
    g = y - 0.34414 (u - 128) - 0.71414 (v - 128)
    b = y + 1.772   (u - 128)
    ```

    rounded to nearest and clamped to `[0, 255]`.
*/
pub fn yuv420p_to_rgb(y: &[u8], u: &[u8], v: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    let cw = w.div_ceil(2);
    let chroma = cw * h.div_ceil(2);

    if y.len() < w * h || u.len() < chroma || v.len() < chroma {
        return Err(Error::invalid_data(format!(
            "planes too short for {width}x{height}: y={} u={} v={}",
            y.len(),
            u.len(),
            v.len()
        )));
    }

    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        for col in 0..w {
            let luma = f32::from(y[row * w + col]);
            let ci = (row / 2) * cw + col / 2;
            let cb = f32::from(u[ci]) - 128.0;
            let cr = f32::from(v[ci]) - 128.0;

            rgb.push(clamp_channel(luma + 1.402 * cr));
            rgb.push(clamp_channel(luma - 0.34414 * cb - 0.71414 * cr));
            rgb.push(clamp_channel(luma + 1.772 * cb));
        }
    }
    Ok(rgb)
}

fn clamp_channel(value: f32) -> u8 {
    (value + 0.5).clamp(0.0, 255.0) as u8
}

/**
    Pixel format converter.

    Brings decoded pictures into planar YUV 4:2:0 at their original size.
    Pictures already in a 4:2:0 planar layout pass through untouched; other
    formats go through the software scaler, which is created on first use
    and recreated when the input format or size changes.
*/
#[derive(Default)]
pub struct VideoTransform {
    scaler_state: Option<ScalerState>,
}

struct ScalerState {
    context: ScalerContext,
    src_format: PixelFormat,
    width: u32,
    height: u32,
}

impl VideoTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Convert `frame` to YUV 4:2:0 planar.
    */
    pub fn to_yuv420p(&mut self, frame: &VideoFrame) -> Result<VideoFrame> {
        if frame.format.is_yuv420_planar() {
            return Ok(frame.clone());
        }

        let needs_init = match &self.scaler_state {
            None => true,
            Some(state) => {
                state.src_format != frame.format
                    || state.width != frame.width
                    || state.height != frame.height
            }
        };
        if needs_init {
            self.init_scaler(frame.format, frame.width, frame.height)?;
        }

        let Some(state) = self.scaler_state.as_mut() else {
            return Err(Error::codec("scaler not initialized"));
        };

        let mut src_frame =
            VideoFrameFFmpeg::new(pixel_format_to_ffmpeg(frame.format)?, frame.width, frame.height);
        copy_to_ffmpeg(&mut src_frame, frame)?;

        let mut dst_frame = VideoFrameFFmpeg::empty();
        state
            .context
            .run(&src_frame, &mut dst_frame)
            .map_err(|e| Error::codec(format!("pixel format conversion failed: {e}")))?;

        let data = copy_from_ffmpeg(&dst_frame, PixelFormat::Yuv420p, frame.width, frame.height)?;
        Ok(VideoFrame::new(
            data,
            frame.width,
            frame.height,
            PixelFormat::Yuv420p,
            frame.pts,
            frame.time_base,
        ))
    }

    fn init_scaler(&mut self, src_format: PixelFormat, width: u32, height: u32) -> Result<()> {
        let context = ScalerContext::get(
            pixel_format_to_ffmpeg(src_format)?,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ScalerFlags::BILINEAR,
        )
        .map_err(|e| Error::codec(format!("failed to create scaler: {e}")))?;

        self.scaler_state = Some(ScalerState {
            context,
            src_format,
            width,
            height,
        });
        Ok(())
    }
}

fn plane_layout(format: PixelFormat, width: u32, height: u32) -> Result<Vec<(usize, usize)>> {
    VideoFrame::plane_layout(format, width, height)
        .ok_or_else(|| Error::unsupported_format(format!("no plane layout for {format:?}")))
}

/**
    Copy a contiguous picture into the strided planes of an FFmpeg frame.
*/
fn copy_to_ffmpeg(dst: &mut VideoFrameFFmpeg, src: &VideoFrame) -> Result<()> {
    let mut offset = 0;
    for (index, (row_bytes, rows)) in plane_layout(src.format, src.width, src.height)?
        .into_iter()
        .enumerate()
    {
        let stride = dst.stride(index);
        let plane = dst.data_mut(index);
        for row in 0..rows {
            let src_row = src
                .data
                .get(offset..offset + row_bytes)
                .ok_or_else(|| Error::invalid_data("picture buffer too short"))?;
            plane[row * stride..row * stride + row_bytes].copy_from_slice(src_row);
            offset += row_bytes;
        }
    }
    Ok(())
}

/**
    Copy the strided planes of an FFmpeg frame into a contiguous buffer.
*/
fn copy_from_ffmpeg(
    frame: &VideoFrameFFmpeg,
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let layout = plane_layout(format, width, height)?;
    let mut output = Vec::with_capacity(layout.iter().map(|(r, n)| r * n).sum());
    for (index, (row_bytes, rows)) in layout.into_iter().enumerate() {
        let stride = frame.stride(index);
        let plane = frame.data(index);
        for row in 0..rows {
            let src_row = plane
                .get(row * stride..row * stride + row_bytes)
                .ok_or_else(|| Error::invalid_data("scaled plane too short"))?;
            output.extend_from_slice(src_row);
        }
    }
    Ok(output)
}

impl std::fmt::Debug for VideoTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTransform")
            .field("initialized", &self.scaler_state.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_gives_grey() {
        let rgb = yuv420p_to_rgb(&[235; 4], &[128], &[128], 2, 2).unwrap();
        assert_eq!(rgb, vec![235; 12]);

        let black = yuv420p_to_rgb(&[16; 4], &[128], &[128], 2, 2).unwrap();
        assert_eq!(black, vec![16; 12]);
    }

    #[test]
    fn saturated_chroma_is_clamped() {
        // Full red chroma on bright luma overflows r, and full blue on dark luma
        // underflows g
        let rgb = yuv420p_to_rgb(&[250], &[128], &[255], 1, 1).unwrap();
        assert_eq!(rgb[0], 255);

        let rgb = yuv420p_to_rgb(&[10], &[255], &[255], 1, 1).unwrap();
        assert_eq!(rgb[1], 0);
        assert_eq!(rgb[2], 235);
    }

    #[test]
    fn coefficients_round_to_nearest() {
        // u = v = 138: r = 100 + 14.02, g = 100 - 3.4414 - 7.1414, b = 100 + 17.72
        let rgb = yuv420p_to_rgb(&[100], &[138], &[138], 1, 1).unwrap();
        assert_eq!(rgb, vec![114, 89, 118]);
    }

    #[test]
    fn odd_dimensions_share_the_last_chroma_column() {
        // 3x1 picture: chroma is 2x1
        let rgb = yuv420p_to_rgb(&[100, 100, 100], &[128, 228], &[128, 128], 3, 1).unwrap();
        assert_eq!(&rgb[0..3], &[100, 100, 100]);
        assert_eq!(&rgb[3..6], &[100, 100, 100]);
        assert_eq!(rgb[8], 255);
    }

    #[test]
    fn short_planes_are_rejected() {
        assert!(yuv420p_to_rgb(&[0; 3], &[128], &[128], 2, 2).is_err());
        assert!(yuv420p_to_rgb(&[0; 4], &[], &[128], 2, 2).is_err());
    }

    #[test]
    fn yuv420_frames_pass_through() {
        let frame = VideoFrame::new(
            vec![1, 2, 3, 4, 5, 6],
            2,
            2,
            PixelFormat::Yuv420p,
            None,
            ffmpeg_types::Rational::new(1, 25),
        );
        let mut transform = VideoTransform::new();
        assert_eq!(transform.to_yuv420p(&frame).unwrap(), frame);
    }
}
