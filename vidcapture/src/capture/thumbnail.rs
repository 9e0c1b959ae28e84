/*!
    Thumbnail extraction from the first decodable video frame.
*/

use image::{ExtendedColorType, ImageEncoder, codecs::jpeg::JpegEncoder};

use ffmpeg_decode::VideoDecoder;
use ffmpeg_source::CodecConfig;
use ffmpeg_transform::{VideoTransform, yuv420p_to_rgb};
use ffmpeg_types::{Error, Packet, Rational, VideoFrame};

use crate::error::{CaptureError, Stage, StageContext};

/**
    Decodes video packets until the first picture comes out, then turns that
    picture into a JPEG. Packets after that are ignored.
*/
pub struct ThumbnailExtractor {
    decoder: VideoDecoder,
    transform: VideoTransform,
    quality: u8,
    done: bool,
}

impl ThumbnailExtractor {
    pub fn new(
        codec_config: &CodecConfig,
        time_base: Rational,
        quality: u8,
    ) -> Result<Self, CaptureError> {
        Ok(Self {
            decoder: VideoDecoder::new(codec_config, time_base).stage(Stage::OpenDecoder)?,
            transform: VideoTransform::new(),
            quality,
            done: false,
        })
    }

    pub fn decoder(&self) -> &VideoDecoder {
        &self.decoder
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /**
        Feed one video packet. Returns the JPEG the first time a frame
        decodes, and `None` before and after that.

        A first frame that cannot be turned into a JPEG ends extraction
        with a warning; the capture carries on without a thumbnail.
    */
    pub fn offer(&mut self, packet: &Packet) -> Result<Option<Vec<u8>>, CaptureError> {
        if self.done {
            return Ok(None);
        }

        let frames = self.decoder.decode(packet).stage(Stage::Decode)?;
        let Some(frame) = frames.into_iter().next() else {
            return Ok(None);
        };
        self.done = true;

        match render(&mut self.transform, &frame, self.quality) {
            Ok(jpeg) => {
                tracing::info!(
                    width = frame.width,
                    height = frame.height,
                    format = ?frame.format,
                    bytes = jpeg.len(),
                    "thumbnail extracted"
                );
                Ok(Some(jpeg))
            }
            Err(e) => {
                tracing::warn!(format = ?frame.format, error = %e, "thumbnail skipped");
                Ok(None)
            }
        }
    }
}

/**
    Convert one decoded picture to YUV 4:2:0, then RGB, then JPEG.
*/
fn render(
    transform: &mut VideoTransform,
    frame: &VideoFrame,
    quality: u8,
) -> Result<Vec<u8>, CaptureError> {
    let picture = transform.to_yuv420p(frame).stage(Stage::Thumbnail)?;
    let (y, u, v) = picture
        .yuv420_planes()
        .ok_or_else(|| Error::invalid_data("converted picture is not 4:2:0 planar"))
        .stage(Stage::Thumbnail)?;
    let rgb = yuv420p_to_rgb(y, u, v, picture.width, picture.height).stage(Stage::Thumbnail)?;
    encode_jpeg(&rgb, picture.width, picture.height, quality)
}

/**
    Encode a packed RGB24 raster as JPEG.
*/
pub fn encode_jpeg(
    rgb: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, CaptureError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).write_image(
        rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_types::PixelFormat;

    #[test]
    fn jpeg_has_start_and_end_markers() {
        let rgb = vec![200u8; 8 * 8 * 3];
        let jpeg = encode_jpeg(&rgb, 8, 8, 75).unwrap();

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn decoded_pictures_render_to_jpeg() {
        let frame = VideoFrame::new(
            vec![128; 4 * 4 + 2 * 2 * 2],
            4,
            4,
            PixelFormat::Yuv420p,
            None,
            Rational::new(1, 25),
        );
        let jpeg = render(&mut VideoTransform::new(), &frame, 75).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn truncated_pictures_fail_at_the_thumbnail_stage() {
        let frame = VideoFrame::new(
            vec![128; 5],
            4,
            4,
            PixelFormat::Yuv420p,
            None,
            Rational::new(1, 25),
        );
        let result = render(&mut VideoTransform::new(), &frame, 75);
        assert!(matches!(
            result,
            Err(CaptureError::Stage { stage: Stage::Thumbnail, .. })
        ));
    }
}
