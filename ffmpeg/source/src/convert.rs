/*!
    Conversion utilities between ffmpeg-next types and ffmpeg-types.

    Shared by the decode, transform, encode and sink crates.
*/

use ffmpeg_next::util::frame::audio::Audio as RawAudio;

use ffmpeg_types::{AudioFrame, CodecId, Error, PixelFormat, Pts, Rational, Result, SampleFormat};

pub fn rational_from_ffmpeg(r: ffmpeg_next::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

pub fn rational_to_ffmpeg(r: Rational) -> ffmpeg_next::Rational {
    ffmpeg_next::Rational::new(r.num, r.den)
}

pub fn pixel_format_from_ffmpeg(format: ffmpeg_next::format::Pixel) -> Option<PixelFormat> {
    use ffmpeg_next::format::Pixel;

    match format {
        Pixel::YUV420P => Some(PixelFormat::Yuv420p),
        Pixel::YUVJ420P => Some(PixelFormat::Yuvj420p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::YUV422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P => Some(PixelFormat::Yuv444p),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        _ => None,
    }
}

pub fn pixel_format_to_ffmpeg(format: PixelFormat) -> Result<ffmpeg_next::format::Pixel> {
    use ffmpeg_next::format::Pixel;

    match format {
        PixelFormat::Yuv420p => Ok(Pixel::YUV420P),
        PixelFormat::Yuvj420p => Ok(Pixel::YUVJ420P),
        PixelFormat::Nv12 => Ok(Pixel::NV12),
        PixelFormat::Yuv422p => Ok(Pixel::YUV422P),
        PixelFormat::Yuv444p => Ok(Pixel::YUV444P),
        PixelFormat::Rgb24 => Ok(Pixel::RGB24),
        other => Err(Error::unsupported_format(format!(
            "pixel format {other:?} not supported"
        ))),
    }
}

pub fn sample_format_from_ffmpeg(format: ffmpeg_next::format::Sample) -> Option<SampleFormat> {
    use ffmpeg_next::format::Sample;
    use ffmpeg_next::format::sample::Type;

    match format {
        Sample::U8(_) => Some(SampleFormat::U8),
        Sample::I16(Type::Packed) => Some(SampleFormat::S16),
        Sample::I16(Type::Planar) => Some(SampleFormat::S16p),
        Sample::I32(Type::Packed) => Some(SampleFormat::S32),
        Sample::I32(Type::Planar) => Some(SampleFormat::S32p),
        Sample::F32(Type::Packed) => Some(SampleFormat::F32),
        Sample::F32(Type::Planar) => Some(SampleFormat::F32p),
        Sample::F64(Type::Packed) => Some(SampleFormat::F64),
        Sample::F64(Type::Planar) => Some(SampleFormat::F64p),
        _ => None,
    }
}

pub fn sample_format_to_ffmpeg(format: SampleFormat) -> Result<ffmpeg_next::format::Sample> {
    use ffmpeg_next::format::Sample;
    use ffmpeg_next::format::sample::Type;

    match format {
        SampleFormat::U8 => Ok(Sample::U8(Type::Packed)),
        SampleFormat::S16 => Ok(Sample::I16(Type::Packed)),
        SampleFormat::S16p => Ok(Sample::I16(Type::Planar)),
        SampleFormat::S32 => Ok(Sample::I32(Type::Packed)),
        SampleFormat::S32p => Ok(Sample::I32(Type::Planar)),
        SampleFormat::F32 => Ok(Sample::F32(Type::Packed)),
        SampleFormat::F32p => Ok(Sample::F32(Type::Planar)),
        SampleFormat::F64 => Ok(Sample::F64(Type::Packed)),
        SampleFormat::F64p => Ok(Sample::F64(Type::Planar)),
        other => Err(Error::unsupported_format(format!(
            "sample format {other:?} not supported"
        ))),
    }
}

/**
    Default FFmpeg channel layout for a channel count.
*/
pub fn channel_layout_for(channels: u16) -> ffmpeg_next::ChannelLayout {
    ffmpeg_next::ChannelLayout::default(i32::from(channels))
}

pub fn codec_id_from_ffmpeg(id: ffmpeg_next::codec::Id) -> CodecId {
    use ffmpeg_next::codec::Id;

    match id {
        Id::H264 => CodecId::H264,
        Id::HEVC => CodecId::H265,
        Id::MJPEG => CodecId::Mjpeg,
        Id::AAC => CodecId::Aac,
        Id::PCM_ALAW => CodecId::PcmAlaw,
        Id::PCM_MULAW => CodecId::PcmMulaw,
        other => CodecId::Other(other.name()),
    }
}

pub fn pts_from_ffmpeg(pts: Option<i64>) -> Option<Pts> {
    pts.map(Pts)
}

/**
    Copy an FFmpeg audio frame out into an [`AudioFrame`] stamped in
    `time_base`.

    Only `linesize[0]` is set for planar audio, so planes past the first are
    reached through `extended_data` rather than `data(n)`.
*/
pub fn audio_frame_from_ffmpeg(raw: &RawAudio, time_base: Rational) -> Result<AudioFrame> {
    let format = sample_format_from_ffmpeg(raw.format()).ok_or_else(|| {
        Error::unsupported_format(format!("unsupported sample format: {:?}", raw.format()))
    })?;
    let channels = raw.channels() as u16;
    let samples = raw.samples();

    let plane_bytes = samples * AudioFrame::bytes_per_plane_sample(format, channels);
    if samples > 0 && raw.data(0).len() < plane_bytes {
        return Err(Error::invalid_data(format!(
            "audio plane holds {} bytes, {samples} samples need {plane_bytes}",
            raw.data(0).len()
        )));
    }

    let planes = (0..AudioFrame::plane_count(format, channels))
        .map(|index| {
            if plane_bytes == 0 {
                return Ok(Vec::new());
            }
            // SAFETY: extended_data has one entry per plane, each at least
            // plane_bytes long for a frame of this format and sample count
            let plane = unsafe {
                let ptr = (*raw.as_ptr()).extended_data.add(index).read();
                if ptr.is_null() {
                    return Err(Error::invalid_data(format!("audio plane {index} is missing")));
                }
                std::slice::from_raw_parts(ptr, plane_bytes)
            };
            Ok(plane.to_vec())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AudioFrame::new(
        planes,
        samples,
        raw.rate(),
        channels,
        format,
        pts_from_ffmpeg(raw.pts()),
        time_base,
    ))
}

/**
    Allocate an FFmpeg audio frame shaped like `frame` and copy its samples
    in. The pts is left unset.
*/
pub fn audio_frame_to_ffmpeg(frame: &AudioFrame) -> Result<RawAudio> {
    let expected = AudioFrame::plane_count(frame.format, frame.channels);
    if frame.planes.len() != expected {
        return Err(Error::invalid_data(format!(
            "frame has {} planes, {:?} x{} needs {expected}",
            frame.planes.len(),
            frame.format,
            frame.channels
        )));
    }

    let mut raw = RawAudio::new(
        sample_format_to_ffmpeg(frame.format)?,
        frame.samples,
        channel_layout_for(frame.channels),
    );
    raw.set_rate(frame.sample_rate);

    let plane_bytes =
        frame.samples * AudioFrame::bytes_per_plane_sample(frame.format, frame.channels);
    for (index, plane) in frame.planes.iter().enumerate() {
        let Some(source) = plane.get(..plane_bytes) else {
            return Err(Error::invalid_data(format!(
                "plane {index} holds {} of {plane_bytes} bytes",
                plane.len()
            )));
        };
        // SAFETY: the frame was just allocated for this format, layout and
        // sample count, so each extended_data plane has plane_bytes of room
        unsafe {
            let target = (*raw.as_mut_ptr()).extended_data.add(index).read();
            if target.is_null() {
                return Err(Error::invalid_data(format!("allocated plane {index} is missing")));
            }
            std::ptr::copy_nonoverlapping(source.as_ptr(), target, plane_bytes);
        }
    }

    Ok(raw)
}
