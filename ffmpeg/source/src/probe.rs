/*!
    Picking and describing the streams a capture reads.
*/

use std::time::Duration;

use ffmpeg_next::{Stream, codec, format::context::Input as InputContext, media::Type};

use ffmpeg_types::{AudioStreamInfo, MediaInfo, Rational, VideoStreamInfo};

use crate::codec_config::CodecConfig;
use crate::convert::{
    codec_id_from_ffmpeg, pixel_format_from_ffmpeg, rational_from_ffmpeg,
    sample_format_from_ffmpeg,
};

/**
    The first stream of one media type, as the demuxer loop needs it.
*/
pub(crate) struct SelectedStream {
    pub index: usize,
    pub time_base: Rational,
    pub codec_config: CodecConfig,
}

impl SelectedStream {
    /// First stream of `medium` in container order.
    pub fn first(input: &InputContext, medium: Type) -> Option<Self> {
        let stream = first_of(input, medium)?;
        Some(Self {
            index: stream.index(),
            time_base: rational_from_ffmpeg(stream.time_base()),
            codec_config: CodecConfig::from_parameters(stream.parameters()),
        })
    }
}

fn first_of(input: &InputContext, medium: Type) -> Option<Stream<'_>> {
    input
        .streams()
        .find(|stream| stream.parameters().medium() == medium)
}

/**
    Container duration in microseconds as a `Duration`.

    RTSP and other live inputs report `AV_NOPTS_VALUE`, a negative number,
    which maps to `None`.
*/
pub(crate) fn advertised_duration(micros: i64) -> Option<Duration> {
    u64::try_from(micros).ok().map(Duration::from_micros)
}

/**
    Describe an opened input for logging and duration policy.
*/
pub(crate) fn describe(input: &InputContext) -> MediaInfo {
    MediaInfo {
        format_name: input.format().name().to_string(),
        duration: advertised_duration(input.duration()),
        video: first_of(input, Type::Video).and_then(|s| describe_video(&s)),
        audio: first_of(input, Type::Audio).and_then(|s| describe_audio(&s)),
    }
}

fn describe_video(stream: &Stream<'_>) -> Option<VideoStreamInfo> {
    // An unopened decoder context exposes dimensions and format
    let video = codec::context::Context::from_parameters(stream.parameters())
        .ok()?
        .decoder()
        .video()
        .ok()?;

    let frame_rate = [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .find(|rate| rate.numerator() != 0)
        .map(rational_from_ffmpeg);

    Some(VideoStreamInfo {
        index: stream.index(),
        codec_id: codec_id_from_ffmpeg(stream.parameters().id()),
        width: video.width(),
        height: video.height(),
        pixel_format: pixel_format_from_ffmpeg(video.format()),
        frame_rate,
        time_base: rational_from_ffmpeg(stream.time_base()),
    })
}

fn describe_audio(stream: &Stream<'_>) -> Option<AudioStreamInfo> {
    let audio = codec::context::Context::from_parameters(stream.parameters())
        .ok()?
        .decoder()
        .audio()
        .ok()?;

    Some(AudioStreamInfo {
        index: stream.index(),
        codec_id: codec_id_from_ffmpeg(stream.parameters().id()),
        sample_rate: audio.rate(),
        channels: audio.channels() as u16,
        sample_format: sample_format_from_ffmpeg(audio.format()),
        time_base: rational_from_ffmpeg(stream.time_base()),
        bitrate: Some(audio.bit_rate() as u64).filter(|&b| b > 0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_inputs_advertise_nothing() {
        assert_eq!(advertised_duration(i64::MIN), None);
        assert_eq!(advertised_duration(-1), None);
    }

    #[test]
    fn durations_are_microseconds() {
        assert_eq!(advertised_duration(0), Some(Duration::ZERO));
        assert_eq!(advertised_duration(10_000_000), Some(Duration::from_secs(10)));
        assert_eq!(advertised_duration(1_500), Some(Duration::from_micros(1_500)));
    }
}
