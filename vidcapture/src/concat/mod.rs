/*!
    Concatenation of stored clips into one container.
*/

mod carry;

pub use self::carry::{StreamTimestamps, TimestampCarry};

use ffmpeg_io::MemoryBuffer;
use ffmpeg_sink::Sink;
use ffmpeg_source::{Source, SourceOptions};
use ffmpeg_types::StreamType;

use crate::error::{CaptureError, Stage, StageContext};
use crate::queue::BlobQueue;

/**
    Summary of a concatenation.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcatReport {
    pub clips: usize,
    pub packets: u64,
    pub bytes: usize,
}

/**
    Fetch every clip under `key` and join them in insertion order.

    Clips are read back with `clip_format`, and the joined result is muxed
    with the same format.
*/
pub fn concatenate_key(
    queue: &dyn BlobQueue,
    key: &str,
    clip_format: &str,
) -> Result<(Vec<u8>, ConcatReport), CaptureError> {
    let clips = queue.get_all(key)?;
    if clips.is_empty() {
        return Err(CaptureError::NoClips(key.to_string()));
    }
    tracing::info!(key, clips = clips.len(), "clips fetched");

    concatenate(clips, clip_format)
}

/**
    Join in-memory clips into one container.

    Every clip is opened before anything is written, so a malformed clip
    fails the whole run. Output streams mirror the first clip; packets of a
    stream type the first clip lacks are dropped.
*/
pub fn concatenate(
    clips: Vec<Vec<u8>>,
    format: &str,
) -> Result<(Vec<u8>, ConcatReport), CaptureError> {
    let clip_count = clips.len();
    let mut sources = clips
        .into_iter()
        .enumerate()
        .map(|(index, clip)| {
            let options = SourceOptions::default().with_format(format);
            Source::from_memory(MemoryBuffer::from_bytes(clip), options)
                .stage(Stage::ConcatOpen)
                .inspect_err(|e| tracing::error!(clip = index, error = %e, "unreadable clip"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(first) = sources.first() else {
        return Err(CaptureError::config("nothing to concatenate"));
    };

    let mut sink = Sink::memory(format).stage(Stage::OpenSink)?;
    if let Some(video) = first.video_codec_config() {
        sink.add_stream(StreamType::Video, video).stage(Stage::OpenSink)?;
    }
    if let Some(audio) = first.audio_codec_config() {
        sink.add_stream(StreamType::Audio, audio).stage(Stage::OpenSink)?;
    }
    sink.write_header().stage(Stage::WriteHeader)?;

    let mut carry = TimestampCarry::new();
    let mut packets = 0u64;
    for source in &mut sources {
        carry.begin_clip();
        let mut clip_packets = 0u64;

        while let Some(packet) = source.next_packet().stage(Stage::ReadPacket)? {
            let Some(time_base) = sink.time_base(packet.stream_type) else {
                continue;
            };

            let mut packet = packet.rescaled(time_base);
            let (pts, dts) = carry.apply(packet.stream_type, packet.pts, packet.dts);
            packet.pts = pts;
            packet.dts = dts;

            sink.write(&packet).stage(Stage::WritePacket)?;
            clip_packets += 1;
        }

        tracing::debug!(
            clip = carry.clip_index(),
            packets = clip_packets,
            video_end = ?carry.carried(StreamType::Video),
            "clip appended"
        );
        packets += clip_packets;
    }

    sink.finish().stage(Stage::WriteTrailer)?;
    let bytes = sink.take_bytes().stage(Stage::WriteTrailer)?;

    let report = ConcatReport {
        clips: clip_count,
        packets,
        bytes: bytes.len(),
    };
    tracing::info!(clips = report.clips, packets, bytes = report.bytes, "clips joined");
    Ok((bytes, report))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fixtures;
    use crate::queue::MemoryQueue;

    fn open(bytes: Vec<u8>) -> Source {
        let options = SourceOptions::default().with_format("mp4");
        Source::from_memory(MemoryBuffer::from_bytes(bytes), options).unwrap()
    }

    #[test]
    fn empty_keys_have_no_clips() {
        let queue = MemoryQueue::new();
        let result = concatenate_key(&queue, "VideoData", "mp4");
        assert!(matches!(result, Err(CaptureError::NoClips(key)) if key == "VideoData"));
    }

    #[test]
    fn malformed_clips_fail_before_writing() {
        let queue = MemoryQueue::new();
        queue.push("VideoData", b"definitely not an mp4").unwrap();

        let result = concatenate_key(&queue, "VideoData", "mp4");
        assert!(matches!(
            result,
            Err(CaptureError::Stage { stage: Stage::ConcatOpen, .. })
        ));
    }

    #[test]
    fn joined_clips_play_as_one_rising_timeline() {
        let clip = fixtures::clip(2);
        let clip_length = open(clip.clone()).media_info().duration.unwrap();

        let queue = MemoryQueue::new();
        for _ in 0..3 {
            queue.push("VideoData", &clip).unwrap();
        }
        let (joined, report) = concatenate_key(&queue, "VideoData", "mp4").unwrap();
        assert_eq!(report.clips, 3);
        assert_eq!(report.bytes, joined.len());

        let mut source = open(joined);
        assert!(source.video_codec_config().is_some());
        assert!(source.audio_codec_config().is_some());

        let mut dts: HashMap<StreamType, Vec<i64>> = HashMap::new();
        let mut read = 0u64;
        while let Some(packet) = source.next_packet().unwrap() {
            if let Some(ts) = packet.dts {
                dts.entry(packet.stream_type).or_default().push(ts.0);
            }
            read += 1;
        }
        assert_eq!(read, report.packets);

        for (stream, series) in &dts {
            assert!(
                series.windows(2).all(|pair| pair[0] <= pair[1]),
                "{stream:?} timestamps went backwards"
            );
        }

        // Join points drop a frame and absorb AAC priming, so only roughly
        // three clip lengths
        let total = source.media_info().duration.unwrap();
        assert!(total >= clip_length * 5 / 2, "{total:?} from {clip_length:?} clips");
        assert!(total <= clip_length * 7 / 2, "{total:?} from {clip_length:?} clips");
    }
}
