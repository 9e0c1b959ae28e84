/*!
    Timestamp carry-forward across concatenated clips.
*/

use ffmpeg_types::{Pts, StreamType};

/**
    Last timestamps emitted on one output stream.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamTimestamps {
    pub pts: i64,
    pub dts: i64,
}

#[derive(Clone, Copy, Debug, Default)]
struct StreamCarry {
    /// Baseline from earlier clips; `None` until the stream has appeared.
    carried: Option<StreamTimestamps>,
    /// Latest timestamps emitted for the current clip.
    emitted: Option<StreamTimestamps>,
    /// Shift that brings the current clip's first timestamp to zero or above.
    start_shift: Option<i64>,
}

/**
    Offsets each clip's timestamps past the end of the previous ones.

    All timestamps fed in must already be in the output stream's time base.
    The first clip passes through untouched. Every later clip is shifted so
    its packets start one tick after the last ones emitted on the same
    stream. A stream missing from a clip keeps its carry for the next clip.
*/
#[derive(Debug, Default)]
pub struct TimestampCarry {
    clips_started: usize,
    video: StreamCarry,
    audio: StreamCarry,
}

impl TimestampCarry {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Start the next clip, folding the previous clip's last timestamps into
        the carry.
    */
    pub fn begin_clip(&mut self) {
        for stream in [&mut self.video, &mut self.audio] {
            if let Some(emitted) = stream.emitted.take() {
                stream.carried = Some(emitted);
            }
            stream.start_shift = None;
        }
        self.clips_started += 1;
    }

    /// Zero-based index of the clip in progress.
    pub fn clip_index(&self) -> usize {
        self.clips_started.saturating_sub(1)
    }

    pub fn carried(&self, stream_type: StreamType) -> Option<StreamTimestamps> {
        self.stream(stream_type).carried
    }

    /**
        Map one packet's timestamps into the concatenated timeline.
    */
    pub fn apply(
        &mut self,
        stream_type: StreamType,
        pts: Option<Pts>,
        dts: Option<Pts>,
    ) -> (Option<Pts>, Option<Pts>) {
        let first_clip = self.clips_started <= 1;
        let stream = self.stream_mut(stream_type);

        let (pts, dts) = match (first_clip, stream.carried) {
            (false, Some(carried)) => {
                // Negative starts (B-frame priming) would land before the carry
                let shift = *stream.start_shift.get_or_insert_with(|| {
                    let first = dts.or(pts).map_or(0, |t| t.0);
                    (-first).max(0)
                });
                (
                    pts.map(|p| Pts(carried.pts + 1 + shift + p.0)),
                    dts.map(|d| Pts(carried.dts + 1 + shift + d.0)),
                )
            }
            _ => (pts, dts),
        };

        let latest = stream.emitted.unwrap_or(StreamTimestamps {
            pts: i64::MIN,
            dts: i64::MIN,
        });
        let pts_value = pts.or(dts).map(|t| t.0);
        let dts_value = dts.or(pts).map(|t| t.0);
        if let (Some(p), Some(d)) = (pts_value, dts_value) {
            stream.emitted = Some(StreamTimestamps {
                pts: latest.pts.max(p),
                dts: latest.dts.max(d),
            });
        }

        (pts, dts)
    }

    fn stream(&self, stream_type: StreamType) -> &StreamCarry {
        match stream_type {
            StreamType::Video => &self.video,
            StreamType::Audio => &self.audio,
        }
    }

    fn stream_mut(&mut self, stream_type: StreamType) -> &mut StreamCarry {
        match stream_type {
            StreamType::Video => &mut self.video,
            StreamType::Audio => &mut self.audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(carry: &mut TimestampCarry, stream: StreamType, ts: &[(i64, i64)]) -> Vec<(i64, i64)> {
        ts.iter()
            .map(|&(p, d)| {
                let (p, d) = carry.apply(stream, Some(Pts(p)), Some(Pts(d)));
                (p.map_or(i64::MIN, |p| p.0), d.map_or(i64::MIN, |d| d.0))
            })
            .collect()
    }

    #[test]
    fn first_clip_passes_through() {
        let mut carry = TimestampCarry::new();
        carry.begin_clip();

        let out = feed(&mut carry, StreamType::Video, &[(0, 0), (512, 512), (1024, 1024)]);
        assert_eq!(out, vec![(0, 0), (512, 512), (1024, 1024)]);
        assert_eq!(carry.clip_index(), 0);
    }

    #[test]
    fn later_clips_start_one_tick_after_the_carry() {
        let mut carry = TimestampCarry::new();
        carry.begin_clip();
        feed(&mut carry, StreamType::Video, &[(0, 0), (512, 512), (1024, 1024)]);

        carry.begin_clip();
        assert_eq!(
            carry.carried(StreamType::Video),
            Some(StreamTimestamps { pts: 1024, dts: 1024 })
        );
        let out = feed(&mut carry, StreamType::Video, &[(0, 0), (512, 512)]);
        assert_eq!(out, vec![(1025, 1025), (1537, 1537)]);

        carry.begin_clip();
        let out = feed(&mut carry, StreamType::Video, &[(0, 0)]);
        assert_eq!(out, vec![(1538, 1538)]);
    }

    #[test]
    fn timestamps_never_go_backwards_across_boundaries() {
        let mut carry = TimestampCarry::new();
        let clips: [&[(i64, i64)]; 3] = [
            &[(0, 0), (1024, 1024), (2048, 2048)],
            &[(0, 0), (1024, 1024)],
            &[(0, 0), (1024, 1024), (2048, 2048), (3072, 3072)],
        ];

        let mut last_dts = i64::MIN;
        for clip in clips {
            carry.begin_clip();
            for (_, dts) in feed(&mut carry, StreamType::Audio, clip) {
                assert!(dts > last_dts, "{dts} after {last_dts}");
                last_dts = dts;
            }
        }
    }

    #[test]
    fn negative_starts_are_normalized_after_the_first_clip() {
        let mut carry = TimestampCarry::new();
        carry.begin_clip();
        let out = feed(&mut carry, StreamType::Video, &[(0, -1024), (1024, 0)]);
        assert_eq!(out, vec![(0, -1024), (1024, 0)]);

        carry.begin_clip();
        let out = feed(&mut carry, StreamType::Video, &[(0, -1024), (1024, 0)]);
        assert_eq!(out, vec![(2049, 1), (3073, 1025)]);
    }

    #[test]
    fn reordered_pts_carry_the_largest_value() {
        let mut carry = TimestampCarry::new();
        carry.begin_clip();
        feed(&mut carry, StreamType::Video, &[(0, 0), (3000, 1000), (1000, 2000), (2000, 3000)]);

        carry.begin_clip();
        assert_eq!(
            carry.carried(StreamType::Video),
            Some(StreamTimestamps { pts: 3000, dts: 3000 })
        );
    }

    #[test]
    fn absent_streams_keep_their_carry() {
        let mut carry = TimestampCarry::new();
        carry.begin_clip();
        feed(&mut carry, StreamType::Video, &[(0, 0), (100, 100)]);
        feed(&mut carry, StreamType::Audio, &[(0, 0), (50, 50)]);

        // Video-only clip
        carry.begin_clip();
        feed(&mut carry, StreamType::Video, &[(0, 0), (100, 100)]);

        carry.begin_clip();
        assert_eq!(
            carry.carried(StreamType::Audio),
            Some(StreamTimestamps { pts: 50, dts: 50 })
        );
        assert_eq!(
            carry.carried(StreamType::Video),
            Some(StreamTimestamps { pts: 201, dts: 201 })
        );
        let out = feed(&mut carry, StreamType::Audio, &[(0, 0)]);
        assert_eq!(out, vec![(51, 51)]);
    }

    #[test]
    fn missing_timestamps_stay_missing() {
        let mut carry = TimestampCarry::new();
        carry.begin_clip();
        feed(&mut carry, StreamType::Video, &[(0, 0)]);
        carry.begin_clip();

        assert_eq!(carry.apply(StreamType::Video, None, None), (None, None));
        assert_eq!(
            carry.apply(StreamType::Video, None, Some(Pts(10))),
            (None, Some(Pts(11)))
        );
    }
}
