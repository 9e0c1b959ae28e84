/*!
    Encoded packet types.
*/

use crate::rational::{Rational, rescale};

/**
    A presentation or decode timestamp, in the units of some time base.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

/**
    A duration in the units of some time base.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaDuration(pub i64);

/**
    Which logical stream a packet belongs to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamType {
    Video,
    Audio,
}

/**
    An encoded, container-level unit of media.

    Timestamps are expressed in `time_base`. A packet never carries an output
    stream index; sinks route packets by `stream_type` and assign their own
    index when writing.
*/
#[derive(Clone, Debug)]
pub struct Packet {
    pub data: Vec<u8>,
    pub pts: Option<Pts>,
    pub dts: Option<Pts>,
    pub duration: MediaDuration,
    pub time_base: Rational,
    pub is_keyframe: bool,
    pub stream_type: StreamType,
}

impl Packet {
    pub fn new(
        data: Vec<u8>,
        pts: Option<Pts>,
        dts: Option<Pts>,
        duration: MediaDuration,
        time_base: Rational,
        is_keyframe: bool,
        stream_type: StreamType,
    ) -> Self {
        Self {
            data,
            pts,
            dts,
            duration,
            time_base,
            is_keyframe,
            stream_type,
        }
    }

    /**
        Return this packet with its timestamps and duration expressed in `to`.
    */
    pub fn rescaled(mut self, to: Rational) -> Self {
        let from = self.time_base;
        self.pts = self.pts.map(|p| Pts(rescale(p.0, from, to)));
        self.dts = self.dts.map(|d| Pts(rescale(d.0, from, to)));
        self.duration = MediaDuration(rescale(self.duration.0, from, to));
        self.time_base = to;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(pts: Option<i64>, dts: Option<i64>) -> Packet {
        Packet::new(
            vec![0u8; 4],
            pts.map(Pts),
            dts.map(Pts),
            MediaDuration(3000),
            Rational::new(1, 90000),
            true,
            StreamType::Video,
        )
    }

    #[test]
    fn rescaled_converts_all_timing_fields() {
        let out = packet(Some(90000), Some(87000)).rescaled(Rational::new(1, 1000));
        assert_eq!(out.pts, Some(Pts(1000)));
        assert_eq!(out.dts, Some(Pts(967)));
        assert_eq!(out.duration, MediaDuration(33));
        assert_eq!(out.time_base, Rational::new(1, 1000));
    }

    #[test]
    fn rescaled_keeps_missing_timestamps_missing() {
        let out = packet(None, None).rescaled(Rational::new(1, 1000));
        assert_eq!(out.pts, None);
        assert_eq!(out.dts, None);
    }
}
