/*!
    Synthetic media for tests: a small MPEG-4 Part 2 video stream and
    silent AAC, muxed in memory like a stored capture.
*/

use ffmpeg_encode::{AacEncoder, AacSettings};
use ffmpeg_next::{
    codec::{self, encoder::video::Encoder as OpenedVideo},
    format::Pixel,
    util::frame::video::Video as RawVideo,
};
use ffmpeg_sink::Sink;
use ffmpeg_source::{CodecConfig, convert::pts_from_ffmpeg};
use ffmpeg_types::{AudioFrame, MediaDuration, Packet, Rational, SampleFormat, StreamType};

pub const FPS: i32 = 25;
pub const SAMPLE_RATE: u32 = 8000;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

/**
    Encodes flat grey pictures with a luma ramp so every frame differs.
*/
pub struct TestVideo {
    encoder: OpenedVideo,
    time_base: Rational,
    next_pts: i64,
}

impl TestVideo {
    pub fn open(global_header: bool) -> Self {
        ffmpeg_next::init().unwrap();
        let mpeg4 = ffmpeg_next::encoder::find(codec::Id::MPEG4).unwrap();
        let mut encoder = codec::context::Context::new_with_codec(mpeg4)
            .encoder()
            .video()
            .unwrap();

        encoder.set_width(WIDTH);
        encoder.set_height(HEIGHT);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(ffmpeg_next::Rational::new(1, FPS));
        encoder.set_frame_rate(Some(ffmpeg_next::Rational::new(FPS, 1)));
        encoder.set_gop(FPS as u32);
        if global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        Self {
            encoder: encoder.open().unwrap(),
            time_base: Rational::new(1, FPS),
            next_pts: 0,
        }
    }

    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig::from_parameters(codec::Parameters::from(&self.encoder))
    }

    pub fn encode(&mut self, frames: usize) -> Vec<Packet> {
        let mut packets = Vec::new();
        for _ in 0..frames {
            let mut frame = RawVideo::new(Pixel::YUV420P, WIDTH, HEIGHT);
            frame.data_mut(0).fill(16 + (self.next_pts % 200) as u8);
            frame.data_mut(1).fill(128);
            frame.data_mut(2).fill(128);
            frame.set_pts(Some(self.next_pts));
            self.next_pts += 1;

            self.encoder.send_frame(&frame).unwrap();
            self.collect(&mut packets);
        }
        packets
    }

    pub fn flush(&mut self) -> Vec<Packet> {
        self.encoder.send_eof().unwrap();
        let mut packets = Vec::new();
        self.collect(&mut packets);
        packets
    }

    fn collect(&mut self, packets: &mut Vec<Packet>) {
        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            packets.push(Packet::new(
                encoded.data().map(<[u8]>::to_vec).unwrap_or_default(),
                pts_from_ffmpeg(encoded.pts()),
                pts_from_ffmpeg(encoded.dts()),
                MediaDuration(encoded.duration().max(1)),
                self.time_base,
                encoded.is_key(),
                StreamType::Video,
            ));
        }
    }
}

pub fn open_aac(global_header: bool) -> AacEncoder {
    AacEncoder::open(AacSettings::new(SAMPLE_RATE, 1).global_header(global_header)).unwrap()
}

/// At least `samples` of mono silence in whole 1024-sample blocks.
pub fn silence_packets(encoder: &mut AacEncoder, samples: usize) -> Vec<Packet> {
    let block = encoder.frame_size().unwrap_or(1024);
    let mut packets = Vec::new();
    for _ in 0..samples.div_ceil(block) {
        let frame = AudioFrame::new(
            vec![vec![0u8; block * 4]],
            block,
            SAMPLE_RATE,
            1,
            SampleFormat::F32p,
            None,
            Rational::new(1, SAMPLE_RATE as i32),
        );
        packets.extend(encoder.encode(&frame).unwrap());
    }
    packets
}

/**
    An MP4 clip of `seconds` of video with an AAC track, like the A/V
    artifact of a capture.
*/
pub fn clip(seconds: u32) -> Vec<u8> {
    let mut sink = Sink::memory("mp4").unwrap();
    let global_header = sink.needs_global_header();
    let mut video = TestVideo::open(global_header);
    let mut audio = open_aac(global_header);

    sink.add_stream(StreamType::Video, &video.codec_config()).unwrap();
    sink.add_stream(StreamType::Audio, &audio.codec_config()).unwrap();
    sink.write_header().unwrap();

    let mut packets = video.encode(seconds as usize * FPS as usize);
    packets.extend(video.flush());
    packets.extend(silence_packets(&mut audio, (seconds * SAMPLE_RATE) as usize));
    packets.extend(audio.flush().unwrap());
    for packet in &packets {
        sink.write(packet).unwrap();
    }

    sink.finish().unwrap();
    sink.take_bytes().unwrap()
}
