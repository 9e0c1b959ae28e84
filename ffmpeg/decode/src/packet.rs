use ffmpeg_next::packet::Mut as PacketMut;

use ffmpeg_types::Packet;

/**
    Build an FFmpeg packet carrying the data and timing of `packet`.
*/
pub(crate) fn to_ffmpeg_packet(packet: &Packet) -> ffmpeg_next::Packet {
    let mut ffmpeg_pkt = if packet.data.is_empty() {
        ffmpeg_next::Packet::empty()
    } else {
        ffmpeg_next::Packet::copy(&packet.data)
    };

    unsafe {
        let pkt_ptr = ffmpeg_pkt.as_mut_ptr();
        if let Some(pts) = packet.pts {
            (*pkt_ptr).pts = pts.0;
        }
        if let Some(dts) = packet.dts {
            (*pkt_ptr).dts = dts.0;
        }
        (*pkt_ptr).duration = packet.duration.0;
    }
    if packet.is_keyframe {
        ffmpeg_pkt.set_flags(ffmpeg_next::packet::Flags::KEY);
    }

    ffmpeg_pkt
}
