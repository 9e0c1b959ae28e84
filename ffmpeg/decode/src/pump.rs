/*!
    Send/receive loop shared by the audio and video decoders.
*/

use std::ops::DerefMut;

use ffmpeg_next::{
    codec::{self, decoder::Decoder},
    ffi,
    util::frame::Frame,
};

use ffmpeg_source::CodecConfig;
use ffmpeg_types::{Error, Result};

/**
    Build an unopened decoder context from source parameters.
*/
pub(crate) fn decoder_for(codec_config: &CodecConfig) -> Result<Decoder> {
    ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

    let context = codec::context::Context::from_parameters(codec_config.parameters().clone())
        .map_err(|e| Error::codec(format!("bad {} parameters: {e}", codec_config.codec_name())))?;
    Ok(context.decoder())
}

fn is_again(error: &ffmpeg_next::Error) -> bool {
    matches!(error, ffmpeg_next::Error::Other { errno } if *errno == ffi::EAGAIN)
}

/**
    Hand `packet` to the decoder (or signal end of input when `None`) and
    pass every frame that comes out to `take`.

    A full input queue is drained once and the send retried; a decoder that
    still refuses after that is a codec error, since the packet would be
    lost. Otherwise neither "try again" nor "end of stream" is an error.
*/
pub(crate) fn pump<F>(
    decoder: &mut Decoder,
    packet: Option<&ffmpeg_next::Packet>,
    scratch: &mut F,
    mut take: impl FnMut(&F) -> Result<()>,
) -> Result<()>
where
    F: DerefMut<Target = Frame>,
{
    let send = |decoder: &mut Decoder| match packet {
        Some(packet) => decoder.send_packet(packet),
        None => decoder.send_eof(),
    };

    match send(decoder) {
        Ok(()) | Err(ffmpeg_next::Error::Eof) => {}
        Err(e) if is_again(&e) => {
            receive_all(decoder, scratch, &mut take)?;
            resend_outcome(send(decoder))?;
        }
        Err(e) => return Err(Error::codec(e.to_string())),
    }

    receive_all(decoder, scratch, &mut take)
}

fn resend_outcome(result: std::result::Result<(), ffmpeg_next::Error>) -> Result<()> {
    match result {
        Ok(()) | Err(ffmpeg_next::Error::Eof) => Ok(()),
        Err(e) if is_again(&e) => Err(Error::codec(
            "decoder input still full after draining, packet dropped",
        )),
        Err(e) => Err(Error::codec(e.to_string())),
    }
}

fn receive_all<F>(
    decoder: &mut Decoder,
    scratch: &mut F,
    take: &mut impl FnMut(&F) -> Result<()>,
) -> Result<()>
where
    F: DerefMut<Target = Frame>,
{
    loop {
        match decoder.receive_frame(scratch) {
            Ok(()) => take(scratch)?,
            Err(ffmpeg_next::Error::Eof) => return Ok(()),
            Err(e) if is_again(&e) => return Ok(()),
            Err(e) => return Err(Error::codec(e.to_string())),
        }
    }
}
