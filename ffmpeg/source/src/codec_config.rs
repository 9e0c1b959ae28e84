/*!
    Codec parameters handed from a source to decoders and sinks.
*/

use ffmpeg_next::{codec, media};

use ffmpeg_types::CodecId;

use crate::convert::codec_id_from_ffmpeg;

/**
    Codec parameters of one stream, held as an owned copy.

    Decoders are opened from it, and sinks declare stream-copied outputs
    from it. An opened encoder produces one as well, so its output stream
    can be declared the same way.
*/
pub struct CodecConfig {
    parameters: codec::Parameters,
}

impl CodecConfig {
    pub fn from_parameters(parameters: codec::Parameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &codec::Parameters {
        &self.parameters
    }

    pub fn codec_id(&self) -> CodecId {
        codec_id_from_ffmpeg(self.parameters.id())
    }

    /// FFmpeg's short codec name, e.g. "h264" or "pcm_alaw".
    pub fn codec_name(&self) -> &'static str {
        self.parameters.id().name()
    }

    pub fn is_video(&self) -> bool {
        self.parameters.medium() == media::Type::Video
    }

    pub fn is_audio(&self) -> bool {
        self.parameters.medium() == media::Type::Audio
    }
}

impl Clone for CodecConfig {
    fn clone(&self) -> Self {
        Self::from_parameters(self.parameters.clone())
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field("codec", &self.codec_name())
            .field("medium", &self.parameters.medium())
            .finish()
    }
}
