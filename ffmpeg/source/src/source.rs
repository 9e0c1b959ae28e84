/*!
    Media source implementation.
*/

use std::ffi::{CString, c_int};
use std::ptr;

use ffmpeg_next::{Dictionary, ffi, format::context::Input as InputContext, media::Type};

use ffmpeg_io::{AvioContext, MemoryBuffer};
use ffmpeg_types::{Error, MediaDuration, MediaInfo, Packet, Rational, Result, StreamType};

use crate::codec_config::CodecConfig;
use crate::convert::pts_from_ffmpeg;
use crate::probe::{SelectedStream, describe};

/**
    Options for opening a media source.
*/
#[derive(Clone, Debug, Default)]
pub struct SourceOptions {
    /// String-keyed demuxer/protocol options (e.g. `rtsp_transport=tcp`).
    pub options: Vec<(String, String)>,
    /// Force a demuxer by short name instead of probing (e.g. "mp4").
    pub format: Option<String>,
}

impl SourceOptions {
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    fn dictionary(&self) -> Dictionary<'static> {
        let mut dict = Dictionary::new();
        for (key, value) in &self.options {
            dict.set(key, value);
        }
        dict
    }
}

/**
    An opened input yielding the packets of its first video and first audio
    stream. Packets of any other stream are skipped.
*/
pub struct Source {
    input: InputContext,
    media_info: MediaInfo,
    video: Option<SelectedStream>,
    audio: Option<SelectedStream>,
    /// Custom I/O for memory-backed inputs. Declared after `input` so the
    /// format context is closed before the I/O it reads through.
    _io: Option<AvioContext>,
}

impl Source {
    /**
        Open a file path or network URL.

        # Example

        ```ignore
        let options = SourceOptions::default().with_option("rtsp_transport", "tcp");
        let source = Source::open("rtsp://camera/stream", options)?;
        println!("Duration: {:?}", source.media_info().duration);
        ```
    */
    pub fn open(location: &str, options: SourceOptions) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;
        ffmpeg_next::format::network::init();

        let input = ffmpeg_next::format::input_with_dictionary(&location, options.dictionary())
            .map_err(|e| {
                if e.to_string().contains("No such file") {
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        e.to_string(),
                    ))
                } else {
                    Error::codec(format!("failed to open input {location}: {e}"))
                }
            })?;

        Ok(Self::from_input(input, None))
    }

    /**
        Open a container held in memory, such as a previously captured clip.
    */
    pub fn from_memory(buffer: MemoryBuffer, options: SourceOptions) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

        let mut io = AvioContext::reader(buffer)?;

        let format_name = options
            .format
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(|_| Error::invalid_data("format name contains a NUL byte"))?;

        let input = unsafe {
            let mut ctx = ffi::avformat_alloc_context();
            if ctx.is_null() {
                return Err(Error::codec("failed to allocate input context"));
            }
            (*ctx).pb = io.as_mut_ptr();
            (*ctx).flags |= ffi::AVFMT_FLAG_CUSTOM_IO as c_int;

            let input_format = match &format_name {
                Some(name) => {
                    let found = ffi::av_find_input_format(name.as_ptr());
                    if found.is_null() {
                        ffi::avformat_free_context(ctx);
                        return Err(Error::unsupported_format(format!(
                            "unknown input format {:?}",
                            options.format
                        )));
                    }
                    found
                }
                None => ptr::null(),
            };

            let mut dict = options.dictionary().disown();
            let ret = ffi::avformat_open_input(&mut ctx, ptr::null(), input_format, &mut dict);
            Dictionary::own(dict);
            // On failure FFmpeg frees the context itself
            if ret < 0 {
                return Err(Error::codec(format!(
                    "failed to open input from memory: {}",
                    ffmpeg_next::Error::from(ret)
                )));
            }

            let ret = ffi::avformat_find_stream_info(ctx, ptr::null_mut());
            if ret < 0 {
                ffi::avformat_close_input(&mut ctx);
                return Err(Error::codec(format!(
                    "failed to find stream info: {}",
                    ffmpeg_next::Error::from(ret)
                )));
            }

            InputContext::wrap(ctx)
        };

        Ok(Self::from_input(input, Some(io)))
    }

    fn from_input(input: InputContext, io: Option<AvioContext>) -> Self {
        Self {
            media_info: describe(&input),
            video: SelectedStream::first(&input, Type::Video),
            audio: SelectedStream::first(&input, Type::Audio),
            input,
            _io: io,
        }
    }

    pub fn media_info(&self) -> &MediaInfo {
        &self.media_info
    }

    /**
        Parameters of the video stream, for opening a decoder or declaring a
        stream-copied output stream.
    */
    pub fn video_codec_config(&self) -> Option<&CodecConfig> {
        self.video.as_ref().map(|s| &s.codec_config)
    }

    pub fn audio_codec_config(&self) -> Option<&CodecConfig> {
        self.audio.as_ref().map(|s| &s.codec_config)
    }

    pub fn video_time_base(&self) -> Option<Rational> {
        self.video.as_ref().map(|s| s.time_base)
    }

    pub fn audio_time_base(&self) -> Option<Rational> {
        self.audio.as_ref().map(|s| s.time_base)
    }

    pub fn video_stream_index(&self) -> Option<usize> {
        self.video.as_ref().map(|s| s.index)
    }

    pub fn audio_stream_index(&self) -> Option<usize> {
        self.audio.as_ref().map(|s| s.index)
    }

    fn classify(&self, stream_index: usize) -> Option<(StreamType, Rational)> {
        let hit = |selected: &Option<SelectedStream>| {
            selected
                .as_ref()
                .filter(|s| s.index == stream_index)
                .map(|s| s.time_base)
        };
        hit(&self.video)
            .map(|tb| (StreamType::Video, tb))
            .or_else(|| hit(&self.audio).map(|tb| (StreamType::Audio, tb)))
    }

    /**
        Next packet in container order, or `None` at end of input.

        "Try again" from the demuxer is retried here and never surfaces.
    */
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            let mut ffmpeg_packet = ffmpeg_next::Packet::empty();
            match ffmpeg_packet.read(&mut self.input) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => continue,
                Err(e) => return Err(Error::codec(format!("failed to read packet: {}", e))),
            }

            let Some((stream_type, time_base)) = self.classify(ffmpeg_packet.stream()) else {
                continue;
            };

            let data = ffmpeg_packet.data().map(|d| d.to_vec()).unwrap_or_default();

            return Ok(Some(Packet::new(
                data,
                pts_from_ffmpeg(ffmpeg_packet.pts()),
                pts_from_ffmpeg(ffmpeg_packet.dts()),
                MediaDuration(ffmpeg_packet.duration()),
                time_base,
                ffmpeg_packet.is_key(),
                stream_type,
            )));
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("format", &self.media_info.format_name)
            .field("video_stream", &self.video_stream_index())
            .field("audio_stream", &self.audio_stream_index())
            .finish_non_exhaustive()
    }
}
