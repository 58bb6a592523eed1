//! FFmpeg backend
//!
//! Container reading, decoding and RGB24 conversion on top of `ffmpeg-next`.

use std::sync::OnceLock;

use tracing::{debug, info, warn};

use ffmpeg_next as ffmpeg;
use ffmpeg::ffi;
use ffmpeg::format::context::Input;
use ffmpeg::format::Pixel;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{Context as Scaler, Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;

use super::backend::{ContainerReader, DecoderEngine, MediaBackend, PixelConverter};
use super::error::PlayerError;
use super::frame::RgbView;
use super::stream::{MediaKind, MediaSource, StreamDescriptor};

static FFMPEG_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// One-time library and network initialization, shared by all sessions
fn ensure_initialized() -> Result<(), String> {
    FFMPEG_INIT
        .get_or_init(|| {
            ffmpeg::init().map_err(|e| e.to_string())?;
            ffmpeg::format::network::init();
            info!("FFmpeg initialized");
            Ok(())
        })
        .clone()
}

/// Production backend; formats and codecs are auto-detected
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegBackend;

/// Opened input context
pub struct FfmpegContainer {
    input: Input,
    source: MediaSource,
}

/// Video decoder plus its scratch picture
pub struct FfmpegDecoder {
    decoder: ffmpeg::codec::decoder::Video,
    picture: VideoFrame,
    codec: String,
}

/// Scaler context and the reusable RGB24 conversion buffer
pub struct FfmpegConverter {
    scaler: Scaler,
    buffer: VideoFrame,
}

impl MediaBackend for FfmpegBackend {
    type Packet = ffmpeg::Packet;
    type Picture = VideoFrame;
    type Container = FfmpegContainer;
    type Decoder = FfmpegDecoder;
    type Converter = FfmpegConverter;

    fn open(&self, source: &MediaSource) -> Result<FfmpegContainer, PlayerError> {
        let open_failed = |detail: String| PlayerError::OpenFailed {
            source_name: source.to_string(),
            detail,
        };

        ensure_initialized().map_err(open_failed)?;

        let input = ffmpeg::format::input(&source.as_str()).map_err(|e| match e {
            ffmpeg::Error::Other { errno } if errno == ffmpeg::error::ENOENT => {
                open_failed("file not found".to_string())
            }
            e => open_failed(e.to_string()),
        })?;
        debug!("Opened container {} ({})", source, input.format().name());

        Ok(FfmpegContainer {
            input,
            source: source.clone(),
        })
    }

    fn open_decoder(
        &self,
        container: &FfmpegContainer,
        stream: &StreamDescriptor,
    ) -> Result<FfmpegDecoder, PlayerError> {
        let open_failed = |detail: String| PlayerError::DecoderOpenFailed {
            codec: stream.codec.clone(),
            detail,
        };

        let av_stream = container
            .input
            .stream(stream.index)
            .ok_or_else(|| open_failed(format!("stream #{} disappeared", stream.index)))?;
        let parameters = av_stream.parameters();

        if ffmpeg::codec::decoder::find(parameters.id()).is_none() {
            return Err(PlayerError::UnsupportedCodec {
                codec: stream.codec.clone(),
            });
        }

        let context = ffmpeg::codec::context::Context::from_parameters(parameters)
            .map_err(|e| open_failed(e.to_string()))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| open_failed(e.to_string()))?;

        info!(
            "Opened {} decoder: {}x{}, format: {:?}",
            stream.codec,
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(FfmpegDecoder {
            decoder,
            picture: VideoFrame::empty(),
            codec: stream.codec.clone(),
        })
    }

    fn init_converter(&self, decoder: &FfmpegDecoder) -> Result<FfmpegConverter, PlayerError> {
        let width = decoder.decoder.width();
        let height = decoder.decoder.height();
        let format = decoder.decoder.format();

        // Same size in and out: a pure format conversion
        let scaler = Scaler::get(format, width, height, Pixel::RGB24, width, height, Flags::BILINEAR)
            .map_err(|e| PlayerError::ConverterInitFailed {
                width,
                height,
                format: format!("{:?}", format),
                detail: e.to_string(),
            })?;

        Ok(FfmpegConverter {
            scaler,
            buffer: VideoFrame::empty(),
        })
    }
}

impl ContainerReader for FfmpegContainer {
    type Packet = ffmpeg::Packet;

    fn probe(&mut self) -> Result<Vec<StreamDescriptor>, PlayerError> {
        let streams: Vec<StreamDescriptor> = self.input.streams().map(|s| describe_stream(&s)).collect();

        if streams.is_empty() {
            return Err(PlayerError::ProbeFailed {
                source_name: self.source.to_string(),
                detail: "container reports no streams".to_string(),
            });
        }

        for stream in &streams {
            debug!(
                "Stream #{}: {:?} {} {}x{}",
                stream.index, stream.kind, stream.codec, stream.width, stream.height
            );
        }
        Ok(streams)
    }

    fn read_packet(&mut self) -> Option<(usize, ffmpeg::Packet)> {
        loop {
            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => return Some((packet.stream(), packet)),
                Err(ffmpeg::Error::Eof) => return None,
                Err(ffmpeg::Error::Other { errno }) if errno == ffi::EAGAIN => continue,
                Err(e) => {
                    warn!("Demux error on {}, treating as end of stream: {}", self.source, e);
                    return None;
                }
            }
        }
    }
}

fn describe_stream(stream: &ffmpeg::format::stream::Stream<'_>) -> StreamDescriptor {
    let parameters = stream.parameters();

    let kind = match parameters.medium() {
        Type::Video => MediaKind::Video,
        Type::Audio => MediaKind::Audio,
        Type::Subtitle => MediaKind::Subtitle,
        Type::Data => MediaKind::Data,
        Type::Attachment => MediaKind::Attachment,
        Type::Unknown => MediaKind::Unknown,
    };

    // SAFETY: the parameters pointer is owned by the open input context,
    // which outlives this borrow.
    let (width, height, raw_format) = unsafe {
        let ptr = parameters.as_ptr();
        ((*ptr).width.max(0) as u32, (*ptr).height.max(0) as u32, (*ptr).format)
    };

    // The format field holds a sample format for audio streams
    let pixel_format = match kind {
        MediaKind::Video => pixel_format_name(raw_format),
        _ => None,
    };

    StreamDescriptor {
        index: stream.index(),
        kind,
        codec: parameters.id().name().to_string(),
        width,
        height,
        pixel_format,
    }
}

/// Short FFmpeg name (`yuv420p`, `bgr24`, ...) of a raw `AVPixelFormat` value
fn pixel_format_name(raw: i32) -> Option<String> {
    if raw < 0 || raw >= ffi::AVPixelFormat::AV_PIX_FMT_NB as i32 {
        return None;
    }
    // SAFETY: AVPixelFormat is a contiguous C enum and `raw` lies in 0..NB.
    let format: ffi::AVPixelFormat = unsafe { std::mem::transmute(raw) };
    Pixel::from(format).descriptor().map(|d| d.name().to_string())
}

impl DecoderEngine for FfmpegDecoder {
    type Packet = ffmpeg::Packet;
    type Picture = VideoFrame;

    fn send_packet(&mut self, packet: &ffmpeg::Packet, packet_index: u64) -> Result<(), PlayerError> {
        self.decoder
            .send_packet(packet)
            .map_err(|e| PlayerError::SendFailed {
                packet_index,
                detail: e.to_string(),
            })
    }

    fn send_eof(&mut self) -> Result<(), PlayerError> {
        match self.decoder.send_eof() {
            Ok(()) | Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(PlayerError::decode(format!("{} flush failed: {}", self.codec, e))),
        }
    }

    fn receive_picture(&mut self) -> Result<Option<&VideoFrame>, PlayerError> {
        match self.decoder.receive_frame(&mut self.picture) {
            Ok(()) => Ok(Some(&self.picture)),
            // Needs more input
            Err(ffmpeg::Error::Other { errno }) if errno == ffi::EAGAIN => Ok(None),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(PlayerError::decode(format!("{}: {}", self.codec, e))),
        }
    }
}

impl PixelConverter for FfmpegConverter {
    type Picture = VideoFrame;

    fn convert(&mut self, picture: &VideoFrame) -> Result<RgbView<'_>, PlayerError> {
        let input = self.scaler.input();
        if input.format != picture.format()
            || input.width != picture.width()
            || input.height != picture.height()
        {
            debug!(
                "Picture changed to {}x{} {:?}, rebuilding converter",
                picture.width(),
                picture.height(),
                picture.format()
            );
            self.scaler.cached(
                picture.format(),
                picture.width(),
                picture.height(),
                Pixel::RGB24,
                picture.width(),
                picture.height(),
                Flags::BILINEAR,
            );
            // Reallocated at the new size by the next run
            self.buffer = VideoFrame::empty();
        }

        self.scaler
            .run(picture, &mut self.buffer)
            .map_err(|e| PlayerError::decode(format!("pixel conversion failed: {}", e)))?;

        Ok(RgbView {
            width: self.buffer.width(),
            height: self.buffer.height(),
            stride: self.buffer.stride(0),
            data: self.buffer.data(0),
        })
    }
}
