//! Demux / decode / convert seams
//!
//! The session loop is written against these traits. [`FfmpegBackend`]
//! is the production implementation; tests drive the same loop with
//! scripted in-memory backends.
//!
//! All objects except the backend itself are created and dropped on the
//! decode thread, so only the backend needs to be `Send + Sync`.
//!
//! [`FfmpegBackend`]: super::decoder::FfmpegBackend

use super::error::PlayerError;
use super::frame::RgbView;
use super::stream::{MediaSource, StreamDescriptor};

/// Factory for the per-session pipeline objects
pub trait MediaBackend: Send + Sync + 'static {
    type Packet;
    type Picture;
    type Container: ContainerReader<Packet = Self::Packet>;
    type Decoder: DecoderEngine<Packet = Self::Packet, Picture = Self::Picture>;
    type Converter: PixelConverter<Picture = Self::Picture>;

    /// Open a container (`OpenFailed`)
    fn open(&self, source: &MediaSource) -> Result<Self::Container, PlayerError>;

    /// Bind a decoder to the selected stream (`UnsupportedCodec`, `DecoderOpenFailed`)
    fn open_decoder(
        &self,
        container: &Self::Container,
        stream: &StreamDescriptor,
    ) -> Result<Self::Decoder, PlayerError>;

    /// RGB24 converter at the decoder's native resolution
    fn init_converter(&self, decoder: &Self::Decoder) -> Result<Self::Converter, PlayerError>;
}

/// Opened container with a demux cursor
pub trait ContainerReader {
    type Packet;

    /// Stream metadata in container order (`ProbeFailed`)
    fn probe(&mut self) -> Result<Vec<StreamDescriptor>, PlayerError>;

    /// Next packet and the index of the stream it belongs to
    ///
    /// `None` is end of stream.
    fn read_packet(&mut self) -> Option<(usize, Self::Packet)>;
}

/// Decoder state for one stream
pub trait DecoderEngine {
    type Packet;
    type Picture;

    fn send_packet(&mut self, packet: &Self::Packet, packet_index: u64) -> Result<(), PlayerError>;

    /// Signal end of input so buffered pictures can be drained
    fn send_eof(&mut self) -> Result<(), PlayerError>;

    /// Next decoded picture, `None` once the decoder needs more input
    ///
    /// The picture lives in decoder-owned scratch storage and is replaced by
    /// the next call.
    fn receive_picture(&mut self) -> Result<Option<&Self::Picture>, PlayerError>;
}

/// Native picture -> packed RGB24 at the same resolution
pub trait PixelConverter {
    type Picture;

    /// Convert into the converter's reusable buffer
    ///
    /// The returned view borrows that buffer, so it must be copied out
    /// before the next conversion.
    fn convert(&mut self, picture: &Self::Picture) -> Result<RgbView<'_>, PlayerError>;
}
