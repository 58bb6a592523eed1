//! Playback error taxonomy
//!
//! Every failure a session can hit maps onto one [`PlayerError`] variant.
//! Only [`ErrorKind::SendFailed`] is recoverable at packet granularity;
//! everything else ends the session in [`PlaybackState::Failed`].
//!
//! [`PlaybackState::Failed`]: super::PlaybackState::Failed

use thiserror::Error;

/// Errors produced by the decode pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// Container could not be opened
    #[error("failed to open '{source_name}': {detail}")]
    OpenFailed { source_name: String, detail: String },

    /// Container opened but stream information is unavailable
    #[error("failed to probe streams of '{source_name}': {detail}")]
    ProbeFailed { source_name: String, detail: String },

    /// No stream with a video media type
    #[error("no video stream in '{source_name}'")]
    NoVideoStream { source_name: String },

    /// No decoder registered for the stream's codec
    #[error("no decoder available for codec {codec}")]
    UnsupportedCodec { codec: String },

    /// A decoder exists but could not be opened
    #[error("failed to open {codec} decoder: {detail}")]
    DecoderOpenFailed { codec: String, detail: String },

    /// Pixel converter could not be created for the decoded format
    #[error("failed to create {width}x{height} {format} -> RGB24 converter: {detail}")]
    ConverterInitFailed {
        width: u32,
        height: u32,
        format: String,
        detail: String,
    },

    /// Decoder rejected a packet
    #[error("decoder rejected packet #{packet_index}: {detail}")]
    SendFailed { packet_index: u64, detail: String },

    /// Decoder or converter produced an unrecoverable error
    #[error("decode failed: {detail}")]
    DecodeFailed { detail: String },

    /// Decode thread could not be started
    #[error("failed to spawn decode thread: {detail}")]
    ThreadSpawn { detail: String },
}

/// Copyable discriminant of [`PlayerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OpenFailed,
    ProbeFailed,
    NoVideoStream,
    UnsupportedCodec,
    DecoderOpenFailed,
    ConverterInitFailed,
    SendFailed,
    DecodeFailed,
    ThreadSpawn,
}

impl ErrorKind {
    /// Whether the session may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::SendFailed)
    }

    /// Numeric code reported over the control channel
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::OpenFailed => 10,
            ErrorKind::ProbeFailed => 11,
            ErrorKind::NoVideoStream => 12,
            ErrorKind::UnsupportedCodec => 20,
            ErrorKind::DecoderOpenFailed => 21,
            ErrorKind::ConverterInitFailed => 22,
            ErrorKind::SendFailed => 30,
            ErrorKind::DecodeFailed => 31,
            ErrorKind::ThreadSpawn => 100,
        }
    }
}

impl PlayerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlayerError::OpenFailed { .. } => ErrorKind::OpenFailed,
            PlayerError::ProbeFailed { .. } => ErrorKind::ProbeFailed,
            PlayerError::NoVideoStream { .. } => ErrorKind::NoVideoStream,
            PlayerError::UnsupportedCodec { .. } => ErrorKind::UnsupportedCodec,
            PlayerError::DecoderOpenFailed { .. } => ErrorKind::DecoderOpenFailed,
            PlayerError::ConverterInitFailed { .. } => ErrorKind::ConverterInitFailed,
            PlayerError::SendFailed { .. } => ErrorKind::SendFailed,
            PlayerError::DecodeFailed { .. } => ErrorKind::DecodeFailed,
            PlayerError::ThreadSpawn { .. } => ErrorKind::ThreadSpawn,
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        PlayerError::DecodeFailed {
            detail: detail.into(),
        }
    }
}
