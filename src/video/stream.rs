//! Media sources, stream metadata and video stream selection

use std::fmt;
use std::path::Path;

use tracing::info;

use super::error::PlayerError;

/// Input identifier: a filesystem path or any URL the demuxer accepts
///
/// Handed to the demuxer verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaSource(String);

impl MediaSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaSource {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Path> for MediaSource {
    fn from(value: &Path) -> Self {
        Self(value.to_string_lossy().into_owned())
    }
}

/// Media type of a container stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    #[default]
    Unknown,
}

/// Per-stream metadata, read-only after probing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Position in the container's stream list
    pub index: usize,
    pub kind: MediaKind,
    /// Codec identifier as reported by the demuxer
    pub codec: String,
    /// Coded width (0 for non-video streams)
    pub width: u32,
    /// Coded height (0 for non-video streams)
    pub height: u32,
    pub pixel_format: Option<String>,
}

/// Pick the first video stream in container order
///
/// No preference is given to resolution or codec.
pub fn select_video_stream<'a>(
    source: &MediaSource,
    streams: &'a [StreamDescriptor],
) -> Result<&'a StreamDescriptor, PlayerError> {
    let stream = streams
        .iter()
        .find(|s| s.kind == MediaKind::Video)
        .ok_or_else(|| PlayerError::NoVideoStream {
            source_name: source.to_string(),
        })?;

    info!(
        "Selected stream #{} of {}: {} {}x{}",
        stream.index,
        streams.len(),
        stream.codec,
        stream.width,
        stream.height
    );
    Ok(stream)
}
