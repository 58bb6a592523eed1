//! Video module
//!
//! Decodes a container on a background thread and hands paced RGB frames
//! to a presentation sink.
//!
//! # Usage
//!
//! ```rust,ignore
//! use video::{ChannelSink, VideoPlayer};
//!
//! let (sink, frames) = ChannelSink::new(4);
//! let player = VideoPlayer::new(Arc::new(sink), PlaybackConfig::default());
//! player.play_video("clip.mp4");
//!
//! // On the presentation thread
//! if let Some(frame) = frames.try_latest() {
//!     // Paint the frame
//! }
//! ```

mod backend;
mod decoder;
mod error;
mod frame;
mod pacer;
mod player;
mod session;
mod sink;
mod stream;

#[cfg(test)]
mod testing;

pub use error::PlayerError;
pub use frame::{PresentedFrame, RgbView, SessionId};
pub use player::VideoPlayer;
pub use session::PlaybackState;
pub use sink::{ChannelSink, FrameReceiver, PresentationSink, SessionEvent};
pub use stream::MediaSource;
