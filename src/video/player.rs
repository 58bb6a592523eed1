//! Video player
//!
//! Owns at most one [`PlaybackSession`] and replaces it on every
//! [`VideoPlayer::play_video`] call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use crate::config::PlaybackConfig;

use super::backend::MediaBackend;
use super::decoder::FfmpegBackend;
use super::frame::SessionId;
use super::session::{PlaybackSession, PlaybackState};
use super::sink::PresentationSink;
use super::stream::MediaSource;

/// Playback control surface for one presentation target
pub struct VideoPlayer<B: MediaBackend = FfmpegBackend> {
    backend: Arc<B>,
    sink: Arc<dyn PresentationSink>,
    config: PlaybackConfig,
    /// Current session; the lock is held across stop+join+spawn
    session: Mutex<Option<PlaybackSession>>,
    last_session: AtomicU64,
}

impl VideoPlayer<FfmpegBackend> {
    pub fn new(sink: Arc<dyn PresentationSink>, config: PlaybackConfig) -> Self {
        Self::with_backend(FfmpegBackend, sink, config)
    }
}

impl<B: MediaBackend> VideoPlayer<B> {
    pub fn with_backend(backend: B, sink: Arc<dyn PresentationSink>, config: PlaybackConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            sink,
            config,
            session: Mutex::new(None),
            last_session: AtomicU64::new(0),
        }
    }

    /// Start or restart playback
    ///
    /// Any running session is stopped and joined before the new source is
    /// opened, so frames from two sources never interleave. Failures are
    /// reported to the sink, not returned.
    pub fn play_video(&self, source: impl Into<MediaSource>) -> SessionId {
        let source = source.into();
        let mut slot = self.session.lock();

        if let Some(previous) = slot.take() {
            info!("Stopping session {} before loading {}", previous.id(), source);
            previous.stop();
        }

        let id = SessionId(self.last_session.fetch_add(1, Ordering::Relaxed) + 1);
        match PlaybackSession::spawn(
            id,
            source,
            Arc::clone(&self.backend),
            Arc::clone(&self.sink),
            self.config.clone(),
        ) {
            Ok(session) => *slot = Some(session),
            Err(e) => {
                error!("Failed to start session {}: {}", id, e);
                self.sink.on_error(id, &e);
                self.sink.on_state_changed(id, PlaybackState::Failed);
            }
        }
        id
    }

    /// Stop the current session and wait for it to release its resources
    pub fn stop(&self) {
        if let Some(session) = self.session.lock().take() {
            info!("Stopping session {}", session.id());
            session.stop();
        }
    }

    /// State of the current session, `Idle` when there is none
    pub fn state(&self) -> PlaybackState {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.state())
            .unwrap_or_default()
    }
}

impl<B: MediaBackend> Drop for VideoPlayer<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
