//! Presentation hand-off
//!
//! Sessions push frames and lifecycle events into a [`PresentationSink`]
//! from the decode thread. [`ChannelSink`] turns those calls into channel
//! messages the presentation thread drains on its own schedule.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::debug;

use super::error::PlayerError;
use super::frame::{PresentedFrame, SessionId};
use super::session::PlaybackState;

/// Receiver of finished frames
///
/// All methods are called on the decode thread and must return promptly.
/// Implementations must not call back into the owning player.
pub trait PresentationSink: Send + Sync + 'static {
    /// One converted frame, in decode order
    fn on_frame_ready(&self, frame: PresentedFrame);

    fn on_state_changed(&self, _session: SessionId, _state: PlaybackState) {}

    /// Called once when a session ends in [`PlaybackState::Failed`]
    fn on_error(&self, _session: SessionId, _error: &PlayerError) {}
}

/// Lifecycle notification delivered through [`ChannelSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        session: SessionId,
        state: PlaybackState,
    },
    Failed {
        session: SessionId,
        error: PlayerError,
    },
}

type Waker = Box<dyn Fn() + Send + Sync>;

/// Channel-backed sink with a bounded, latest-wins frame mailbox
pub struct ChannelSink {
    frames_tx: Sender<PresentedFrame>,
    /// Kept to evict the oldest frame when the mailbox is full
    frames_evict: Receiver<PresentedFrame>,
    events_tx: Sender<SessionEvent>,
    waker: Option<Waker>,
}

/// Presentation-side ends of a [`ChannelSink`]
pub struct FrameReceiver {
    frames: Receiver<PresentedFrame>,
    events: Receiver<SessionEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, FrameReceiver) {
        let (frames_tx, frames_rx) = bounded(capacity.max(1));
        let (events_tx, events_rx) = unbounded();

        let sink = Self {
            frames_tx,
            frames_evict: frames_rx.clone(),
            events_tx,
            waker: None,
        };
        let receiver = FrameReceiver {
            frames: frames_rx,
            events: events_rx,
        };
        (sink, receiver)
    }

    /// Run `waker` after every enqueued message, e.g. to request a repaint
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Box::new(waker));
        self
    }

    fn wake(&self) {
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}

impl PresentationSink for ChannelSink {
    fn on_frame_ready(&self, frame: PresentedFrame) {
        let mut frame = frame;
        loop {
            match self.frames_tx.try_send(frame) {
                Ok(()) => break,
                Err(TrySendError::Full(rejected)) => {
                    if let Ok(stale) = self.frames_evict.try_recv() {
                        debug!(
                            "Presenter behind, dropped frame {} (packet {}) of session {}",
                            stale.sequence(),
                            stale.packet_index(),
                            stale.session()
                        );
                    }
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
        self.wake();
    }

    fn on_state_changed(&self, session: SessionId, state: PlaybackState) {
        let _ = self.events_tx.send(SessionEvent::StateChanged { session, state });
        self.wake();
    }

    fn on_error(&self, session: SessionId, error: &PlayerError) {
        let _ = self.events_tx.send(SessionEvent::Failed {
            session,
            error: error.clone(),
        });
        self.wake();
    }
}

impl FrameReceiver {
    /// Drain the mailbox and keep only the newest frame
    pub fn try_latest(&self) -> Option<PresentedFrame> {
        self.frames.try_iter().last()
    }

    /// All lifecycle events queued so far
    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }
}
