//! View state
//!
//! Folds session events and frames into what the window displays. Events and
//! frames from sessions other than the current one are ignored for display.

use crate::video::{PlaybackState, PresentedFrame, SessionEvent, SessionId};

/// What the presentation surface knows about playback
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Session whose frames are displayed
    pub session: Option<SessionId>,
    /// Last reported state of that session
    pub state: PlaybackState,
    /// Message of the last failure; the previous frame stays on screen
    pub last_error: Option<String>,
    /// Frames presented for the current session
    pub frames_shown: u64,
    /// Frames evicted from the mailbox before they could be presented
    pub frames_skipped: u64,
    /// Dimensions of the displayed frame
    pub frame_size: Option<(u32, u32)>,
    last_sequence: Option<u64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new session was requested; keeps the displayed frame
    pub fn begin(&mut self, session: SessionId) {
        self.session = Some(session);
        self.state = PlaybackState::Idle;
        self.last_error = None;
        self.frames_shown = 0;
        self.frames_skipped = 0;
        self.last_sequence = None;
    }

    pub fn is_current(&self, session: SessionId) -> bool {
        self.session == Some(session)
    }

    /// Apply a lifecycle event, returns false if it belongs to another session
    pub fn apply_event(&mut self, event: &SessionEvent) -> bool {
        match event {
            SessionEvent::StateChanged { session, state } => {
                if !self.is_current(*session) {
                    return false;
                }
                self.state = *state;
            }
            SessionEvent::Failed { session, error } => {
                if !self.is_current(*session) {
                    return false;
                }
                self.state = PlaybackState::Failed;
                self.last_error = Some(error.to_string());
            }
        }
        true
    }

    /// Whether `frame` should replace the displayed one
    pub fn accept_frame(&mut self, frame: &PresentedFrame) -> bool {
        if !self.is_current(frame.session()) {
            return false;
        }
        if let Some(last) = self.last_sequence {
            self.frames_skipped += frame.sequence().saturating_sub(last + 1);
        } else {
            self.frames_skipped += frame.sequence();
        }
        self.last_sequence = Some(frame.sequence());
        self.frames_shown += 1;
        self.frame_size = Some((frame.width(), frame.height()));
        true
    }

    /// One-line status for the bottom of the window
    pub fn status_line(&self) -> String {
        let session = self
            .session
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let size = self
            .frame_size
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Session: {} | State: {} | Frame: {} | Skipped: {} | Size: {}",
            session,
            self.state.display_name(),
            self.frames_shown,
            self.frames_skipped,
            size
        )
    }
}
