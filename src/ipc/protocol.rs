//! IPC protocol definitions
//!
//! Line-delimited JSON messages between a controlling process and the player.

use serde::{Deserialize, Serialize};

use crate::video::{PlaybackState, PlayerError, SessionEvent, SessionId};

/// IPC message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum IpcMessage {
    // === Controller -> Player ===

    /// Start or restart playback
    #[serde(rename = "play")]
    Play { source: String },

    /// Stop the current session
    #[serde(rename = "stop")]
    Stop,

    /// Exit the player
    #[serde(rename = "shutdown")]
    Shutdown,

    // === Player -> Controller ===

    /// Player ready for commands
    #[serde(rename = "ready")]
    Ready,

    /// Session state change
    #[serde(rename = "state_update")]
    StateUpdate { session: u64, state: u8 },

    /// Error occurred
    #[serde(rename = "error")]
    Error {
        session: Option<u64>,
        code: i32,
        message: String,
    },
}

impl IpcMessage {
    pub fn state_update(session: SessionId, state: PlaybackState) -> Self {
        IpcMessage::StateUpdate {
            session: session.0,
            state: state as u8,
        }
    }

    pub fn ready() -> Self {
        IpcMessage::Ready
    }

    pub fn session_error(session: SessionId, error: &PlayerError) -> Self {
        IpcMessage::Error {
            session: Some(session.0),
            code: error.kind().code(),
            message: error.to_string(),
        }
    }

    /// Error not tied to a session, e.g. a malformed command
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        IpcMessage::Error {
            session: None,
            code,
            message: message.into(),
        }
    }

    /// Serialize to JSON string (line-delimited)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<&SessionEvent> for IpcMessage {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::StateChanged { session, state } => IpcMessage::state_update(*session, *state),
            SessionEvent::Failed { session, error } => IpcMessage::session_error(*session, error),
        }
    }
}

/// Error codes outside the playback taxonomy
pub mod error_codes {
    pub const PARSE_ERROR: i32 = 1;
}
