//! Playback tuning
//!
//! Values come from command-line flags; there is no configuration file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed pacing interval, roughly 25 fps
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 40;

/// Frames buffered between the decode thread and the presenter
pub const DEFAULT_FRAME_QUEUE: usize = 4;

/// Consecutive rejected packets tolerated before a session fails
pub const DEFAULT_MAX_SEND_FAILURES: u32 = 8;

/// Per-player playback settings, copied into every session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay after each presented frame in milliseconds
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Capacity of the frame mailbox; older frames are evicted when full
    #[serde(default = "default_frame_queue")]
    pub frame_queue: usize,

    #[serde(default = "default_max_send_failures")]
    pub max_send_failures: u32,
}

fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

fn default_frame_queue() -> usize {
    DEFAULT_FRAME_QUEUE
}

fn default_max_send_failures() -> u32 {
    DEFAULT_MAX_SEND_FAILURES
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            frame_queue: DEFAULT_FRAME_QUEUE,
            max_send_failures: DEFAULT_MAX_SEND_FAILURES,
        }
    }
}

impl PlaybackConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_frame_queue(mut self, capacity: usize) -> Self {
        self.frame_queue = capacity.max(1);
        self
    }

    pub fn with_max_send_failures(mut self, limit: u32) -> Self {
        self.max_send_failures = limit;
        self
    }

    /// Approximate presentation rate implied by the interval
    pub fn fps(&self) -> f64 {
        if self.frame_interval_ms == 0 {
            return 0.0;
        }
        1000.0 / self.frame_interval_ms as f64
    }
}
