//! Fixed-interval frame pacing and the session stop signal

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Owner side of a stop signal; signalling drops the channel sender
#[derive(Debug)]
pub struct StopHandle {
    tx: Option<Sender<()>>,
}

impl StopHandle {
    /// Request the decode thread to stop. Idempotent.
    pub fn signal(&mut self) {
        self.tx.take();
    }
}

/// Decode-thread side of a stop signal
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

/// Create a connected stop handle / signal pair
pub fn stop_pair() -> (StopHandle, StopSignal) {
    let (tx, rx) = bounded(0);
    (StopHandle { tx: Some(tx) }, StopSignal { rx })
}

/// Sleeps a fixed interval between presented frames
///
/// Stream timestamps are ignored.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    interval: Duration,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Block for one interval
    ///
    /// Returns early with `false` as soon as `stop` is signalled.
    pub fn wait(&self, stop: &StopSignal) -> bool {
        if self.interval.is_zero() {
            return !stop.is_stopped();
        }

        match stop.rx.recv_timeout(self.interval) {
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) | Ok(()) => false,
        }
    }
}
