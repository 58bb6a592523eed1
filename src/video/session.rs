//! Playback session
//!
//! One session owns one decode thread, which walks
//! `Idle -> Opening -> Selecting -> DecodeLoop -> Draining -> Stopped`
//! (or ends in `Failed`). Container, decoder and converter are created on
//! that thread and never leave it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::PlaybackConfig;

use super::backend::{ContainerReader, DecoderEngine, MediaBackend, PixelConverter};
use super::error::PlayerError;
use super::frame::{PresentedFrame, SessionId};
use super::pacer::{stop_pair, FramePacer, StopHandle, StopSignal};
use super::sink::PresentationSink;
use super::stream::{select_video_stream, MediaSource};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlaybackState {
    /// No resources held
    #[default]
    Idle = 0,
    /// Opening and probing the container
    Opening = 1,
    /// Choosing the video stream and binding a decoder
    Selecting = 2,
    /// Reading, decoding, converting and presenting
    DecodeLoop = 3,
    /// Releasing converter, decoder and container
    Draining = 4,
    /// Finished normally or on request
    Stopped = 5,
    /// Finished on an unrecoverable error
    Failed = 6,
}

impl PlaybackState {
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Opening => "Opening",
            PlaybackState::Selecting => "Selecting",
            PlaybackState::DecodeLoop => "Playing",
            PlaybackState::Draining => "Draining",
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Stopped | PlaybackState::Failed)
    }
}

/// Counters reported when a session finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub packets_read: u64,
    pub packets_skipped: u64,
    pub packets_rejected: u64,
    pub frames_emitted: u64,
    pub stopped: bool,
}

/// Handle to a running decode thread
pub struct PlaybackSession {
    id: SessionId,
    sink: Arc<dyn PresentationSink>,
    state: Arc<Mutex<PlaybackState>>,
    stop: StopHandle,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Start decoding `source` on a new thread
    pub fn spawn<B: MediaBackend>(
        id: SessionId,
        source: MediaSource,
        backend: Arc<B>,
        sink: Arc<dyn PresentationSink>,
        config: PlaybackConfig,
    ) -> Result<Self, PlayerError> {
        let (stop, signal) = stop_pair();
        let state = Arc::new(Mutex::new(PlaybackState::Idle));

        let worker = SessionWorker {
            id,
            source,
            backend,
            sink: Arc::clone(&sink),
            config,
            state: Arc::clone(&state),
            stop: signal,
        };

        let handle = thread::Builder::new()
            .name(format!("decode-{}", id.0))
            .spawn(move || worker.run())
            .map_err(|e| PlayerError::ThreadSpawn {
                detail: e.to_string(),
            })?;

        Ok(Self {
            id,
            sink,
            state,
            stop,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock()
    }

    /// Signal stop and block until the decode thread has released everything
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.signal();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Decode thread of session {} panicked", self.id);
                *self.state.lock() = PlaybackState::Failed;
                self.sink
                    .on_error(self.id, &PlayerError::decode("decode thread panicked"));
                self.sink.on_state_changed(self.id, PlaybackState::Failed);
            }
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State carried onto the decode thread
struct SessionWorker<B: MediaBackend> {
    id: SessionId,
    source: MediaSource,
    backend: Arc<B>,
    sink: Arc<dyn PresentationSink>,
    config: PlaybackConfig,
    state: Arc<Mutex<PlaybackState>>,
    stop: StopSignal,
}

impl<B: MediaBackend> SessionWorker<B> {
    fn run(self) {
        info!("Session {} starting: {}", self.id, self.source);

        if self.stop.is_stopped() {
            debug!("Session {} stopped before opening", self.id);
            self.transition(PlaybackState::Stopped);
            return;
        }

        match self.play() {
            Ok(stats) => {
                info!(
                    "Session {} finished: {} frames from {} packets ({} skipped, {} rejected){}",
                    self.id,
                    stats.frames_emitted,
                    stats.packets_read,
                    stats.packets_skipped,
                    stats.packets_rejected,
                    if stats.stopped { ", stopped" } else { "" }
                );
                self.transition(PlaybackState::Stopped);
            }
            Err(e) => {
                error!("Session {} failed: {}", self.id, e);
                self.sink.on_error(self.id, &e);
                self.transition(PlaybackState::Failed);
            }
        }
    }

    fn transition(&self, next: PlaybackState) {
        *self.state.lock() = next;
        debug!("Session {} -> {}", self.id, next.display_name());
        self.sink.on_state_changed(self.id, next);
    }

    fn play(&self) -> Result<LoopStats, PlayerError> {
        self.transition(PlaybackState::Opening);
        let mut container = self.backend.open(&self.source)?;
        let streams = container.probe()?;

        self.transition(PlaybackState::Selecting);
        let stream = select_video_stream(&self.source, &streams)?;
        let mut decoder = self.backend.open_decoder(&container, stream)?;
        let mut converter = self.backend.init_converter(&decoder)?;

        self.transition(PlaybackState::DecodeLoop);
        let outcome = self.decode_loop(&mut container, &mut decoder, &mut converter, stream.index);

        // Reverse acquisition order
        self.transition(PlaybackState::Draining);
        drop(converter);
        drop(decoder);
        drop(container);

        outcome
    }

    fn decode_loop(
        &self,
        container: &mut B::Container,
        decoder: &mut B::Decoder,
        converter: &mut B::Converter,
        stream_index: usize,
    ) -> Result<LoopStats, PlayerError> {
        let pacer = FramePacer::new(self.config.frame_interval());
        let mut stats = LoopStats::default();
        let mut consecutive_rejects = 0u32;
        let mut last_video_packet = 0u64;

        loop {
            if self.stop.is_stopped() {
                stats.stopped = true;
                return Ok(stats);
            }

            let Some((index, packet)) = container.read_packet() else {
                break;
            };
            let packet_index = stats.packets_read;
            stats.packets_read += 1;

            if index != stream_index {
                stats.packets_skipped += 1;
                continue;
            }
            last_video_packet = packet_index;

            if let Err(e) = decoder.send_packet(&packet, packet_index) {
                stats.packets_rejected += 1;
                consecutive_rejects += 1;
                if !e.kind().is_recoverable() || consecutive_rejects > self.config.max_send_failures {
                    return Err(e);
                }
                warn!("Session {}: skipping packet: {}", self.id, e);
                continue;
            }
            consecutive_rejects = 0;
            drop(packet);

            if !self.drain_decoder(decoder, converter, &pacer, packet_index, &mut stats)? {
                stats.stopped = true;
                return Ok(stats);
            }
        }

        // End of stream: flush pictures still buffered for reordering
        decoder.send_eof()?;
        if !self.drain_decoder(decoder, converter, &pacer, last_video_packet, &mut stats)? {
            stats.stopped = true;
        }
        Ok(stats)
    }

    /// Emit every picture the decoder has ready
    ///
    /// Returns `false` when stopped mid-drain.
    fn drain_decoder(
        &self,
        decoder: &mut B::Decoder,
        converter: &mut B::Converter,
        pacer: &FramePacer,
        packet_index: u64,
        stats: &mut LoopStats,
    ) -> Result<bool, PlayerError> {
        while let Some(picture) = decoder.receive_picture()? {
            if self.stop.is_stopped() {
                return Ok(false);
            }

            let view = converter.convert(picture)?;
            let frame = PresentedFrame::copy_from(view, self.id, stats.frames_emitted, packet_index)?;
            self.sink.on_frame_ready(frame);
            stats.frames_emitted += 1;

            if !pacer.wait(&self.stop) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
