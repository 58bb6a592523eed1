//! Test doubles: scripted backend, recording sink and a tiny AVI writer

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::backend::{ContainerReader, DecoderEngine, MediaBackend, PixelConverter};
use super::error::PlayerError;
use super::frame::{PresentedFrame, RgbView, SessionId};
use super::session::PlaybackState;
use super::sink::PresentationSink;
use super::stream::{MediaKind, MediaSource, StreamDescriptor};

/// One scripted demuxer packet
#[derive(Debug, Clone)]
pub struct FakePacket {
    pub stream: usize,
    /// Solid colors of the pictures this packet decodes to
    pub pictures: Vec<[u8; 3]>,
    pub reject: bool,
    /// Send fails with an unrecoverable error
    pub fatal: bool,
    pub fail_decode: bool,
    pub panic_on_read: bool,
    pub read_delay: Duration,
}

impl FakePacket {
    pub fn video(stream: usize, pictures: &[[u8; 3]]) -> Self {
        Self {
            stream,
            pictures: pictures.to_vec(),
            reject: false,
            fatal: false,
            fail_decode: false,
            panic_on_read: false,
            read_delay: Duration::ZERO,
        }
    }

    pub fn other(stream: usize) -> Self {
        Self::video(stream, &[[0xAA, 0xAA, 0xAA]])
    }

    pub fn rejected(stream: usize) -> Self {
        Self {
            reject: true,
            ..Self::video(stream, &[])
        }
    }

    pub fn fatal(stream: usize) -> Self {
        Self {
            fatal: true,
            ..Self::video(stream, &[])
        }
    }

    pub fn panicking(stream: usize) -> Self {
        Self {
            panic_on_read: true,
            ..Self::video(stream, &[])
        }
    }

    pub fn corrupt(stream: usize) -> Self {
        Self {
            fail_decode: true,
            ..Self::video(stream, &[])
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }
}

/// Scripted contents of one fake source
#[derive(Debug, Clone)]
pub struct FakeMedia {
    pub streams: Vec<StreamDescriptor>,
    pub packets: Vec<FakePacket>,
    pub open_delay: Duration,
    pub fail_open: bool,
    pub unsupported_codec: bool,
}

impl FakeMedia {
    /// Single video stream of the given size
    pub fn video(width: u32, height: u32, packets: Vec<FakePacket>) -> Self {
        Self {
            streams: vec![fake_stream(0, MediaKind::Video, width, height)],
            packets,
            open_delay: Duration::ZERO,
            fail_open: false,
            unsupported_codec: false,
        }
    }

    /// `count` packets of one solid picture each, colored by index
    pub fn solid_frames(width: u32, height: u32, count: u8) -> Self {
        let packets = (0..count)
            .map(|i| FakePacket::video(0, &[[i, i.wrapping_mul(2), 255 - i]]))
            .collect();
        Self::video(width, height, packets)
    }
}

pub fn fake_stream(index: usize, kind: MediaKind, width: u32, height: u32) -> StreamDescriptor {
    StreamDescriptor {
        index,
        kind,
        codec: if kind == MediaKind::Video { "fakevideo" } else { "fakeaudio" }.to_string(),
        width,
        height,
        pixel_format: Some("rgb24".to_string()),
    }
}

/// Backend serving [`FakeMedia`] by source string
#[derive(Default)]
pub struct FakeBackend {
    media: HashMap<String, FakeMedia>,
    probe: Arc<BackendProbe>,
}

/// Observations shared by every object a [`FakeBackend`] creates
#[derive(Default)]
pub struct BackendProbe {
    active: AtomicUsize,
    max_active: AtomicUsize,
    releases: Mutex<Vec<&'static str>>,
}

impl BackendProbe {
    /// Containers currently open
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open containers
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Drop order of pipeline objects
    pub fn releases(&self) -> Vec<&'static str> {
        self.releases.lock().clone()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media(mut self, source: &str, media: FakeMedia) -> Self {
        self.media.insert(source.to_string(), media);
        self
    }

    pub fn probe(&self) -> Arc<BackendProbe> {
        Arc::clone(&self.probe)
    }
}

pub struct FakeContainer {
    media: FakeMedia,
    cursor: usize,
    probe: Arc<BackendProbe>,
}

impl Drop for FakeContainer {
    fn drop(&mut self) {
        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        self.probe.releases.lock().push("container");
    }
}

pub struct FakeDecoder {
    width: u32,
    height: u32,
    pending: Vec<[u8; 3]>,
    fail_next_receive: bool,
    picture: FakePicture,
    probe: Arc<BackendProbe>,
}

impl Drop for FakeDecoder {
    fn drop(&mut self) {
        self.probe.releases.lock().push("decoder");
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePicture {
    pub width: u32,
    pub height: u32,
    pub color: [u8; 3],
}

/// Writes rows padded to a multiple of 8 bytes into a reused buffer
pub struct FakeConverter {
    buffer: Vec<u8>,
    probe: Arc<BackendProbe>,
}

impl Drop for FakeConverter {
    fn drop(&mut self) {
        self.probe.releases.lock().push("converter");
    }
}

impl MediaBackend for FakeBackend {
    type Packet = FakePacket;
    type Picture = FakePicture;
    type Container = FakeContainer;
    type Decoder = FakeDecoder;
    type Converter = FakeConverter;

    fn open(&self, source: &MediaSource) -> Result<FakeContainer, PlayerError> {
        let media = self
            .media
            .get(source.as_str())
            .cloned()
            .ok_or_else(|| PlayerError::OpenFailed {
                source_name: source.to_string(),
                detail: "file not found".to_string(),
            })?;

        thread::sleep(media.open_delay);
        if media.fail_open {
            return Err(PlayerError::OpenFailed {
                source_name: source.to_string(),
                detail: "invalid data".to_string(),
            });
        }

        let active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(FakeContainer {
            media,
            cursor: 0,
            probe: Arc::clone(&self.probe),
        })
    }

    fn open_decoder(
        &self,
        container: &FakeContainer,
        stream: &StreamDescriptor,
    ) -> Result<FakeDecoder, PlayerError> {
        if container.media.unsupported_codec {
            return Err(PlayerError::UnsupportedCodec {
                codec: stream.codec.clone(),
            });
        }
        Ok(FakeDecoder {
            width: stream.width,
            height: stream.height,
            pending: Vec::new(),
            fail_next_receive: false,
            picture: FakePicture::default(),
            probe: Arc::clone(&self.probe),
        })
    }

    fn init_converter(&self, _decoder: &FakeDecoder) -> Result<FakeConverter, PlayerError> {
        Ok(FakeConverter {
            buffer: Vec::new(),
            probe: Arc::clone(&self.probe),
        })
    }
}

impl ContainerReader for FakeContainer {
    type Packet = FakePacket;

    fn probe(&mut self) -> Result<Vec<StreamDescriptor>, PlayerError> {
        if self.media.streams.is_empty() {
            return Err(PlayerError::ProbeFailed {
                source_name: "fake".to_string(),
                detail: "container reports no streams".to_string(),
            });
        }
        Ok(self.media.streams.clone())
    }

    fn read_packet(&mut self) -> Option<(usize, FakePacket)> {
        let packet = self.media.packets.get(self.cursor)?.clone();
        self.cursor += 1;
        thread::sleep(packet.read_delay);
        if packet.panic_on_read {
            panic!("demuxer crashed");
        }
        Some((packet.stream, packet))
    }
}

impl DecoderEngine for FakeDecoder {
    type Packet = FakePacket;
    type Picture = FakePicture;

    fn send_packet(&mut self, packet: &FakePacket, packet_index: u64) -> Result<(), PlayerError> {
        if packet.fatal {
            return Err(PlayerError::decode("decoder in unusable state"));
        }
        if packet.reject {
            return Err(PlayerError::SendFailed {
                packet_index,
                detail: "Invalid data found when processing input".to_string(),
            });
        }
        self.fail_next_receive = packet.fail_decode;
        self.pending.extend(packet.pictures.iter().rev());
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn receive_picture(&mut self) -> Result<Option<&FakePicture>, PlayerError> {
        if self.fail_next_receive {
            return Err(PlayerError::decode("corrupt bitstream"));
        }
        match self.pending.pop() {
            Some(color) => {
                self.picture = FakePicture {
                    width: self.width,
                    height: self.height,
                    color,
                };
                Ok(Some(&self.picture))
            }
            None => Ok(None),
        }
    }
}

impl PixelConverter for FakeConverter {
    type Picture = FakePicture;

    fn convert(&mut self, picture: &FakePicture) -> Result<RgbView<'_>, PlayerError> {
        let row = picture.width as usize * 3;
        let stride = (row + 7) / 8 * 8;
        self.buffer.resize(stride * picture.height as usize, 0);

        for line in self.buffer.chunks_mut(stride) {
            for (i, byte) in line.iter_mut().enumerate() {
                *byte = if i < row { picture.color[i % 3] } else { 0xEE };
            }
        }

        Ok(RgbView {
            width: picture.width,
            height: picture.height,
            stride,
            data: &self.buffer,
        })
    }
}

/// Everything a [`RecordingSink`] observed, in call order
#[derive(Debug, Clone)]
pub enum Record {
    Frame { frame: PresentedFrame, at: Instant },
    State { session: SessionId, state: PlaybackState, at: Instant },
    Error { session: SessionId, error: PlayerError },
}

/// Sink that keeps every call in a single ordered log
#[derive(Default)]
pub struct RecordingSink {
    log: Mutex<Vec<Record>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Record> {
        self.log.lock().clone()
    }

    pub fn frames(&self) -> Vec<PresentedFrame> {
        self.frames_with_time().into_iter().map(|(f, _)| f).collect()
    }

    pub fn frames_with_time(&self) -> Vec<(PresentedFrame, Instant)> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Record::Frame { frame, at } => Some((frame.clone(), *at)),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self, session: SessionId) -> Vec<PlaybackState> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Record::State { session: s, state, .. } if *s == session => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(SessionId, PlayerError)> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Record::Error { session, error } => Some((*session, error.clone())),
                _ => None,
            })
            .collect()
    }

    /// Poll until `condition` holds or `timeout` elapses
    pub fn wait_until(&self, timeout: Duration, condition: impl Fn(&RecordingSink) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition(self) {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition(self)
    }

    pub fn wait_for_state(&self, session: SessionId, state: PlaybackState, timeout: Duration) -> bool {
        self.wait_until(timeout, |sink| sink.states(session).contains(&state))
    }
}

impl PresentationSink for RecordingSink {
    fn on_frame_ready(&self, frame: PresentedFrame) {
        self.log.lock().push(Record::Frame {
            frame,
            at: Instant::now(),
        });
    }

    fn on_state_changed(&self, session: SessionId, state: PlaybackState) {
        self.log.lock().push(Record::State {
            session,
            state,
            at: Instant::now(),
        });
    }

    fn on_error(&self, session: SessionId, error: &PlayerError) {
        self.log.lock().push(Record::Error {
            session,
            error: error.clone(),
        });
    }
}

/// Write an uncompressed 24-bit AVI with one solid-color frame per entry
///
/// Colors are RGB; the file stores bottom-up BGR rows padded to 4 bytes.
pub fn write_test_avi(path: &Path, width: u32, height: u32, frames: &[[u8; 3]]) -> io::Result<()> {
    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len() + 9);
        out.extend_from_slice(id);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn list(kind: &[u8; 4], children: &[u8]) -> Vec<u8> {
        let mut body = kind.to_vec();
        body.extend_from_slice(children);
        chunk(b"LIST", &body)
    }

    fn u32s(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    let stride = ((width * 3 + 3) / 4) * 4;
    let frame_size = stride * height;
    let frame_count = frames.len() as u32;

    // 25 fps, AVIF_HASINDEX
    let avih = u32s(&[
        40_000,
        frame_size * 25,
        0,
        0x10,
        frame_count,
        0,
        1,
        frame_size,
        width,
        height,
        0,
        0,
        0,
        0,
    ]);

    let mut strh = Vec::new();
    strh.extend_from_slice(b"vids");
    strh.extend_from_slice(b"DIB ");
    strh.extend_from_slice(&u32s(&[0, 0, 0, 1, 25, 0, frame_count, frame_size, u32::MAX, 0]));
    for v in [0u16, 0, width as u16, height as u16] {
        strh.extend_from_slice(&v.to_le_bytes());
    }

    let mut strf = u32s(&[40, width, height]);
    strf.extend_from_slice(&1u16.to_le_bytes());
    strf.extend_from_slice(&24u16.to_le_bytes());
    strf.extend_from_slice(&u32s(&[0, frame_size, 0, 0, 0, 0]));

    let mut strl = chunk(b"strh", &strh);
    strl.extend(chunk(b"strf", &strf));

    let mut hdrl = chunk(b"avih", &avih);
    hdrl.extend(list(b"strl", &strl));

    let mut movi = Vec::new();
    let mut idx1 = Vec::new();
    for [r, g, b] in frames {
        let mut data = Vec::with_capacity(frame_size as usize);
        for _ in 0..height {
            let start = data.len();
            for _ in 0..width {
                data.extend_from_slice(&[*b, *g, *r]);
            }
            data.resize(start + stride as usize, 0);
        }

        // Offsets are relative to the 'movi' fourcc
        let offset = 4 + movi.len() as u32;
        idx1.extend_from_slice(b"00db");
        idx1.extend_from_slice(&u32s(&[0x10, offset, frame_size]));
        movi.extend(chunk(b"00db", &data));
    }

    let mut riff = b"AVI ".to_vec();
    riff.extend(list(b"hdrl", &hdrl));
    riff.extend(list(b"movi", &movi));
    riff.extend(chunk(b"idx1", &idx1));

    let mut file = std::fs::File::create(path)?;
    file.write_all(&chunk(b"RIFF", &riff))?;
    file.flush()
}
