//! Player window
//!
//! Implements the egui App trait on top of [`VideoPlayer`].

use std::sync::Arc;

use egui::{Color32, RichText, Vec2};
use tracing::{info, warn};

use crate::config::PlaybackConfig;
use crate::ipc::{start_ipc_server, IpcMessage, IpcReceiver, IpcSender};
use crate::video::{ChannelSink, FrameReceiver, MediaSource, PlaybackState, PresentationSink, VideoPlayer};

use super::state::ViewState;

/// Main player application
pub struct PlayerApp {
    /// Video player
    player: VideoPlayer,
    /// Frame mailbox and lifecycle events
    frames: FrameReceiver,

    /// Display state
    view: ViewState,

    /// Current frame texture
    frame_texture: Option<egui::TextureHandle>,
    /// Reusable color buffer to avoid allocations every frame
    color_image_buffer: Vec<Color32>,

    /// Path text box
    path_input: String,

    /// IPC receiver
    ipc_rx: Option<IpcReceiver>,
    /// IPC sender
    ipc_tx: Option<IpcSender>,
}

impl PlayerApp {
    /// Create new player application
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: PlaybackConfig,
        initial_source: Option<String>,
        use_stdio: bool,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let (sink, frames) = ChannelSink::new(config.frame_queue);
        let sink = sink.with_waker(move || ctx.request_repaint());

        info!(
            "Player initialized: {:.1}fps, mailbox of {} frames",
            config.fps(),
            config.frame_queue
        );
        let player = VideoPlayer::new(Arc::new(sink) as Arc<dyn PresentationSink>, config);

        // Start IPC server if requested
        let (ipc_rx, ipc_tx) = if use_stdio {
            match start_ipc_server() {
                Ok((rx, tx)) => {
                    info!("IPC server started");
                    (Some(rx), Some(tx))
                }
                Err(e) => {
                    warn!("Failed to start IPC server: {:#}", e);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let mut app = Self {
            player,
            frames,
            view: ViewState::new(),
            frame_texture: None,
            color_image_buffer: Vec::new(),
            path_input: initial_source.clone().unwrap_or_default(),
            ipc_rx,
            ipc_tx,
        };

        if let Some(source) = initial_source {
            info!("Auto-starting playback...");
            app.play(source);
        }

        app
    }

    /// Start or restart playback of `source`
    fn play(&mut self, source: impl Into<MediaSource>) {
        let id = self.player.play_video(source);
        self.view.begin(id);
    }

    fn stop(&mut self) {
        self.player.stop();
    }

    /// Handle IPC messages
    fn handle_ipc_messages(&mut self, ctx: &egui::Context) {
        // Collect messages first to avoid borrow issues
        let messages: Vec<IpcMessage> = if let Some(ref rx) = self.ipc_rx {
            let mut msgs = Vec::new();
            while let Some(msg) = rx.try_recv() {
                msgs.push(msg);
            }
            msgs
        } else {
            return;
        };

        for msg in messages {
            match msg {
                IpcMessage::Play { source } => {
                    self.path_input = source.clone();
                    self.play(source);
                }
                IpcMessage::Stop => self.stop(),
                IpcMessage::Shutdown => {
                    info!("Received shutdown command");
                    self.stop();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                other => warn!("Ignoring unexpected IPC message: {:?}", other),
            }
        }
    }

    /// Apply session events and forward them to the controller
    fn handle_session_events(&mut self) {
        for event in self.frames.drain_events() {
            self.view.apply_event(&event);
            if let Some(ref tx) = self.ipc_tx {
                tx.send(IpcMessage::from(&event));
            }
        }
    }

    /// Queue playback of files dropped onto the window; the last one wins
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .last()
        });
        if let Some(path) = dropped {
            info!("File dropped: {:?}", path);
            self.path_input = path.display().to_string();
            self.play(path.as_path());
        }
    }

    /// Update a color buffer from packed RGB24 bytes
    fn update_color_buffer(buffer: &mut Vec<Color32>, rgb: &[u8]) {
        let len = rgb.len() / 3;

        buffer.clear();
        if buffer.capacity() < len {
            buffer.reserve(len - buffer.capacity());
        }

        buffer.extend(
            rgb.chunks_exact(3)
                .map(|px| Color32::from_rgb(px[0], px[1], px[2])),
        );
    }

    /// Upload the newest frame of the current session, if any
    fn update_texture(&mut self, ctx: &egui::Context) {
        let Some(frame) = self.frames.try_latest() else {
            return;
        };
        if !self.view.accept_frame(&frame) {
            return;
        }

        Self::update_color_buffer(&mut self.color_image_buffer, frame.as_bytes());
        let image = egui::ColorImage {
            size: [frame.width() as usize, frame.height() as usize],
            pixels: self.color_image_buffer.clone(),
        };

        if let Some(ref mut texture) = self.frame_texture {
            texture.set(image, egui::TextureOptions::LINEAR);
        } else {
            self.frame_texture = Some(ctx.load_texture("frame", image, egui::TextureOptions::LINEAR));
        }
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_ipc_messages(ctx);
        self.handle_dropped_files(ctx);
        self.handle_session_events();
        self.update_texture(ctx);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Source:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.path_input)
                        .hint_text("Path or URL, or drop a file")
                        .desired_width(ui.available_width() - 120.0),
                );
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                if (ui.button("Play").clicked() || submitted) && !self.path_input.trim().is_empty() {
                    let source = self.path_input.trim().to_string();
                    self.play(source);
                }
                let state = self.player.state();
                let running = state != PlaybackState::Idle && !state.is_terminal();
                if ui.add_enabled(running, egui::Button::new("Stop")).clicked() {
                    self.stop();
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(RichText::new(self.view.status_line()).color(Color32::GRAY).small());
            if let Some(ref error) = self.view.last_error {
                ui.label(RichText::new(error).color(Color32::LIGHT_RED).small());
            }
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                ui.centered_and_justified(|ui| match self.frame_texture {
                    Some(ref texture) => {
                        let size = fit_size(texture.size_vec2(), ui.available_size());
                        ui.image(egui::ImageSource::Texture(egui::load::SizedTexture::new(
                            texture.id(),
                            size,
                        )));
                    }
                    None => {
                        ui.label(RichText::new("No video").color(Color32::DARK_GRAY));
                    }
                });
            });
    }
}

/// Largest size with the frame's aspect ratio that fits in `available`
fn fit_size(frame: Vec2, available: Vec2) -> Vec2 {
    if frame.x <= 0.0 || frame.y <= 0.0 {
        return Vec2::ZERO;
    }
    let scale = (available.x / frame.x).min(available.y / frame.y).max(0.0);
    frame * scale
}
