//! RGB video player
//!
//! Decodes the first video stream of a file, converts every frame to RGB24
//! and shows it at a fixed pace. Supports standalone execution or IPC
//! control over stdin/stdout.

mod app;
mod config;
mod ipc;
mod video;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use app::PlayerApp;
use config::{PlaybackConfig, DEFAULT_FRAME_INTERVAL_MS, DEFAULT_FRAME_QUEUE, DEFAULT_MAX_SEND_FAILURES};

/// RGB video player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file or URL to play on startup
    source: Option<String>,

    /// Delay between presented frames in milliseconds
    #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL_MS)]
    interval_ms: u64,

    /// Frames buffered ahead of the window
    #[arg(long, default_value_t = DEFAULT_FRAME_QUEUE)]
    queue: usize,

    /// Consecutive rejected packets before playback fails
    #[arg(long, default_value_t = DEFAULT_MAX_SEND_FAILURES)]
    max_send_failures: u32,

    /// Use stdin/stdout for IPC communication
    #[arg(long)]
    stdio: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig::default()
            .with_frame_interval(Duration::from_millis(self.interval_ms))
            .with_frame_queue(self.queue)
            .with_max_send_failures(self.max_send_failures)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout carries IPC messages in stdio mode
    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("RGB player starting...");

    let config = args.playback_config();
    info!(
        "Frame interval: {}ms, queue: {}, max send failures: {}",
        config.frame_interval_ms, config.frame_queue, config.max_send_failures
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([320.0, 240.0])
            .with_drag_and_drop(true)
            .with_title("RGB Player"),
        ..Default::default()
    };

    let source = args.source.clone();
    let use_stdio = args.stdio;
    eframe::run_native(
        "RGB Player",
        native_options,
        Box::new(move |cc| Ok(Box::new(PlayerApp::new(cc, config, source, use_stdio)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
