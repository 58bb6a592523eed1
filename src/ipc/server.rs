//! IPC Server module
//!
//! Reads commands from stdin and writes replies and session events to stdout.

use std::io::{BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use super::protocol::{error_codes, IpcMessage};

/// IPC Server for communication with a controlling process
pub struct IpcServer {
    /// Channel to send messages to the main thread
    to_app: Sender<IpcMessage>,
    /// Replies for the controller (parse errors)
    to_controller: Sender<IpcMessage>,
}

impl IpcServer {
    pub fn new(to_app: Sender<IpcMessage>, to_controller: Sender<IpcMessage>) -> Self {
        Self {
            to_app,
            to_controller,
        }
    }

    /// Forward commands from `reader` until EOF or `shutdown`
    pub fn serve<R: BufRead>(&self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let line = line.context("Failed to read command line")?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);

            match IpcMessage::from_json(line) {
                Ok(msg) => {
                    let shutdown = matches!(msg, IpcMessage::Shutdown);
                    if self.to_app.send(msg).is_err() {
                        error!("Failed to send message to app");
                        break;
                    }
                    if shutdown {
                        info!("Received shutdown command");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse message: {}", e);
                    let _ = self.to_controller.send(IpcMessage::error(
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Write every outgoing message as one JSON line until the channel closes
fn write_messages<W: Write>(mut writer: W, outgoing: Receiver<IpcMessage>) -> Result<()> {
    for msg in outgoing.iter() {
        let json = msg.to_json().context("Failed to encode message")?;
        writeln!(writer, "{}", json).context("Failed to write message")?;
        writer.flush()?;
    }
    Ok(())
}

/// IPC message receiver for the main application
pub struct IpcReceiver {
    rx: Receiver<IpcMessage>,
}

impl IpcReceiver {
    pub fn new(rx: Receiver<IpcMessage>) -> Self {
        Self { rx }
    }

    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<IpcMessage> {
        self.rx.try_recv().ok()
    }
}

/// IPC message sender for the main application
#[derive(Clone)]
pub struct IpcSender {
    tx: Sender<IpcMessage>,
}

impl IpcSender {
    pub fn new(tx: Sender<IpcMessage>) -> Self {
        Self { tx }
    }

    /// Send a message to the controller
    pub fn send(&self, msg: IpcMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Start the stdio IPC server on background threads
pub fn start_ipc_server() -> Result<(IpcReceiver, IpcSender)> {
    let (to_app_tx, to_app_rx) = unbounded();
    let (outgoing_tx, outgoing_rx) = unbounded();

    let _ = outgoing_tx.send(IpcMessage::ready());

    thread::Builder::new()
        .name("ipc-writer".to_string())
        .spawn(move || {
            if let Err(e) = write_messages(std::io::stdout().lock(), outgoing_rx) {
                error!("Stdio writer error: {:#}", e);
            }
        })
        .context("Failed to spawn IPC writer")?;

    let server = IpcServer::new(to_app_tx, outgoing_tx.clone());
    thread::Builder::new()
        .name("ipc-reader".to_string())
        .spawn(move || {
            info!("Starting stdio IPC server");
            if let Err(e) = server.serve(std::io::stdin().lock()) {
                error!("Stdio server error: {:#}", e);
            }
            info!("Stdio IPC server stopped");
        })
        .context("Failed to spawn IPC reader")?;

    Ok((IpcReceiver::new(to_app_rx), IpcSender::new(outgoing_tx)))
}
