//! IPC communication module
//!
//! Lets another process drive playback over stdin/stdout.

mod protocol;
mod server;

pub use protocol::*;
pub use server::{start_ipc_server, IpcReceiver, IpcSender};
