//! Configuration module
//!
//! Contains the playback tuning shared by the player and the CLI.

mod playback;

pub use playback::*;
