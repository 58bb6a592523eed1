//! Application module
//!
//! Contains the egui player window and its display state.

mod player_app;
pub mod state;

pub use player_app::PlayerApp;
pub use state::*;
