//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `render` - Layout, header, add form, search bar and overlays
//! - `bookmarks` - Bookmark list widget
//! - `status` - Status bar widget
//! - `help` - Help overlay

mod bookmarks;
mod help;
mod input;
mod loop_runner;
mod render;
mod status;

// Re-export the public API
pub use loop_runner::{run, Action};
