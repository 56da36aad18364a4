//! smartmarks: a terminal bookmark manager whose list stays in sync across
//! every open session sharing the same store.

pub mod app;
pub mod clipboard;
pub mod config;
pub mod session;
pub mod storage;
pub mod sync;
pub mod ui;
pub mod util;
