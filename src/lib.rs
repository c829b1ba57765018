// SPDX-License-Identifier: GPL-3.0-only

//! Screenshot utility for X11 desktops
//!
//! This crate captures the screen, a window or a region through scrot (or a
//! direct X11 grab), publishes images to the clipboard through xclip and
//! registers global hotkeys through xbindkeys, with settings kept in a JSON file.

pub mod app;
pub mod clipboard;
pub mod error;
pub mod error_handling;
pub mod hotkeys;
pub mod notifications;
pub mod output;
pub mod process;
pub mod screenshot;
pub mod settings;
pub mod temp_files;

// Re-export main types for easier usage
pub use app::{Delivery, Shotux};
pub use error::Error;
pub use screenshot::{
    CaptureState, ScreenshotError, ScreenshotKind, ScreenshotManager, ScreenshotOptions, Screengrabber,
};
pub use settings::{ScreenshotSettings, SettingsStore};

/// The current version of the shotux library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
