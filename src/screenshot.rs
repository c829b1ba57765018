// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::process::ToolError;
use crate::temp_files::TempFiles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotKind {
    #[default]
    Fullscreen,
    Window,
    Region,
}

impl ScreenshotKind {
    pub const ALL: [Self; 3] = [Self::Fullscreen, Self::Window, Self::Region];

    /// Name used for the `--capture` flag and the `hotkeys` settings table
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fullscreen => "fullscreen",
            Self::Window => "window",
            Self::Region => "region",
        }
    }
}

impl std::fmt::Display for ScreenshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fullscreen => write!(f, "Full screen"),
            Self::Window => write!(f, "Active window"),
            Self::Region => write!(f, "Region"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenshotOptions {
    pub kind: ScreenshotKind,
    /// Seconds to wait before capturing
    pub delay_secs: u64,
}

impl ScreenshotOptions {
    #[must_use]
    pub fn new(kind: ScreenshotKind) -> Self {
        Self { kind, delay_secs: 0 }
    }

    #[must_use]
    pub fn with_delay(mut self, delay_secs: u64) -> Self {
        self.delay_secs = delay_secs;
        self
    }
}

/// Where the most recent request stands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Idle,
    Delaying,
    Invoking,
    Succeeded,
    /// The tool returned without an image, e.g. the selection was aborted
    Cancelled,
    Failed(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ScreenshotError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("X11 error: {0}")]
    X11(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Screengrabber not available")]
    NotAvailable,
}

impl ScreenshotError {
    /// A required external program is not installed
    #[must_use]
    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, Self::Tool(err) if err.is_dependency_missing())
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Tool(err) if err.is_timeout())
    }
}

#[async_trait]
pub trait Screengrabber: Send + Sync {
    async fn is_available(&self) -> bool;

    /// `Ok(None)` means the capture was cancelled rather than failed.
    /// Intermediate files go into `temp_files` and outlive the call.
    async fn take_screenshot(
        &self,
        kind: ScreenshotKind,
        temp_files: &mut TempFiles,
    ) -> Result<Option<DynamicImage>, ScreenshotError>;

    fn name(&self) -> &'static str;

    fn supports_kind(&self, kind: ScreenshotKind) -> bool;
}

pub mod scrot;

#[cfg(all(unix, not(target_os = "macos")))]
pub mod xorg_native;

pub struct ScreenshotManager {
    grabbers: Vec<Box<dyn Screengrabber>>,
    temp_files: TempFiles,
    state: CaptureState,
}

impl Default for ScreenshotManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenshotManager {
    /// In-process X11 grab first for full screen captures, scrot for everything else
    #[must_use]
    pub fn new() -> Self {
        let grabbers: Vec<Box<dyn Screengrabber>> = vec![
            #[cfg(all(unix, not(target_os = "macos")))]
            Box::new(xorg_native::XorgScreengrabber::new()),
            Box::new(scrot::ScrotScreengrabber::new()),
        ];

        Self::with_grabbers(grabbers)
    }

    /// Grabbers are tried in order until one of them succeeds
    #[must_use]
    pub fn with_grabbers(grabbers: Vec<Box<dyn Screengrabber>>) -> Self {
        Self {
            grabbers,
            temp_files: TempFiles::new(),
            state: CaptureState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    #[must_use]
    pub fn temp_files(&self) -> &TempFiles {
        &self.temp_files
    }

    /// Waits out the requested delay, then captures
    ///
    /// # Errors
    /// Returns `ScreenshotError` if every applicable grabber failed
    pub async fn take_screenshot(
        &mut self,
        options: &ScreenshotOptions,
    ) -> Result<Option<DynamicImage>, ScreenshotError> {
        if options.delay_secs > 0 {
            self.state = CaptureState::Delaying;
            tokio::time::sleep(Duration::from_secs(options.delay_secs)).await;
        }
        self.capture(options.kind).await
    }

    /// # Errors
    /// Returns `ScreenshotError` if both the X11 grab and scrot failed
    pub async fn capture_fullscreen(&mut self) -> Result<Option<DynamicImage>, ScreenshotError> {
        self.capture(ScreenshotKind::Fullscreen).await
    }

    /// # Errors
    /// Returns `ScreenshotError` if scrot is missing, fails or times out
    pub async fn capture_window(&mut self) -> Result<Option<DynamicImage>, ScreenshotError> {
        self.capture(ScreenshotKind::Window).await
    }

    /// # Errors
    /// Returns `ScreenshotError` if scrot is missing, fails or times out
    pub async fn capture_region(&mut self) -> Result<Option<DynamicImage>, ScreenshotError> {
        self.capture(ScreenshotKind::Region).await
    }

    async fn capture(&mut self, kind: ScreenshotKind) -> Result<Option<DynamicImage>, ScreenshotError> {
        self.state = CaptureState::Invoking;

        let mut last_error = None;
        let mut outcome = None;
        for grabber in &self.grabbers {
            if !grabber.supports_kind(kind) || !grabber.is_available().await {
                continue;
            }
            match grabber.take_screenshot(kind, &mut self.temp_files).await {
                Ok(image) => {
                    outcome = Some(image);
                    break;
                }
                Err(err) => {
                    log::warn!("{} failed: {err}, trying next backend...", grabber.name());
                    last_error = Some(err);
                }
            }
        }

        let result = match outcome {
            Some(image) => Ok(image),
            None => Err(last_error.unwrap_or(ScreenshotError::NotAvailable)),
        };
        self.state = match &result {
            Ok(Some(_)) => CaptureState::Succeeded,
            Ok(None) => CaptureState::Cancelled,
            Err(err) => CaptureState::Failed(err.to_string()),
        };
        result
    }

    /// Deletes every temporary file created so far
    pub fn cleanup(&mut self) {
        self.temp_files.cleanup();
    }
}
