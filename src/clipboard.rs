// SPDX-License-Identifier: GPL-3.0-only

//! Clipboard integration through xclip.

use crate::process::{ExternalTool, ToolError};
use crate::temp_files::TempFiles;
use image::DynamicImage;
use std::ffi::OsStr;

pub const IMAGE_MIME: &str = "image/png";

#[derive(thiserror::Error, Debug)]
pub enum ClipboardError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Failed to prepare clipboard image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to prepare clipboard image: {0}")]
    Io(#[from] std::io::Error),
}

impl ClipboardError {
    #[must_use]
    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, Self::Tool(err) if err.is_dependency_missing())
    }
}

/// Hands captured images to the X11 clipboard.
///
/// The PNG written for xclip stays on disk until [`ClipboardPublisher::cleanup`]:
/// depending on the backend xclip may still be reading it after returning.
pub struct ClipboardPublisher {
    tool: ExternalTool,
    temp_files: TempFiles,
}

impl Default for ClipboardPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_tool(ExternalTool::xclip())
    }

    #[must_use]
    pub fn with_tool(tool: ExternalTool) -> Self {
        Self {
            tool,
            temp_files: TempFiles::new(),
        }
    }

    #[must_use]
    pub fn temp_files(&self) -> &TempFiles {
        &self.temp_files
    }

    /// Copies `image` to the clipboard selection as PNG
    ///
    /// # Errors
    /// Returns `ClipboardError` if the image cannot be written or xclip fails
    pub async fn publish(&mut self, image: &DynamicImage) -> Result<(), ClipboardError> {
        let path = self.temp_files.allocate(".png")?;
        image.save_with_format(&path, image::ImageFormat::Png)?;

        log::debug!("copying {}x{} image to clipboard", image.width(), image.height());
        let args = [
            OsStr::new("-selection"),
            OsStr::new("clipboard"),
            OsStr::new("-t"),
            OsStr::new(IMAGE_MIME),
            OsStr::new("-i"),
            path.as_os_str(),
        ];
        self.tool.run(args, None).await?;

        log::info!("Screenshot copied to clipboard");
        Ok(())
    }

    pub fn cleanup(&mut self) {
        self.temp_files.cleanup();
    }
}
