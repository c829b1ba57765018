// SPDX-License-Identifier: GPL-3.0-only

use super::{Screengrabber, ScreenshotError, ScreenshotKind};
use crate::process::ExternalTool;
use crate::temp_files::TempFiles;
use async_trait::async_trait;
use image::DynamicImage;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Wall-clock bound on a single scrot invocation
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ScrotScreengrabber {
    tool: ExternalTool,
    timeout: Duration,
}

impl Default for ScrotScreengrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrotScreengrabber {
    #[must_use]
    pub fn new() -> Self {
        Self::with_tool(ExternalTool::scrot())
    }

    #[must_use]
    pub fn with_tool(tool: ExternalTool) -> Self {
        Self {
            tool,
            timeout: CAPTURE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Window and region captures both use scrot's interactive selection:
    /// a click picks a window, a drag picks a region.
    fn arguments(kind: ScreenshotKind, output: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(2);
        match kind {
            ScreenshotKind::Fullscreen => {}
            ScreenshotKind::Window | ScreenshotKind::Region => args.push(OsString::from("-s")),
        }
        args.push(output.as_os_str().to_owned());
        args
    }

    /// An absent or empty file means the user aborted the selection
    fn load_output(path: &Path) -> Result<Option<DynamicImage>, ScreenshotError> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Ok(None),
        }
        // decoded into memory, the file can be deleted independently
        Ok(Some(image::open(path)?))
    }
}

#[async_trait]
impl Screengrabber for ScrotScreengrabber {
    async fn is_available(&self) -> bool {
        // a missing scrot is reported as a missing dependency, not skipped
        true
    }

    async fn take_screenshot(
        &self,
        kind: ScreenshotKind,
        temp_files: &mut TempFiles,
    ) -> Result<Option<DynamicImage>, ScreenshotError> {
        let output = temp_files.allocate(".png")?;
        // scrot renames its output instead of overwriting an existing file
        fs::remove_file(&output)?;

        log::debug!("capturing {kind} with {} into {}", self.tool.name(), output.display());
        self.tool
            .run(Self::arguments(kind, &output), Some(self.timeout))
            .await?;

        Self::load_output(&output)
    }

    fn name(&self) -> &'static str {
        "scrot"
    }

    fn supports_kind(&self, _kind: ScreenshotKind) -> bool {
        true
    }
}
