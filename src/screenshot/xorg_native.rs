// SPDX-License-Identifier: GPL-3.0-only

use super::{Screengrabber, ScreenshotError, ScreenshotKind};
use crate::temp_files::TempFiles;
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, ImageFormat, ImageOrder};

/// Full screen capture straight from the X server, no external tool involved
pub struct XorgScreengrabber {
    _private: (),
}

impl Default for XorgScreengrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl XorgScreengrabber {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

fn x11_error(err: impl std::fmt::Display) -> ScreenshotError {
    ScreenshotError::X11(err.to_string())
}

fn grab_root_window() -> Result<DynamicImage, ScreenshotError> {
    let (conn, screen_num) = x11rb::connect(None).map_err(x11_error)?;
    let setup = conn.setup();
    if setup.image_byte_order != ImageOrder::LSB_FIRST {
        return Err(ScreenshotError::X11("MSB-first image byte order is not supported".into()));
    }

    let screen = setup
        .roots
        .get(screen_num)
        .ok_or_else(|| ScreenshotError::X11(format!("screen {screen_num} does not exist")))?;
    let (width, height) = (screen.width_in_pixels, screen.height_in_pixels);

    let reply = conn
        .get_image(ImageFormat::Z_PIXMAP, screen.root, 0, 0, width, height, !0)
        .map_err(x11_error)?
        .reply()
        .map_err(x11_error)?;
    if reply.depth != 24 && reply.depth != 32 {
        return Err(ScreenshotError::X11(format!("unsupported root depth {}", reply.depth)));
    }

    bgrx_to_rgba(&reply.data, u32::from(width), u32::from(height))
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| ScreenshotError::X11("root window image has an unexpected size".into()))
}

/// Z-pixmap data at 24/32 bits depth is 4 bytes per pixel, blue first
fn bgrx_to_rgba(data: &[u8], width: u32, height: u32) -> Option<RgbaImage> {
    let pixels = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
    if data.len() != pixels * 4 {
        return None;
    }
    let rgba = data
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], u8::MAX])
        .collect();
    RgbaImage::from_raw(width, height, rgba)
}

#[async_trait]
impl Screengrabber for XorgScreengrabber {
    async fn is_available(&self) -> bool {
        // Check if we're running under X11
        std::env::var("DISPLAY").is_ok() && std::env::var("WAYLAND_DISPLAY").is_err()
    }

    async fn take_screenshot(
        &self,
        kind: ScreenshotKind,
        _temp_files: &mut TempFiles,
    ) -> Result<Option<DynamicImage>, ScreenshotError> {
        if kind != ScreenshotKind::Fullscreen {
            return Err(ScreenshotError::NotAvailable);
        }
        let image = tokio::task::spawn_blocking(grab_root_window)
            .await
            .map_err(x11_error)??;
        Ok(Some(image))
    }

    fn name(&self) -> &'static str {
        "X11 Native"
    }

    fn supports_kind(&self, kind: ScreenshotKind) -> bool {
        // interactive selection needs scrot
        kind == ScreenshotKind::Fullscreen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_bgrx_pixels() {
        let data = [1, 2, 3, 0, 10, 20, 30, 0];
        let image = bgrx_to_rgba(&data, 2, 1).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [3, 2, 1, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [30, 20, 10, 255]);
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(bgrx_to_rgba(&[0; 7], 2, 1).is_none());
    }

    #[test]
    fn only_handles_full_screen() {
        let grabber = XorgScreengrabber::new();
        assert!(grabber.supports_kind(ScreenshotKind::Fullscreen));
        assert!(!grabber.supports_kind(ScreenshotKind::Window));
        assert!(!grabber.supports_kind(ScreenshotKind::Region));
    }
}
