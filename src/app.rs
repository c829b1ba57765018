// SPDX-License-Identifier: GPL-3.0-only

//! One shotux session: settings, capture, clipboard and hotkeys owned together.
//!
//! Front ends drive the session as `capture` → `deliver` (or `save_as` /
//! `copy_to_clipboard` for explicit destinations) and call `shutdown` when done.

use crate::clipboard::ClipboardPublisher;
use crate::error::Error;
use crate::hotkeys::HotkeySupervisor;
use crate::output;
use crate::report_warning;
use crate::screenshot::{ScreenshotKind, ScreenshotManager, ScreenshotOptions};
use crate::settings::{ImageFormatSetting, SettingsStore};
use image::DynamicImage;
use std::fs;
use std::path::PathBuf;

/// What happened to a delivered screenshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub saved_path: Option<PathBuf>,
    pub copied_to_clipboard: bool,
}

impl Delivery {
    /// Neither auto-save nor clipboard is enabled; the front end has to ask
    /// the user where the screenshot should go
    #[must_use]
    pub fn needs_destination(&self) -> bool {
        self.saved_path.is_none() && !self.copied_to_clipboard
    }
}

pub struct Shotux {
    settings: SettingsStore,
    screenshots: ScreenshotManager,
    clipboard: ClipboardPublisher,
    hotkeys: HotkeySupervisor,
}

impl Default for Shotux {
    fn default() -> Self {
        Self::new()
    }
}

impl Shotux {
    /// Session on the per-user settings file with the real tools
    #[must_use]
    pub fn new() -> Self {
        let settings = SettingsStore::new();
        let hotkeys = HotkeySupervisor::new(&settings.settings());
        Self::with_components(settings, ScreenshotManager::new(), ClipboardPublisher::new(), hotkeys)
    }

    #[must_use]
    pub fn with_components(
        settings: SettingsStore,
        screenshots: ScreenshotManager,
        clipboard: ClipboardPublisher,
        hotkeys: HotkeySupervisor,
    ) -> Self {
        Self {
            settings,
            screenshots,
            clipboard,
            hotkeys,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    #[must_use]
    pub fn screenshots(&self) -> &ScreenshotManager {
        &self.screenshots
    }

    #[must_use]
    pub fn clipboard(&self) -> &ClipboardPublisher {
        &self.clipboard
    }

    #[must_use]
    pub fn hotkeys(&self) -> &HotkeySupervisor {
        &self.hotkeys
    }

    pub fn hotkeys_mut(&mut self) -> &mut HotkeySupervisor {
        &mut self.hotkeys
    }

    /// Registers global hotkeys; a failure is reported and the session keeps
    /// running without them
    pub fn start_hotkeys(&mut self) -> bool {
        match self.hotkeys.activate() {
            Ok(()) => true,
            Err(e) => {
                report_warning!("Hotkeys", &e.to_string());
                false
            }
        }
    }

    /// Captures after `delay_secs`, or the configured delay when `None`.
    /// `Ok(None)` is a cancelled capture.
    ///
    /// # Errors
    /// Returns [`Error::Capture`] when the capture failed
    pub async fn capture(
        &mut self,
        kind: ScreenshotKind,
        delay_secs: Option<u64>,
    ) -> Result<Option<DynamicImage>, Error> {
        let delay_secs = delay_secs.unwrap_or_else(|| self.settings.settings().delay);
        let options = ScreenshotOptions::new(kind).with_delay(delay_secs);
        Ok(self.screenshots.take_screenshot(&options).await?)
    }

    /// Applies the auto-save and clipboard settings to a capture.
    ///
    /// The image is encoded before anything is written and a saved file is
    /// removed again if the clipboard copy fails, so a failed delivery leaves
    /// neither a file nor clipboard content behind.
    ///
    /// # Errors
    /// Returns `Error` if encoding, saving or copying failed
    pub async fn deliver(&mut self, image: &DynamicImage) -> Result<Delivery, Error> {
        let settings = self.settings.settings();
        let mut delivery = Delivery::default();

        if settings.auto_save {
            let bytes = output::encode(image, settings.image_format, settings.image_quality)?;
            output::ensure_directory(&settings.save_directory)?;
            let path = settings
                .save_directory
                .join(output::timestamped_filename(settings.image_format));
            output::write_encoded(&bytes, &path)?;
            delivery.saved_path = Some(path);
        }

        if settings.copy_clipboard {
            if let Err(e) = self.clipboard.publish(image).await {
                if let Some(path) = delivery.saved_path.take() {
                    let _ = fs::remove_file(path);
                }
                return Err(e.into());
            }
            delivery.copied_to_clipboard = true;
        }

        Ok(delivery)
    }

    /// # Errors
    /// Returns [`Error::Clipboard`] if xclip is missing or fails
    pub async fn copy_to_clipboard(&mut self, image: &DynamicImage) -> Result<(), Error> {
        Ok(self.clipboard.publish(image).await?)
    }

    /// Saves to an explicit path in the format its extension names
    ///
    /// # Errors
    /// Returns `Error` if encoding or writing fails
    pub async fn save_as(&self, image: &DynamicImage, path: PathBuf) -> Result<PathBuf, Error> {
        let format = output::format_for_path(&path);
        let quality = self.settings.settings().image_quality;
        output::save_in_background(image.clone(), path, format, quality)
            .await
            .map_err(|e| Error::Background(e.to_string()))?
    }

    /// Saves as PNG under a timestamped name in the configured directory
    ///
    /// # Errors
    /// Returns `Error` if the directory cannot be created or the file cannot be written
    pub fn save_to_default_directory(&self, image: &DynamicImage) -> Result<PathBuf, Error> {
        let settings = self.settings.settings();
        output::save_to_directory(image, &settings.save_directory, ImageFormatSetting::Png, settings.image_quality)
    }

    /// Deletes temporary files and stops the hotkey helper
    pub fn cleanup(&mut self) {
        self.hotkeys.deactivate();
        self.screenshots.cleanup();
        self.clipboard.cleanup();
    }

    /// Persists settings, then [`Shotux::cleanup`]
    pub fn shutdown(&mut self) {
        self.settings.save(None);
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExternalTool;
    use crate::screenshot::scrot::ScrotScreengrabber;
    use crate::settings::keys;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        app: Shotux,
    }

    fn fixture(xclip_script: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("fixture.png");
        DynamicImage::new_rgba8(8, 8).save(&png).unwrap();

        let mut settings = SettingsStore::with_path(dir.path().join("config").join("config.json"));
        settings.set(keys::SAVE_DIRECTORY, dir.path().join("shots").to_string_lossy().as_ref());

        let scrot_script = format!("for last; do :; done; cp '{}' \"$last\"", png.display());
        let screenshots = ScreenshotManager::with_grabbers(vec![Box::new(ScrotScreengrabber::with_tool(
            ExternalTool::scripted("scrot", "scrot", &scrot_script),
        ))]);
        let clipboard = ClipboardPublisher::with_tool(ExternalTool::scripted("xclip", "xclip", xclip_script));
        let hotkeys = HotkeySupervisor::new(&settings.settings())
            .with_daemon(ExternalTool::xbindkeys().with_program("/nonexistent/xbindkeys"))
            .with_config_path(dir.path().join(".xbindkeysrc.shotux"));

        let app = Shotux::with_components(settings, screenshots, clipboard, hotkeys);
        Fixture { dir, app }
    }

    fn saved_files(dir: &TempDir) -> Vec<PathBuf> {
        fs::read_dir(dir.path().join("shots"))
            .map(|entries| entries.map(|entry| entry.unwrap().path()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn default_delivery_copies_to_clipboard_only() {
        let Fixture { dir, mut app } = fixture("exit 0");
        let image = app.capture(ScreenshotKind::Window, Some(0)).await.unwrap().unwrap();

        let delivery = app.deliver(&image).await.unwrap();
        assert!(delivery.copied_to_clipboard);
        assert!(delivery.saved_path.is_none());
        assert!(saved_files(&dir).is_empty());
    }

    #[tokio::test]
    async fn auto_save_writes_configured_format() {
        let Fixture { dir, mut app } = fixture("exit 0");
        app.settings_mut().set(keys::AUTO_SAVE, true);
        app.settings_mut().set(keys::COPY_CLIPBOARD, false);
        app.settings_mut().set(keys::IMAGE_FORMAT, "JPEG");

        let image = app.capture(ScreenshotKind::Region, Some(0)).await.unwrap().unwrap();
        let delivery = app.deliver(&image).await.unwrap();

        let path = delivery.saved_path.expect("saved");
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(saved_files(&dir), [path]);
    }

    #[tokio::test]
    async fn failed_clipboard_copy_leaves_no_saved_file() {
        let Fixture { dir, mut app } = fixture("echo 'Error: Can not open display' >&2; exit 1");
        app.settings_mut().set(keys::AUTO_SAVE, true);

        let image = app.capture(ScreenshotKind::Fullscreen, Some(0)).await.unwrap().unwrap();
        let err = app.deliver(&image).await.unwrap_err();

        assert!(matches!(err, Error::Clipboard(_)));
        assert!(saved_files(&dir).is_empty());
    }

    #[tokio::test]
    async fn nothing_enabled_needs_a_destination() {
        let Fixture { dir: _dir, mut app } = fixture("exit 0");
        app.settings_mut().set(keys::COPY_CLIPBOARD, false);

        let image = app.capture(ScreenshotKind::Window, Some(0)).await.unwrap().unwrap();
        assert!(app.deliver(&image).await.unwrap().needs_destination());
    }

    #[tokio::test]
    async fn explicit_and_default_saves() {
        let Fixture { dir, mut app } = fixture("exit 0");
        let image = app.capture(ScreenshotKind::Window, Some(0)).await.unwrap().unwrap();

        let explicit = app.save_as(&image, dir.path().join("chosen.png")).await.unwrap();
        assert!(explicit.exists());

        let default = app.save_to_default_directory(&image).unwrap();
        assert_eq!(default.extension().unwrap(), "png");
        assert!(default.starts_with(dir.path().join("shots")));
    }

    #[tokio::test]
    async fn cleanup_releases_every_temp_file() {
        let Fixture { dir: _dir, mut app } = fixture("exit 0");
        assert!(app.start_hotkeys());

        let image = app.capture(ScreenshotKind::Window, Some(0)).await.unwrap().unwrap();
        app.copy_to_clipboard(&image).await.unwrap();
        let temp: Vec<PathBuf> = app
            .screenshots()
            .temp_files()
            .paths()
            .iter()
            .chain(app.clipboard().temp_files().paths())
            .cloned()
            .collect();
        assert_eq!(temp.len(), 2);

        app.shutdown();
        assert!(temp.iter().all(|path| !path.exists()));
        assert!(!app.hotkeys().is_active());
        assert!(app.settings().config_path().exists());
    }
}
