// SPDX-License-Identifier: GPL-3.0-only

//! Persisted user settings.
//!
//! The active document is always the default document with the user's file
//! deep-merged over it, so every default key is present after a load. Loading
//! and saving are best-effort: failures are logged and the session continues
//! on defaults. Exporting and importing are explicit user actions and report
//! their errors instead.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "shotux";
pub const CONFIG_FILE: &str = "config.json";

/// A settings tree as stored on disk
pub type Document = Map<String, Value>;

/// Dotted paths of the default document
pub mod keys {
    pub const DELAY: &str = "delay";
    pub const AUTO_SAVE: &str = "auto_save";
    pub const COPY_CLIPBOARD: &str = "copy_clipboard";
    pub const SAVE_DIRECTORY: &str = "save_directory";
    pub const IMAGE_FORMAT: &str = "image_format";
    pub const IMAGE_QUALITY: &str = "image_quality";
    pub const HOTKEY_FULLSCREEN: &str = "hotkeys.fullscreen";
    pub const HOTKEY_WINDOW: &str = "hotkeys.window";
    pub const HOTKEY_REGION: &str = "hotkeys.region";
    pub const UI_THEME: &str = "ui.theme";
    pub const UI_MINIMIZE_TO_TRAY: &str = "ui.minimize_to_tray";
    pub const UI_SHOW_NOTIFICATIONS: &str = "ui.show_notifications";

    pub const ALL: [&str; 12] = [
        DELAY,
        AUTO_SAVE,
        COPY_CLIPBOARD,
        SAVE_DIRECTORY,
        IMAGE_FORMAT,
        IMAGE_QUALITY,
        HOTKEY_FULLSCREEN,
        HOTKEY_WINDOW,
        HOTKEY_REGION,
        UI_THEME,
        UI_MINIMIZE_TO_TRAY,
        UI_SHOW_NOTIFICATIONS,
    ];
}

/// Encoding used when saving screenshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormatSetting {
    #[default]
    #[serde(rename = "PNG", alias = "png")]
    Png,
    #[serde(rename = "JPEG", alias = "JPG", alias = "jpeg", alias = "jpg")]
    Jpeg,
}

impl ImageFormatSetting {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeySettings {
    pub fullscreen: String,
    pub window: String,
    pub region: String,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            fullscreen: "Print".to_string(),
            window: "alt+Print".to_string(),
            region: "shift+Print".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub theme: String,
    pub minimize_to_tray: bool,
    pub show_notifications: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            minimize_to_tray: true,
            show_notifications: true,
        }
    }
}

/// Typed view of a settings [`Document`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotSettings {
    /// Seconds to wait before capturing
    pub delay: u64,
    /// Save every capture to `save_directory`
    pub auto_save: bool,
    /// Copy every capture to the clipboard
    pub copy_clipboard: bool,
    pub save_directory: PathBuf,
    pub image_format: ImageFormatSetting,
    /// JPEG quality, 1-100
    pub image_quality: u8,
    pub hotkeys: HotkeySettings,
    pub ui: UiSettings,
}

impl Default for ScreenshotSettings {
    fn default() -> Self {
        Self {
            delay: 0,
            auto_save: false,
            copy_clipboard: true,
            save_directory: default_save_directory(),
            image_format: ImageFormatSetting::Png,
            image_quality: 95,
            hotkeys: HotkeySettings::default(),
            ui: UiSettings::default(),
        }
    }
}

impl ScreenshotSettings {
    /// Reads the typed view out of a document key by key. A missing or
    /// wrongly typed value falls back to its default and leaves the other
    /// values untouched.
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        let defaults = Self::default();
        Self {
            delay: field(document, keys::DELAY, defaults.delay),
            auto_save: field(document, keys::AUTO_SAVE, defaults.auto_save),
            copy_clipboard: field(document, keys::COPY_CLIPBOARD, defaults.copy_clipboard),
            save_directory: field(document, keys::SAVE_DIRECTORY, defaults.save_directory),
            image_format: field(document, keys::IMAGE_FORMAT, defaults.image_format),
            image_quality: field(document, keys::IMAGE_QUALITY, defaults.image_quality),
            hotkeys: HotkeySettings {
                fullscreen: field(document, keys::HOTKEY_FULLSCREEN, defaults.hotkeys.fullscreen),
                window: field(document, keys::HOTKEY_WINDOW, defaults.hotkeys.window),
                region: field(document, keys::HOTKEY_REGION, defaults.hotkeys.region),
            },
            ui: UiSettings {
                theme: field(document, keys::UI_THEME, defaults.ui.theme),
                minimize_to_tray: field(document, keys::UI_MINIMIZE_TO_TRAY, defaults.ui.minimize_to_tray),
                show_notifications: field(document, keys::UI_SHOW_NOTIFICATIONS, defaults.ui.show_notifications),
            },
        }
    }
}

fn field<T: DeserializeOwned>(document: &Document, key: &str, default: T) -> T {
    let Some(value) = lookup(document, key) else {
        return default;
    };
    match serde_json::from_value(value.clone()) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Invalid value for `{key}`, using the default: {err}");
            default
        }
    }
}

/// Value at a dotted key, if every segment resolves
#[must_use]
pub fn lookup<'a>(document: &'a Document, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut value = document.get(segments.next()?)?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} does not contain a settings object", .path.display())]
    NotAnObject { path: PathBuf },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[must_use]
pub fn default_save_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("Pictures")
        .join("Screenshots")
}

/// `$XDG_CONFIG_HOME/shotux/config.json`
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_default()
        .join(APP_NAME)
        .join(CONFIG_FILE)
}

#[must_use]
pub fn default_document() -> Document {
    Document::from_iter([
        (keys::DELAY.to_string(), json!(0)),
        (keys::AUTO_SAVE.to_string(), json!(false)),
        (keys::COPY_CLIPBOARD.to_string(), json!(true)),
        (
            keys::SAVE_DIRECTORY.to_string(),
            json!(default_save_directory().to_string_lossy()),
        ),
        (keys::IMAGE_FORMAT.to_string(), json!("PNG")),
        (keys::IMAGE_QUALITY.to_string(), json!(95)),
        (
            "hotkeys".to_string(),
            json!({
                "fullscreen": "Print",
                "window": "alt+Print",
                "region": "shift+Print"
            }),
        ),
        (
            "ui".to_string(),
            json!({
                "theme": "default",
                "minimize_to_tray": true,
                "show_notifications": true
            }),
        ),
    ])
}

/// Deep-merges `user` over `default`.
///
/// Leaves from `user` win; when both sides hold a table the tables are merged
/// recursively; any other combination lets the user value replace the default
/// subtree wholesale.
#[must_use]
pub fn merge(default: &Document, user: &Document) -> Document {
    let mut merged = default.clone();
    for (key, value) in user {
        let combined = match (merged.get(key), value) {
            (Some(Value::Object(base)), Value::Object(overrides)) => {
                Value::Object(merge(base, overrides))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

fn read_document(path: &Path) -> Result<Document, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match serde_json::from_str(&contents) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_document(document: &Document, path: &Path) -> Result<(), ConfigError> {
    let contents = serde_json::to_string_pretty(document).map_err(ConfigError::Serialize)?;
    fs::write(path, contents).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Walks `key` through nested tables, creating missing intermediate tables.
fn set_path(document: &mut Document, key: &str, value: Value) -> Result<(), String> {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };

    let mut table = document;
    for segment in parents.into_iter().flat_map(|parents| parents.split('.')) {
        let entry = table
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        table = match entry {
            Value::Object(inner) => inner,
            _ => return Err(format!("`{segment}` is not a table")),
        };
    }
    table.insert(leaf.to_string(), value);
    Ok(())
}

pub struct SettingsStore {
    path: PathBuf,
    defaults: Document,
    document: Document,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    /// Opens the store at the per-user config path
    #[must_use]
    pub fn new() -> Self {
        Self::with_path(default_config_path())
    }

    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            defaults: default_document(),
            document: Document::new(),
        };
        store.document = store.load();
        store
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn settings(&self) -> ScreenshotSettings {
        ScreenshotSettings::from_document(&self.document)
    }

    /// Reads the persisted file merged over defaults. Never fails: a missing
    /// file yields the defaults, an unreadable one is logged first.
    #[must_use]
    pub fn load(&self) -> Document {
        if !self.path.exists() {
            return self.defaults.clone();
        }
        match read_document(&self.path) {
            Ok(user) => merge(&self.defaults, &user),
            Err(err) => {
                log::warn!("Failed to load config: {err}");
                self.defaults.clone()
            }
        }
    }

    /// Replaces the in-memory document with a fresh [`SettingsStore::load`]
    pub fn reload(&mut self) {
        self.document = self.load();
    }

    /// Applies `updates` at the top level, then writes the whole document.
    /// Write failures are logged.
    pub fn save(&mut self, updates: Option<Document>) {
        if let Some(updates) = updates {
            self.document.extend(updates);
        }

        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                log::warn!("Failed to save config: creating {}: {err}", parent.display());
                return;
            }
        }
        if let Err(err) = write_document(&self.document, &self.path) {
            log::warn!("Failed to save config: {err}");
        }
    }

    /// Value at a dotted key, if every segment resolves
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        lookup(&self.document, key)
    }

    /// Value at a dotted key, or `default` when the path does not resolve
    #[must_use]
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.lookup(key).cloned().unwrap_or(default)
    }

    /// Typed [`SettingsStore::get`]; a value of the wrong type yields `default`
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.lookup(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or(default)
    }

    /// Stores `value` at a dotted key, creating intermediate tables as needed.
    /// A path running through a non-table value is logged and left untouched.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        if let Err(err) = set_path(&mut self.document, key, value.into()) {
            log::warn!("Failed to set config value `{key}`: {err}");
        }
    }

    /// Discards the session's changes and persists the defaults
    pub fn reset(&mut self) {
        self.document = self.defaults.clone();
        self.save(None);
    }

    /// # Errors
    /// Returns [`ConfigError`] if the document cannot be written to `path`
    pub fn export(&self, path: &Path) -> Result<(), ConfigError> {
        write_document(&self.document, path)
    }

    /// Replaces the document with `path` merged over defaults and persists it
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `path` cannot be read or is not a settings object
    pub fn import(&mut self, path: &Path) -> Result<(), ConfigError> {
        let imported = read_document(path)?;
        self.document = merge(&self.defaults, &imported);
        self.save(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::with_path(dir.path().join(APP_NAME).join(CONFIG_FILE))
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(APP_NAME).join(CONFIG_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn object(value: Value) -> Document {
        match value {
            Value::Object(document) => document,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn fresh_environment_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.document(), &default_document());
        assert_eq!(store.settings(), ScreenshotSettings::default());
    }

    #[test]
    fn partial_file_overrides_only_its_keys() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{"delay": 5}"#);
        let store = store_in(&dir);

        let mut expected = default_document();
        expected.insert("delay".into(), json!(5));
        assert_eq!(store.document(), &expected);
        assert_eq!(store.settings().delay, 5);
    }

    #[test]
    fn nested_overrides_keep_sibling_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{"hotkeys": {"region": "ctrl+Print"}, "extra": 1}"#);
        let store = store_in(&dir);

        assert_eq!(store.get(keys::HOTKEY_REGION, Value::Null), json!("ctrl+Print"));
        assert_eq!(store.get(keys::HOTKEY_FULLSCREEN, Value::Null), json!("Print"));
        assert_eq!(store.get("extra", Value::Null), json!(1));
    }

    #[test]
    fn scalar_replaces_default_subtree() {
        let defaults = default_document();
        let merged = merge(&defaults, &object(json!({"ui": false})));
        assert_eq!(merged["ui"], json!(false));
    }

    #[test]
    fn every_default_key_survives_load() {
        let dir = TempDir::new().unwrap();
        for contents in ["{}", r#"{"delay": 3}"#, r#"{"ui": {"theme": "dark"}}"#] {
            write_config(&dir, contents);
            let store = store_in(&dir);
            for key in keys::ALL {
                assert!(store.lookup(key).is_some(), "{key} missing after loading {contents}");
            }
        }
    }

    #[test]
    fn merge_is_idempotent() {
        let defaults = default_document();
        let user = object(json!({"delay": 2, "hotkeys": {"window": "super+Print"}, "new": {"a": 1}}));
        let once = merge(&defaults, &user);
        let twice = merge(&once, &user);
        assert_eq!(once, twice);

        let self_merge = merge(&once, &once);
        assert_eq!(merge(&self_merge, &once), self_merge);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "{ not json");
        assert_eq!(store_in(&dir).document(), &default_document());

        write_config(&dir, "[1, 2, 3]");
        assert_eq!(store_in(&dir).document(), &default_document());
    }

    #[test]
    fn dotted_set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.set(keys::UI_THEME, "dark");
        assert_eq!(store.get(keys::UI_THEME, Value::Null), json!("dark"));

        store.set("plugins.upload.endpoint", "https://example.invalid");
        assert_eq!(
            store.get("plugins.upload.endpoint", Value::Null),
            json!("https://example.invalid")
        );

        store.set(keys::DELAY, 7);
        assert_eq!(store.get_as(keys::DELAY, 0_u64), 7);
    }

    #[test]
    fn get_on_unresolvable_path_returns_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.get("ui.missing", json!("fallback")), json!("fallback"));
        assert_eq!(store.get("nope.deeper.still", json!(1)), json!(1));
        // `delay` is a leaf, it cannot be walked into
        assert_eq!(store.get("delay.seconds", json!(null)), Value::Null);
        assert_eq!(store.get_as(keys::UI_THEME, 0_u32), 0);
    }

    #[test]
    fn set_through_a_leaf_leaves_document_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let before = store.document().clone();

        store.set("delay.seconds", 3);
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn save_creates_directory_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set(keys::AUTO_SAVE, true);
        store.save(Some(object(json!({"delay": 4}))));

        let reopened = store_in(&dir);
        assert_eq!(reopened.settings().delay, 4);
        assert!(reopened.settings().auto_save);

        let raw = fs::read_to_string(store.config_path()).unwrap();
        assert!(raw.contains("\n  \""), "expected indented JSON:\n{raw}");
    }

    #[test]
    fn shallow_update_replaces_whole_subtree() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save(Some(object(json!({"hotkeys": {"fullscreen": "F12"}}))));

        assert_eq!(store.get(keys::HOTKEY_FULLSCREEN, Value::Null), json!("F12"));
        assert!(store.lookup(keys::HOTKEY_WINDOW).is_none());

        // the next load backfills the defaults again
        store.reload();
        assert_eq!(store.get(keys::HOTKEY_WINDOW, Value::Null), json!("alt+Print"));
    }

    #[test]
    fn save_failure_is_absorbed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut store = SettingsStore::with_path(blocker.join("shotux").join(CONFIG_FILE));
        store.set(keys::DELAY, 1);
        store.save(None);
        assert_eq!(store.settings().delay, 1);
    }

    #[test]
    fn reset_restores_and_persists_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{"delay": 9, "custom": true}"#);
        let mut store = store_in(&dir);
        store.reset();

        assert_eq!(store.document(), &default_document());
        assert_eq!(store_in(&dir).document(), &default_document());
    }

    #[test]
    fn export_then_import_carries_values() {
        let dir = TempDir::new().unwrap();
        let mut source = store_in(&dir);
        source.set(keys::IMAGE_FORMAT, "JPEG");
        let exported = dir.path().join("exported.json");
        source.export(&exported).unwrap();

        let other = TempDir::new().unwrap();
        let mut target = store_in(&other);
        target.import(&exported).unwrap();
        assert_eq!(target.settings().image_format, ImageFormatSetting::Jpeg);
        assert_eq!(store_in(&other).settings().image_format, ImageFormatSetting::Jpeg);
    }

    #[test]
    fn import_merges_over_defaults() {
        let dir = TempDir::new().unwrap();
        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"{"image_quality": 50}"#).unwrap();

        let mut store = store_in(&dir);
        store.import(&partial).unwrap();
        assert_eq!(store.settings().image_quality, 50);
        assert_eq!(store.settings().hotkeys, HotkeySettings::default());
    }

    #[test]
    fn import_and_export_report_errors() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let missing = dir.path().join("missing.json");
        assert!(matches!(store.import(&missing), Err(ConfigError::Read { .. })));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "garbage").unwrap();
        assert!(matches!(store.import(&garbage), Err(ConfigError::Parse { .. })));

        let list = dir.path().join("list.json");
        fs::write(&list, "[]").unwrap();
        assert!(matches!(store.import(&list), Err(ConfigError::NotAnObject { .. })));

        let unwritable = dir.path().join("no-such-dir").join("out.json");
        assert!(matches!(store.export(&unwritable), Err(ConfigError::Write { .. })));
    }

    #[test]
    fn wrongly_typed_value_falls_back_in_typed_view() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{"delay": "soon"}"#);
        let store = store_in(&dir);

        assert_eq!(store.get(keys::DELAY, Value::Null), json!("soon"));
        assert_eq!(store.settings(), ScreenshotSettings::default());
    }

    #[test]
    fn bad_value_keeps_sibling_settings() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"{"image_quality": 300, "save_directory": "/srv/shots", "auto_save": true,
                "hotkeys": {"window": 7, "region": "ctrl+Print"}}"#,
        );
        let settings = store_in(&dir).settings();

        assert_eq!(settings.image_quality, 95);
        assert_eq!(settings.save_directory, PathBuf::from("/srv/shots"));
        assert!(settings.auto_save);
        assert_eq!(settings.hotkeys.window, "alt+Print");
        assert_eq!(settings.hotkeys.region, "ctrl+Print");
    }

    #[test]
    fn typed_defaults_match_default_document() {
        assert_eq!(
            ScreenshotSettings::from_document(&default_document()),
            ScreenshotSettings::default()
        );
    }
}
