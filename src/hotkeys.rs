// SPDX-License-Identifier: GPL-3.0-only

//! Global hotkeys through an xbindkeys helper process.
//!
//! The supervisor writes a helper configuration binding each capture mode to a
//! re-invocation of this program, runs xbindkeys on it and owns both the
//! process and the file until [`HotkeySupervisor::deactivate`] or drop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::process::ExternalTool;
use crate::screenshot::ScreenshotKind;
use crate::settings::{HotkeySettings, ScreenshotSettings};

/// Helper configuration, relative to the home directory
pub const HELPER_CONFIG_FILE: &str = ".xbindkeysrc.shotux";

/// How long a helper may take to exit after SIGTERM before it is killed
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(thiserror::Error, Debug)]
pub enum HotkeyError {
    #[error("Failed to setup hotkeys: no home directory for ~/.xbindkeysrc.shotux")]
    NoHomeDirectory,
    #[error("Failed to setup hotkeys: {context}: {source}")]
    Setup {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

pub struct HotkeySupervisor {
    daemon: ExternalTool,
    config_path: Option<PathBuf>,
    program: PathBuf,
    bindings: HotkeySettings,
    notify: bool,
    grace: Duration,
    helpers: Vec<Child>,
    written_config: Option<PathBuf>,
    active: bool,
}

impl HotkeySupervisor {
    /// Bindings come from the `hotkeys` table, `--notify` is added to the
    /// re-invocations when notifications are enabled
    #[must_use]
    pub fn new(settings: &ScreenshotSettings) -> Self {
        let program = std::env::current_exe().unwrap_or_else(|err| {
            log::debug!("cannot resolve current executable ({err}), relying on PATH");
            PathBuf::from(env!("CARGO_PKG_NAME"))
        });

        Self {
            daemon: ExternalTool::xbindkeys(),
            config_path: dirs::home_dir().map(|home| home.join(HELPER_CONFIG_FILE)),
            program,
            bindings: settings.hotkeys.clone(),
            notify: settings.ui.show_notifications,
            grace: TERMINATE_GRACE,
            helpers: Vec::new(),
            written_config: None,
            active: false,
        }
    }

    #[must_use]
    pub fn with_daemon(mut self, daemon: ExternalTool) -> Self {
        self.daemon = daemon;
        self
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Executable the bindings re-invoke
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn daemon(&self) -> &ExternalTool {
        &self.daemon
    }

    /// Helper processes currently owned
    #[must_use]
    pub fn helper_count(&self) -> usize {
        self.helpers.len()
    }

    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Starts the helper daemon. Without xbindkeys installed this only marks
    /// the supervisor active: there is no built-in key monitoring.
    ///
    /// # Errors
    /// Returns `HotkeyError` if the helper configuration cannot be written or
    /// the daemon cannot be started. Callers are expected to carry on without
    /// global hotkeys.
    pub fn activate(&mut self) -> Result<(), HotkeyError> {
        if self.active {
            return Ok(());
        }

        if self.daemon.is_installed() {
            self.start_daemon()?;
        } else {
            log::warn!(
                "{} not found, global hotkeys are unavailable",
                self.daemon.name()
            );
        }
        self.active = true;
        Ok(())
    }

    fn start_daemon(&mut self) -> Result<(), HotkeyError> {
        let path = self.config_path.clone().ok_or(HotkeyError::NoHomeDirectory)?;
        let contents = render_config(&self.program, &self.bindings, self.notify);
        fs::write(&path, contents).map_err(|source| HotkeyError::Setup {
            context: "writing helper configuration",
            source,
        })?;
        self.written_config = Some(path.clone());

        // -n keeps xbindkeys in the foreground so the child is the daemon itself
        let spawned = self
            .daemon
            .std_command([Path::new("-n"), Path::new("-f"), path.as_path()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                log::info!("started {} (pid {})", self.daemon.name(), child.id());
                self.helpers.push(child);
                Ok(())
            }
            Err(source) => {
                self.remove_config();
                Err(HotkeyError::Setup {
                    context: "starting xbindkeys",
                    source,
                })
            }
        }
    }

    /// Stops every helper and removes the helper configuration. Safe to call
    /// repeatedly and on a supervisor that was never activated.
    pub fn deactivate(&mut self) {
        self.active = false;
        for mut child in self.helpers.drain(..) {
            stop_helper(&mut child, self.grace);
        }
        self.remove_config();
    }

    fn remove_config(&mut self) {
        let Some(path) = self.written_config.take() else {
            return;
        };
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::debug!("failed to remove {}: {err}", path.display()),
        }
    }
}

impl Drop for HotkeySupervisor {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// SIGTERM, then SIGKILL once `grace` has elapsed. Errors are ignored: the
/// process may already be gone.
fn stop_helper(child: &mut Child, grace: Duration) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Ok(pid) = i32::try_from(child.id()) {
        let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
    }

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(status)) => {
                log::info!("hotkey helper exited ({status})");
                return;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(_) => break,
        }
    }

    log::debug!("hotkey helper ignored SIGTERM, killing it");
    let _ = child.kill();
    let _ = child.wait();
}

/// xbindkeys writes modifiers as `alt + Print`
fn key_combo(combo: &str) -> String {
    combo
        .split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" + ")
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// xbindkeys configuration with one stanza per capture mode
#[must_use]
pub fn render_config(program: &Path, bindings: &HotkeySettings, notify: bool) -> String {
    let program = shell_quote(&program.to_string_lossy());
    let notify = if notify { " --notify" } else { "" };

    let mut config = String::from("# Shotux hotkeys configuration\n");
    for kind in ScreenshotKind::ALL {
        let combo = match kind {
            ScreenshotKind::Fullscreen => &bindings.fullscreen,
            ScreenshotKind::Window => &bindings.window,
            ScreenshotKind::Region => &bindings.region,
        };
        if combo.trim().is_empty() {
            continue;
        }
        config.push_str(&format!(
            "\n# {kind} capture\n\"{program} --capture {}{notify}\"\n    {}\n",
            kind.as_str(),
            key_combo(combo)
        ));
    }
    config
}
