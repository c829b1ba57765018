// SPDX-License-Identifier: GPL-3.0-only

//! User-facing reporting of failures and state changes
//!
//! Without a front end every report is a line on stderr. Once a front end
//! calls [`set_gui_mode`], errors are queued on the [`setup_gui_channel`]
//! receiver to be shown as dialogs while warnings and info become desktop
//! notifications. Reports are logged in both modes.

use crate::notifications::{notify, NotificationKind};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::OnceLock;

static GUI_MODE: AtomicBool = AtomicBool::new(false);

static DIALOG_QUEUE: OnceLock<Sender<Report>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The requested operation was abandoned
    Error,
    /// Degraded functionality, e.g. running without global hotkeys
    Warning,
    Info,
}

impl ErrorSeverity {
    fn label(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }

    fn notification_kind(self) -> NotificationKind {
        match self {
            Self::Error => NotificationKind::Error,
            Self::Warning => NotificationKind::Warning,
            Self::Info => NotificationKind::Info,
        }
    }

    /// Only errors interrupt the user with a dialog
    #[must_use]
    pub fn wants_dialog(self) -> bool {
        matches!(self, Self::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub severity: ErrorSeverity,
    pub title: String,
    pub message: String,
}

impl Report {
    #[must_use]
    pub fn new(severity: ErrorSeverity, title: &str, message: &str) -> Self {
        Self {
            severity,
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    /// Title and message laid out for a dialog body
    #[must_use]
    pub fn dialog_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.message)
    }
}

// stderr form: `ERROR: title: message`
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity.label(), self.title, self.message)
    }
}

pub fn set_gui_mode(enabled: bool) {
    GUI_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_gui_mode() -> bool {
    GUI_MODE.load(Ordering::Relaxed)
}

/// Receiver for dialog-worthy reports. Only the first call is connected;
/// later receivers never see anything.
pub fn setup_gui_channel() -> Receiver<Report> {
    let (sender, receiver) = mpsc::channel();
    let _ = DIALOG_QUEUE.set(sender);
    receiver
}

/// Logs the report and shows it the way the current mode calls for
pub fn report_error(severity: ErrorSeverity, title: &str, message: &str) {
    let report = Report::new(severity, title, message);
    match severity {
        ErrorSeverity::Error => log::error!("{title}: {message}"),
        ErrorSeverity::Warning => log::warn!("{title}: {message}"),
        ErrorSeverity::Info => log::info!("{title}: {message}"),
    }

    if !is_gui_mode() {
        eprintln!("{report}");
    } else if severity.wants_dialog() {
        queue_dialog(report);
    } else {
        spawn_notification(report);
    }
}

fn queue_dialog(report: Report) {
    let Some(queue) = DIALOG_QUEUE.get() else {
        eprintln!("{report}");
        return;
    };
    if let Err(mpsc::SendError(report)) = queue.send(report) {
        eprintln!("{report}");
    }
}

fn spawn_notification(report: Report) {
    // notifications need a runtime; without one fall back to the console
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        eprintln!("{report}");
        return;
    };
    handle.spawn(async move {
        let kind = report.severity.notification_kind();
        if let Err(e) = notify(kind, &report.title, &report.message).await {
            log::debug!("Notification failed: {e}");
            eprintln!("{report}");
        }
    });
}

#[macro_export]
macro_rules! report_error {
    ($title:expr, $msg:expr) => {
        $crate::error_handling::report_error($crate::error_handling::ErrorSeverity::Error, $title, $msg)
    };
}

#[macro_export]
macro_rules! report_warning {
    ($title:expr, $msg:expr) => {
        $crate::error_handling::report_error($crate::error_handling::ErrorSeverity::Warning, $title, $msg)
    };
}

#[macro_export]
macro_rules! report_info {
    ($title:expr, $msg:expr) => {
        $crate::error_handling::report_error($crate::error_handling::ErrorSeverity::Info, $title, $msg)
    };
}
