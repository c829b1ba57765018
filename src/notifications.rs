// SPDX-License-Identifier: GPL-3.0-only

//! Desktop notifications through `org.freedesktop.Notifications`

use std::collections::HashMap;
use tokio::sync::OnceCell;
use zbus::zvariant::Value;
use zbus::{proxy, Connection};

const APP_NAME: &str = "Shotux";
const APP_ICON_FALLBACK: &str = "applets-screenshooter";

/// How long a notification stays up unless it is an error
const EXPIRE_MS: i32 = 5000;

#[derive(thiserror::Error, Debug)]
pub enum NotificationError {
    #[error("no session bus available for notifications")]
    NoSessionBus,
    #[error("notification server: {0}")]
    Bus(#[from] zbus::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
    /// A screenshot was saved or copied
    Success,
}

impl NotificationKind {
    /// Urgency byte of the freedesktop hints: 0 low, 1 normal, 2 critical
    #[must_use]
    pub fn urgency(self) -> u8 {
        match self {
            Self::Info | Self::Success => 0,
            Self::Warning => 1,
            Self::Error => 2,
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Info => "dialog-information",
            Self::Success => APP_ICON_FALLBACK,
            Self::Warning => "dialog-warning",
            Self::Error => "dialog-error",
        }
    }

    /// Errors stay until dismissed, everything else expires and is kept
    /// out of the notification history
    fn is_transient(self) -> bool {
        self != Self::Error
    }

    fn expire_timeout(self) -> i32 {
        if self.is_transient() {
            EXPIRE_MS
        } else {
            0
        }
    }

    fn hints(self) -> HashMap<&'static str, Value<'static>> {
        let mut hints = HashMap::from([("urgency", Value::U8(self.urgency()))]);
        if self.is_transient() {
            hints.insert("transient", Value::Bool(true));
        }
        hints
    }
}

#[allow(clippy::too_many_arguments)]
#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Session bus proxy, or nothing when there is no bus (headless, plain TTY)
pub struct Notifier {
    proxy: Option<NotificationsProxy<'static>>,
}

impl Notifier {
    pub async fn connect() -> Self {
        let proxy = match Connection::session().await {
            Ok(connection) => match NotificationsProxy::new(&connection).await {
                Ok(proxy) => Some(proxy),
                Err(e) => {
                    log::debug!("notification proxy unavailable: {e}");
                    None
                }
            },
            Err(e) => {
                log::debug!("no session bus: {e}");
                None
            }
        };
        Self { proxy }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.proxy.is_some()
    }

    /// # Errors
    /// Returns [`NotificationError`] without a session bus or when the
    /// notification server rejects the call
    pub async fn send(&self, kind: NotificationKind, summary: &str, body: &str) -> Result<u32, NotificationError> {
        let proxy = self.proxy.as_ref().ok_or(NotificationError::NoSessionBus)?;
        let id = proxy
            .notify(
                APP_NAME,
                0,
                kind.icon(),
                summary,
                body,
                Vec::new(),
                kind.hints(),
                kind.expire_timeout(),
            )
            .await?;
        Ok(id)
    }
}

static NOTIFIER: OnceCell<Notifier> = OnceCell::const_new();

/// Sends through a process-wide [`Notifier`], connecting on first use
///
/// # Errors
/// See [`Notifier::send`]
pub async fn notify(kind: NotificationKind, summary: &str, body: &str) -> Result<u32, NotificationError> {
    NOTIFIER
        .get_or_init(Notifier::connect)
        .await
        .send(kind, summary, body)
        .await
}
