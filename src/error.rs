use std::{
    error::Error as StdError,
    fmt::{self, Display},
    io,
};

use crate::clipboard::ClipboardError;
use crate::screenshot::ScreenshotError;
use crate::settings::ConfigError;

/// Error type for the operations a user triggers directly.
///
/// The primary purpose of this type is to provide simple user facing messages.
#[derive(Debug)]
pub enum Error {
    /// Capturing failed (missing scrot, tool failure, timeout, X11)
    Capture(ScreenshotError),
    /// Copying to the clipboard failed
    Clipboard(ClipboardError),
    /// Explicit settings export or import failed
    Config(ConfigError),
    /// Screenshot succeeded but cannot be encoded
    Encode(image::ImageError),
    /// Screenshot succeeded but cannot be saved
    SaveScreenshot {
        error: io::Error,
        context: &'static str,
    },
    /// A background worker panicked or was cancelled
    Background(String),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Capture(e) => Some(e),
            Self::Clipboard(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::SaveScreenshot { error, .. } => Some(error),
            Self::Background(_) => None,
        }
    }
}

// Log facing display messages for programmers or debugging
impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture(e) => write!(f, "capturing screenshot: {e}"),
            Self::Clipboard(e) => write!(f, "copying to clipboard: {e}"),
            Self::Config(e) => e.fmt(f),
            Self::Encode(e) => write!(f, "encoding screenshot: {e}"),
            Self::SaveScreenshot { error, context } => write!(f, "{context}: {error}"),
            Self::Background(msg) => write!(f, "background task: {msg}"),
        }
    }
}

impl Error {
    /// Condensed error message for end users
    #[must_use]
    pub fn to_user_facing(&self) -> String {
        match self {
            // the install hint is the whole message
            Self::Capture(ScreenshotError::Tool(e)) | Self::Clipboard(ClipboardError::Tool(e))
                if e.is_dependency_missing() =>
            {
                e.to_string()
            }
            _ if self.timed_out() => "Screenshot capture timed out".to_string(),
            Self::Capture(e) => format!("Screenshot capture failed: {e}"),
            Self::Clipboard(e) => format!("Failed to copy to clipboard: {e}"),
            Self::Config(e) => e.to_string(),
            Self::Encode(_) | Self::SaveScreenshot { .. } | Self::Background(_) => {
                format!("Screenshot captured but couldn't be saved: {self}")
            }
        }
    }

    /// A required external program is not installed
    #[must_use]
    pub fn dependency_missing(&self) -> bool {
        match self {
            Self::Capture(e) => e.is_dependency_missing(),
            Self::Clipboard(e) => e.is_dependency_missing(),
            _ => false,
        }
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::Capture(e) if e.is_timeout())
    }
}

impl From<ScreenshotError> for Error {
    fn from(value: ScreenshotError) -> Self {
        Self::Capture(value)
    }
}

impl From<ClipboardError> for Error {
    fn from(value: ClipboardError) -> Self {
        Self::Clipboard(value)
    }
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<image::ImageError> for Error {
    fn from(value: image::ImageError) -> Self {
        Self::Encode(value)
    }
}
