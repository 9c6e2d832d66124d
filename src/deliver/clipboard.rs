//! System clipboard access.
//!
//! [`ClipboardWriter`] is the seam between the pipeline and the OS
//! clipboard.  [`SystemClipboard`] opens a fresh `arboard` handle per call;
//! holding one open keeps display-server resources pinned for the life of
//! the process on some platforms.

use thiserror::Error;

/// Delivery errors.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The OS clipboard could not be opened or written.
    #[error("clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    /// Refused to overwrite the clipboard with an empty string.
    #[error("refusing to copy empty text to the clipboard")]
    EmptyText,

    /// A re-copy was requested before any pipeline run completed.
    #[error("no transcription result to copy yet")]
    NothingToDeliver,
}

/// Interface for clipboard backends.
pub trait ClipboardWriter: Send + Sync {
    /// Replace the clipboard contents with `text`.
    fn set_text(&self, text: &str) -> Result<(), DeliveryError>;

    /// Current clipboard contents, if readable as text.
    fn get_text(&self) -> Result<String, DeliveryError>;

    /// Probe whether the clipboard can be opened at all, e.g. at startup.
    /// Deliveries still handle per-write failures; this only warns early.
    fn is_available(&self) -> bool;
}

// ---------------------------------------------------------------------------
// SystemClipboard
// ---------------------------------------------------------------------------

/// Production backend over `arboard`.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardWriter for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), DeliveryError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| DeliveryError::ClipboardUnavailable(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| DeliveryError::ClipboardUnavailable(e.to_string()))
    }

    fn get_text(&self) -> Result<String, DeliveryError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| DeliveryError::ClipboardUnavailable(e.to_string()))?;
        clipboard
            .get_text()
            .map_err(|e| DeliveryError::ClipboardUnavailable(e.to_string()))
    }

    fn is_available(&self) -> bool {
        // Opening a handle is the whole probe; it is discarded immediately.
        arboard::Clipboard::new().is_ok()
    }
}

// ---------------------------------------------------------------------------
// MemoryClipboard  (test-only)
// ---------------------------------------------------------------------------

/// In-process clipboard for tests; no display server needed.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: std::sync::Mutex<Option<String>>,
    fail_writes: bool,
}

#[cfg(test)]
impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose writes always fail, as when no display is attached.
    pub fn failing() -> Self {
        Self {
            contents: std::sync::Mutex::new(None),
            fail_writes: true,
        }
    }
}

#[cfg(test)]
impl ClipboardWriter for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<(), DeliveryError> {
        if self.fail_writes {
            return Err(DeliveryError::ClipboardUnavailable(
                "no display server".into(),
            ));
        }
        *self.contents.lock().unwrap() = Some(text.to_string());
        Ok(())
    }

    fn get_text(&self) -> Result<String, DeliveryError> {
        self.contents
            .lock()
            .unwrap()
            .clone()
            .ok_or(DeliveryError::NothingToDeliver)
    }

    fn is_available(&self) -> bool {
        !self.fail_writes
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clipboard_round_trips_text() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_text("copied text").unwrap();
        assert_eq!(clipboard.get_text().unwrap(), "copied text");
    }

    #[test]
    fn memory_clipboard_overwrites_previous_contents() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_text("first").unwrap();
        clipboard.set_text("second").unwrap();
        assert_eq!(clipboard.get_text().unwrap(), "second");
    }

    #[test]
    fn failing_clipboard_reports_unavailable() {
        let clipboard = MemoryClipboard::failing();
        assert!(matches!(
            clipboard.set_text("text").unwrap_err(),
            DeliveryError::ClipboardUnavailable(_)
        ));
    }

    #[test]
    fn availability_probe_tracks_the_backend() {
        assert!(MemoryClipboard::new().is_available());
        assert!(!MemoryClipboard::failing().is_available());
    }
}
