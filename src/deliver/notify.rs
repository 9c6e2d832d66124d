//! User-facing notifications as values.
//!
//! The pipeline never talks to a notification daemon directly; it hands a
//! [`Notification`] to whatever [`Notifier`] the binary installed.  The
//! default [`LogNotifier`] writes through the logger, which keeps the core
//! usable headless and in tests.

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A pipeline run completed and text is on the clipboard.
    Success,
    /// A pipeline run failed; the clipboard is untouched.
    Error,
    /// Status information, e.g. recording started.
    Info,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
        }
    }
}

/// Sink for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Routes notifications through the logger at a level matching their kind.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.kind {
            NotificationKind::Success | NotificationKind::Info => {
                log::info!("{}: {}", n.title, n.message);
            }
            NotificationKind::Error => {
                log::error!("{}: {}", n.title, n.message);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier  (test-only)
// ---------------------------------------------------------------------------

/// Captures every notification for later assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
