//! Result delivery subsystem: clipboard, notifications, last-result memory.

pub mod clipboard;
pub mod notify;
pub mod sink;

pub use clipboard::{ClipboardWriter, DeliveryError, SystemClipboard};
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier};
pub use sink::ResultSink;

#[cfg(test)]
pub use clipboard::MemoryClipboard;
#[cfg(test)]
pub use notify::RecordingNotifier;
