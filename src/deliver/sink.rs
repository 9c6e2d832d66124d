//! Terminal stage of the pipeline: clipboard write, last-result memory,
//! and user notification.
//!
//! [`ResultSink`] owns the rule that the remembered last result only
//! advances on a successful clipboard write; a failed delivery leaves the
//! previous result intact so `redeliver_last` still works.

use std::sync::{Arc, Mutex};

use crate::config::ClipboardConfig;
use crate::deliver::clipboard::{ClipboardWriter, DeliveryError};
use crate::deliver::notify::{Notification, NotificationKind, Notifier};
use crate::improve::{ImprovedResult, Provenance};

/// Delivers finished results and remembers the most recent one.
pub struct ResultSink {
    clipboard: Arc<dyn ClipboardWriter>,
    notifier: Arc<dyn Notifier>,
    config: ClipboardConfig,
    last: Mutex<Option<ImprovedResult>>,
}

impl ResultSink {
    pub fn new(
        clipboard: Arc<dyn ClipboardWriter>,
        notifier: Arc<dyn Notifier>,
        config: ClipboardConfig,
    ) -> Self {
        Self {
            clipboard,
            notifier,
            config,
            last: Mutex::new(None),
        }
    }

    /// Copy `result` to the clipboard, remember it, and notify the user.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::EmptyText`] for whitespace-only text; the
    ///   clipboard and the remembered result are untouched.
    /// - [`DeliveryError::ClipboardUnavailable`] when the write fails; the
    ///   remembered result is untouched.
    ///
    /// Every failure sends an error notification.
    pub fn deliver(&self, result: ImprovedResult) -> Result<(), DeliveryError> {
        if result.text.trim().is_empty() {
            self.send(
                NotificationKind::Error,
                "Nothing to copy: the transcript is empty".to_string(),
            );
            return Err(DeliveryError::EmptyText);
        }

        if let Err(e) = self.clipboard.set_text(&result.text) {
            self.send(NotificationKind::Error, format!("Clipboard error: {e}"));
            return Err(e);
        }

        let message = match result.provenance {
            Provenance::Improved => "Improved text copied to clipboard".to_string(),
            Provenance::Fallback => "Raw transcription copied to clipboard".to_string(),
        };
        *self.lock_last() = Some(result);
        self.send(NotificationKind::Success, message);
        Ok(())
    }

    /// Copy the most recently delivered result to the clipboard again.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::NothingToDeliver`] when no run has completed yet.
    pub fn redeliver_last(&self) -> Result<(), DeliveryError> {
        let result = self
            .lock_last()
            .clone()
            .ok_or(DeliveryError::NothingToDeliver)?;

        self.clipboard.set_text(&result.text).map_err(|e| {
            self.send(NotificationKind::Error, format!("Clipboard error: {e}"));
            e
        })?;
        self.send(
            NotificationKind::Success,
            "Last result copied to clipboard".to_string(),
        );
        Ok(())
    }

    /// The most recently delivered result, if any.
    pub fn last_result(&self) -> Option<ImprovedResult> {
        self.lock_last().clone()
    }

    /// Notify the user of a failed pipeline run.  The remembered last
    /// result is untouched.
    pub fn report_failure(&self, message: impl Into<String>) {
        self.send(NotificationKind::Error, message.into());
    }

    fn send(&self, kind: NotificationKind, message: String) {
        if !self.config.notifications {
            return;
        }
        self.notifier
            .notify(Notification::new(self.config.title.clone(), message, kind));
    }

    fn lock_last(&self) -> std::sync::MutexGuard<'_, Option<ImprovedResult>> {
        self.last.lock().unwrap_or_else(|p| p.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliver::clipboard::MemoryClipboard;
    use crate::deliver::notify::RecordingNotifier;

    fn sink_with(
        clipboard: MemoryClipboard,
    ) -> (ResultSink, Arc<MemoryClipboard>, Arc<RecordingNotifier>) {
        let clipboard = Arc::new(clipboard);
        let notifier = Arc::new(RecordingNotifier::new());
        let sink = ResultSink::new(
            clipboard.clone(),
            notifier.clone(),
            ClipboardConfig::default(),
        );
        (sink, clipboard, notifier)
    }

    #[test]
    fn deliver_copies_remembers_and_notifies() {
        let (sink, clipboard, notifier) = sink_with(MemoryClipboard::new());

        sink.deliver(ImprovedResult::improved("Polished text.")).unwrap();

        assert_eq!(clipboard.get_text().unwrap(), "Polished text.");
        assert_eq!(sink.last_result().unwrap().text, "Polished text.");
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Success);
        assert!(sent[0].message.contains("Improved"));
    }

    #[test]
    fn fallback_delivery_is_worded_as_raw() {
        let (sink, _clipboard, notifier) = sink_with(MemoryClipboard::new());

        sink.deliver(ImprovedResult::fallback("raw words")).unwrap();

        assert!(notifier.sent()[0].message.contains("Raw transcription"));
    }

    #[test]
    fn empty_text_is_rejected_with_an_error_notification() {
        let (sink, clipboard, notifier) = sink_with(MemoryClipboard::new());

        let err = sink.deliver(ImprovedResult::improved("   ")).unwrap_err();

        assert!(matches!(err, DeliveryError::EmptyText));
        assert!(clipboard.get_text().is_err());
        assert!(sink.last_result().is_none());
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Error);
    }

    #[test]
    fn failed_write_keeps_previous_last_result() {
        let (sink, _clipboard, notifier) = sink_with(MemoryClipboard::failing());

        let err = sink.deliver(ImprovedResult::improved("text")).unwrap_err();

        assert!(matches!(err, DeliveryError::ClipboardUnavailable(_)));
        assert!(sink.last_result().is_none());
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Error);
    }

    #[test]
    fn redeliver_before_any_delivery_fails() {
        let (sink, _clipboard, _notifier) = sink_with(MemoryClipboard::new());

        assert!(matches!(
            sink.redeliver_last().unwrap_err(),
            DeliveryError::NothingToDeliver
        ));
    }

    #[test]
    fn redeliver_copies_the_remembered_text_again() {
        let (sink, clipboard, _notifier) = sink_with(MemoryClipboard::new());

        sink.deliver(ImprovedResult::improved("remembered")).unwrap();
        clipboard.set_text("overwritten by another app").unwrap();
        sink.redeliver_last().unwrap();

        assert_eq!(clipboard.get_text().unwrap(), "remembered");
    }

    #[test]
    fn notifications_respect_the_config_switch() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let config = ClipboardConfig {
            notifications: false,
            ..ClipboardConfig::default()
        };
        let sink = ResultSink::new(clipboard, notifier.clone(), config);

        sink.deliver(ImprovedResult::improved("quiet")).unwrap();

        assert!(notifier.sent().is_empty());
    }
}
