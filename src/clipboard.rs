//! Clipboard access.
//!
//! The view model writes through the [`ClipboardSink`] trait so sessions
//! without a display (and tests) can swap in [`MemoryClipboard`].

use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    /// No clipboard could be opened (no display server, sandbox, ...).
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Write(String),
}

/// Synchronous clipboard write: succeeds or fails observably.
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard via `arboard`.
///
/// The handle is opened on first use and kept for the session; on X11 the
/// clipboard contents live only as long as the owning handle.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.inner.is_none() {
            let opened = arboard::Clipboard::new()
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            self.inner = Some(opened);
        }
        let Some(clipboard) = self.inner.as_mut() else {
            return Err(ClipboardError::Unavailable("not initialized".to_string()));
        };
        clipboard
            .set_text(text.to_owned())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

/// In-process clipboard. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
    fail: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose every write fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Last text written, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ClipboardSink for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError::Unavailable("no clipboard".to_string()));
        }
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| ClipboardError::Write("clipboard lock poisoned".to_string()))?;
        *guard = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard_shares_contents() {
        let clipboard = MemoryClipboard::new();
        let mut sink = clipboard.clone();
        assert_eq!(clipboard.contents(), None);

        sink.set_text("https://x.com").unwrap();
        assert_eq!(clipboard.contents().as_deref(), Some("https://x.com"));
    }

    #[test]
    fn test_failing_clipboard() {
        let mut sink = MemoryClipboard::failing();
        assert!(matches!(
            sink.set_text("x"),
            Err(ClipboardError::Unavailable(_))
        ));
        assert_eq!(sink.contents(), None);
    }
}
