/// Clipboard sink collaborator
///
/// CLIPBOARD nodes hand their serialized input to whatever sink the host
/// wires in. Writes may fail (permission-restricted environments); that
/// failure is recoverable: the run records it and continues.

use std::sync::Mutex;
use thiserror::Error;

/// Failure writing to the clipboard sink
#[derive(Debug, Error)]
#[error("Clipboard write failed: {0}")]
pub struct ClipboardError(pub String);

/// Destination for CLIPBOARD node output
pub trait ClipboardSink: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// In-process clipboard slot
///
/// A headless backend has no system clipboard; this sink keeps the last
/// written text so the editor can read it back.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    slot: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently written text, if any
    pub fn last(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl ClipboardSink for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ClipboardError("clipboard slot poisoned".to_string()))?;
        *slot = Some(text.to_string());
        Ok(())
    }
}

/// Sink that always refuses, modeling permission-denied environments
#[derive(Debug, Default)]
pub struct DeniedClipboard;

impl ClipboardSink for DeniedClipboard {
    fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError("permission denied".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clipboard_keeps_last_write() {
        let clipboard = MemoryClipboard::new();
        assert!(clipboard.last().is_none());
        clipboard.write_text("first").unwrap();
        clipboard.write_text("second").unwrap();
        assert_eq!(clipboard.last().as_deref(), Some("second"));
    }

    #[test]
    fn denied_clipboard_always_fails() {
        assert!(DeniedClipboard.write_text("anything").is_err());
    }
}
