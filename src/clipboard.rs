//! Clipboard snapshot via arboard.

use tracing::{debug, warn};

/// Returns the current clipboard text, if any.
pub trait ClipboardReader {
    fn read_text(&mut self) -> Option<String>;
}

/// System clipboard. Errors are logged and read as "no text".
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Option<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(c) => self.clipboard = Some(c),
                Err(e) => {
                    warn!("Failed to open clipboard: {e}");
                    return None;
                }
            }
        }
        self.clipboard.as_mut()
    }
}

impl ClipboardReader for SystemClipboard {
    fn read_text(&mut self) -> Option<String> {
        let clipboard = self.handle()?;
        match clipboard.get_text() {
            Ok(text) => {
                debug!("Clipboard snapshot: {} chars", text.len());
                Some(text)
            }
            Err(arboard::Error::ContentNotAvailable) => {
                debug!("Clipboard holds no text");
                None
            }
            Err(e) => {
                warn!("Failed to read clipboard: {e}");
                // Reopen next time, the connection may have gone stale.
                self.clipboard = None;
                None
            }
        }
    }
}

/// Test double: fixed clipboard contents, swappable between reads.
#[derive(Debug, Clone, Default)]
pub struct StaticClipboard {
    pub text: Option<String>,
}

impl StaticClipboard {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }
}

impl ClipboardReader for StaticClipboard {
    fn read_text(&mut self) -> Option<String> {
        self.text.clone()
    }
}
