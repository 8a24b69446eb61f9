//! Desktop notifications via notify-rust (D-Bus).

use notify_rust::{Notification, Timeout};
use tracing::{debug, warn};

const APP_NAME: &str = "speed-reader-rs";

/// Short desktop toasts for events that have no frame of their own.
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Activation found no words on the clipboard.
    pub fn nothing_to_read(&self) {
        self.show("Nothing to read", "Copy some text, then press the activation key again.");
    }

    fn show(&self, summary: &str, body: &str) {
        if !self.enabled {
            debug!("Notification suppressed: {summary}");
            return;
        }

        if let Err(e) = Notification::new()
            .appname(APP_NAME)
            .summary(summary)
            .body(body)
            .icon("accessories-text-editor")
            .timeout(Timeout::Milliseconds(2500))
            .show()
        {
            warn!("Failed to show notification: {e}");
        }
    }
}
