//! Main service loop.
//!
//! One task owns the controller and serializes every event it sees: key
//! presses, settled summaries and playback ticks. The playback timer exists
//! only while the controller is PLAYING, so a cancelled run can never tick.

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clipboard::ClipboardReader;
use crate::controller::{ReaderState, SessionController};
use crate::hotkey::{HotkeySource, ReaderKey};
use crate::notifier::Notifier;
use crate::presenter::{DisplayEvent, Presenter};
use crate::settings::SettingsStore;
use crate::summarizer::SummaryId;

pub struct ReaderService<C, S, P> {
    controller: SessionController<C, S>,
    presenter: P,
    notifier: Notifier,
    settled_rx: mpsc::UnboundedReceiver<SummaryId>,
}

impl<C, S, P> ReaderService<C, S, P>
where
    C: ClipboardReader,
    S: SettingsStore,
    P: Presenter,
{
    pub fn new(
        controller: SessionController<C, S>,
        presenter: P,
        notifier: Notifier,
        settled_rx: mpsc::UnboundedReceiver<SummaryId>,
    ) -> Self {
        Self {
            controller,
            presenter,
            notifier,
            settled_rx,
        }
    }

    pub fn controller(&self) -> &SessionController<C, S> {
        &self.controller
    }

    /// Process events until `hotkeys` stops producing keys.
    pub async fn run<H: HotkeySource>(&mut self, hotkeys: H) {
        let (key_tx, mut key_rx) = mpsc::channel::<ReaderKey>(16);
        tokio::spawn(hotkeys.run(key_tx));

        info!("Reader ready — copy some text and press the activation key");

        let mut playback: Option<Interval> = None;

        loop {
            tokio::select! {
                key = key_rx.recv() => {
                    match key {
                        Some(key) => self.on_key(key),
                        None => {
                            warn!("Key channel closed");
                            break;
                        }
                    }
                }
                Some(id) = self.settled_rx.recv() => {
                    if let Some(frame) = self.controller.on_summary_settled(id) {
                        self.render(&frame);
                    }
                }
                _ = next_tick(&mut playback) => {
                    if let Some(frame) = self.controller.tick() {
                        self.render(&frame);
                    }
                }
            }

            self.sync_timer(&mut playback);
        }

        self.shutdown();
    }

    fn on_key(&mut self, key: ReaderKey) {
        let was_closed = self.controller.state() == ReaderState::Closed;
        let frame = self.controller.handle_key(key);

        if key == ReaderKey::Activate && was_closed && self.controller.state() == ReaderState::Closed {
            self.notifier.nothing_to_read();
        }
        if let Some(frame) = frame {
            self.render(&frame);
        }
    }

    /// Start or drop the playback timer to match the controller.
    fn sync_timer(&self, playback: &mut Option<Interval>) {
        match (self.controller.playback_interval(), playback.is_some()) {
            (Some(period), false) => {
                let mut timer = tokio::time::interval(period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                *playback = Some(timer);
                debug!("Playback timer started ({}ms)", period.as_millis());
            }
            (None, true) => {
                *playback = None;
                debug!("Playback timer cancelled");
            }
            _ => {}
        }
    }

    fn shutdown(&mut self) {
        if self.controller.state() != ReaderState::Closed {
            info!("Closing open session on shutdown");
            if let Some(frame) = self.controller.handle_key(ReaderKey::Activate) {
                self.render(&frame);
            }
        }
    }

    fn render(&mut self, frame: &DisplayEvent) {
        if let Err(e) = self.presenter.render(frame) {
            warn!("Failed to render frame: {e}");
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
