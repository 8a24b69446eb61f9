//! Session controller: the reader's state machine.
//!
//! CLOSED → OPEN_IDLE → PLAYING → SHOWING_SUMMARY → CLOSED
//!
//! All transitions run on the service's single control loop. The controller
//! never blocks: playback ticks and summary completions are delivered to it
//! as events, and it answers each event with the frame to draw, if any.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clipboard::ClipboardReader;
use crate::config::ReaderConfig;
use crate::hotkey::ReaderKey;
use crate::presenter::DisplayEvent;
use crate::rsvp::{self, Advance, Session};
use crate::settings::SettingsStore;
use crate::summarizer::{Summarizer, SummaryHandle, SummaryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Closed,
    OpenIdle,
    Playing,
    ShowingSummary,
}

impl std::fmt::Display for ReaderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::OpenIdle => write!(f, "OPEN_IDLE"),
            Self::Playing => write!(f, "PLAYING"),
            Self::ShowingSummary => write!(f, "SHOWING_SUMMARY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedLimits {
    pub min_wpm: u32,
    pub max_wpm: u32,
    pub step: u32,
}

impl From<&ReaderConfig> for SpeedLimits {
    fn from(config: &ReaderConfig) -> Self {
        let min_wpm = config.min_wpm.clamp(1, rsvp::MAX_WPM);
        Self {
            min_wpm,
            max_wpm: config.max_wpm.clamp(min_wpm, rsvp::MAX_WPM),
            step: config.speed_step.max(1),
        }
    }
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self::from(&ReaderConfig::default())
    }
}

pub struct SessionController<C, S> {
    clipboard: C,
    settings: S,
    summarizer: Summarizer,
    limits: SpeedLimits,
    state: ReaderState,
    session: Option<Session>,
    summary: Option<SummaryHandle>,
    /// Fixed when playback starts; cleared when leaving PLAYING.
    run_interval: Option<Duration>,
}

impl<C: ClipboardReader, S: SettingsStore> SessionController<C, S> {
    pub fn new(clipboard: C, settings: S, summarizer: Summarizer, limits: SpeedLimits) -> Self {
        Self {
            clipboard,
            settings,
            summarizer,
            limits,
            state: ReaderState::Closed,
            session: None,
            summary: None,
            run_interval: None,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn summary(&self) -> Option<&SummaryHandle> {
        self.summary.as_ref()
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn clipboard_mut(&mut self) -> &mut C {
        &mut self.clipboard
    }

    /// Tick period of the current playback run, `None` unless PLAYING.
    pub fn playback_interval(&self) -> Option<Duration> {
        match self.state {
            ReaderState::Playing => self.run_interval,
            _ => None,
        }
    }

    /// The frame that matches the current state.
    pub fn display(&self) -> DisplayEvent {
        match (self.state, &self.session) {
            (ReaderState::Closed, _) | (_, None) => DisplayEvent::Hidden,
            (ReaderState::OpenIdle, Some(session)) => ready_frame(session),
            (ReaderState::Playing, Some(session)) => match session.cursor().checked_sub(1) {
                Some(shown) => {
                    let word = session.words()[shown].clone();
                    let fixation = rsvp::fixation_index(&word);
                    DisplayEvent::WordFrame { word, fixation }
                }
                None => ready_frame(session),
            },
            (ReaderState::ShowingSummary, Some(_)) => self.summary_frame(),
        }
    }

    /// Apply one key press. Returns the new frame when the display changes.
    pub fn handle_key(&mut self, key: ReaderKey) -> Option<DisplayEvent> {
        match (self.state, key) {
            (ReaderState::Closed, ReaderKey::Activate) => self.activate(),
            (ReaderState::Closed, _) => None,
            (_, ReaderKey::Activate) => Some(self.close()),
            (ReaderState::OpenIdle, ReaderKey::Space) => {
                self.start_playback();
                None
            }
            (ReaderState::OpenIdle, ReaderKey::ShiftSpace) => {
                self.transition(ReaderState::ShowingSummary);
                Some(self.summary_frame())
            }
            (ReaderState::OpenIdle, ReaderKey::SpeedUp) => self.adjust_speed(true),
            (ReaderState::OpenIdle, ReaderKey::SpeedDown) => self.adjust_speed(false),
            (ReaderState::ShowingSummary, ReaderKey::Enter | ReaderKey::Space) => {
                Some(self.close())
            }
            (state, key) => {
                debug!("Ignoring {key:?} in {state}");
                None
            }
        }
    }

    /// One playback timer tick.
    pub fn tick(&mut self) -> Option<DisplayEvent> {
        if self.state != ReaderState::Playing {
            debug!("Stray tick in {}", self.state);
            return None;
        }
        let session = self.session.as_mut()?;

        match rsvp::advance(session) {
            Advance::Word(step) => {
                debug!("Word {}/{}: {}", session.cursor(), session.words().len(), step.word);
                Some(DisplayEvent::WordFrame {
                    word: step.word,
                    fixation: step.fixation,
                })
            }
            Advance::End => {
                info!("Playback complete ({} words)", session.words().len());
                self.transition(ReaderState::ShowingSummary);
                Some(self.summary_frame())
            }
        }
    }

    /// A summary task settled. Results for any handle but the current one
    /// are dropped.
    pub fn on_summary_settled(&mut self, id: SummaryId) -> Option<DisplayEvent> {
        let current = self.summary.as_ref().map(SummaryHandle::id);
        if current != Some(id) {
            debug!("Discarding summary #{id} (current: {current:?})");
            return None;
        }
        match self.state {
            ReaderState::ShowingSummary => Some(self.summary_frame()),
            _ => None,
        }
    }

    fn activate(&mut self) -> Option<DisplayEvent> {
        let text = self.clipboard.read_text().unwrap_or_default();
        if text.split_whitespace().next().is_none() {
            info!("Clipboard has nothing to read, staying CLOSED");
            return None;
        }

        let stored = self.settings.load();
        let speed_wpm = stored.clamp(self.limits.min_wpm, self.limits.max_wpm);
        if speed_wpm != stored {
            warn!(
                "Stored speed {stored} wpm is outside {}–{} wpm, using {speed_wpm}",
                self.limits.min_wpm, self.limits.max_wpm
            );
        }
        let session = Session::new(text, speed_wpm)?;
        info!(
            "Captured {} words, reading at {} wpm",
            session.words().len(),
            session.speed_wpm
        );

        if let Some(mut stale) = self.summary.take() {
            self.summarizer.cancel(&mut stale);
        }
        self.summary = Some(self.summarizer.start(session.raw_text()));

        let frame = ready_frame(&session);
        self.session = Some(session);
        self.transition(ReaderState::OpenIdle);
        Some(frame)
    }

    fn close(&mut self) -> DisplayEvent {
        if let Some(mut handle) = self.summary.take() {
            self.summarizer.cancel(&mut handle);
        }
        self.session = None;
        self.transition(ReaderState::Closed);
        DisplayEvent::Hidden
    }

    fn start_playback(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let interval = rsvp::interval(session.speed_wpm);
        info!("Playback at {} wpm ({}ms per word)", session.speed_wpm, interval.as_millis());
        self.run_interval = Some(interval);
        self.transition(ReaderState::Playing);
    }

    fn adjust_speed(&mut self, faster: bool) -> Option<DisplayEvent> {
        let session = self.session.as_mut()?;
        let current = session.speed_wpm;
        let next = if faster {
            current.saturating_add(self.limits.step)
        } else {
            current.saturating_sub(self.limits.step)
        }
        .clamp(self.limits.min_wpm, self.limits.max_wpm);

        if next == current {
            return None;
        }
        session.speed_wpm = next;
        self.settings.save(next);
        info!("Speed: {current} → {next} wpm");
        Some(ready_frame(session))
    }

    fn transition(&mut self, next: ReaderState) {
        if next != ReaderState::Playing {
            self.run_interval = None;
        }
        info!("State: {} → {}", self.state, next);
        self.state = next;
    }

    fn summary_frame(&self) -> DisplayEvent {
        let Some(handle) = &self.summary else {
            return DisplayEvent::SummaryFrame {
                lines: vec!["Summary unavailable".into()],
                loading: false,
            };
        };
        match handle.result() {
            None => DisplayEvent::SummaryFrame {
                lines: Vec::new(),
                loading: true,
            },
            Some(Ok(bullets)) => DisplayEvent::SummaryFrame {
                lines: bullets,
                loading: false,
            },
            Some(Err(reason)) => DisplayEvent::SummaryFrame {
                lines: vec![format!("Summary unavailable: {reason}")],
                loading: false,
            },
        }
    }
}

fn ready_frame(session: &Session) -> DisplayEvent {
    DisplayEvent::Ready {
        speed_wpm: session.speed_wpm,
        word_count: session.words().len(),
    }
}
