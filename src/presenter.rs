//! What the reader shows, and the surfaces that show it.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};

use crate::rsvp::split_at_fixation;

/// Directive for the presentation surface. Recomputed on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Hidden,
    /// Open, waiting for Space.
    Ready { speed_wpm: u32, word_count: usize },
    WordFrame { word: String, fixation: usize },
    SummaryFrame { lines: Vec<String>, loading: bool },
}

pub trait Presenter {
    fn render(&mut self, event: &DisplayEvent) -> io::Result<()>;
}

/// Draws frames in place on a terminal.
pub struct TerminalPresenter<W: Write> {
    out: W,
    drawn_lines: u16,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, drawn_lines: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn clear_previous(&mut self) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        for _ in 1..self.drawn_lines {
            queue!(self.out, MoveUp(1), Clear(ClearType::CurrentLine))?;
        }
        self.drawn_lines = 0;
        Ok(())
    }

    fn line(&mut self, first: &mut bool) -> io::Result<()> {
        if !*first {
            queue!(self.out, Print("\r\n"))?;
        }
        *first = false;
        self.drawn_lines += 1;
        Ok(())
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render(&mut self, event: &DisplayEvent) -> io::Result<()> {
        self.clear_previous()?;
        let mut first = true;

        match event {
            DisplayEvent::Hidden => {}
            DisplayEvent::Ready {
                speed_wpm,
                word_count,
            } => {
                self.line(&mut first)?;
                queue!(
                    self.out,
                    Print(format!(
                        "{word_count} words @ {speed_wpm} wpm  [Space] read  [Shift+Space] summary  [↑/↓] speed"
                    ))
                )?;
            }
            DisplayEvent::WordFrame { word, fixation } => {
                let (before, pivot, after) = split_at_fixation(word, *fixation);
                self.line(&mut first)?;
                queue!(
                    self.out,
                    Print(before),
                    Print(pivot.red().bold()),
                    Print(after)
                )?;
            }
            DisplayEvent::SummaryFrame { lines, loading } => {
                if *loading {
                    self.line(&mut first)?;
                    queue!(self.out, Print("Summarizing…".italic()))?;
                }
                for bullet in lines {
                    self.line(&mut first)?;
                    queue!(self.out, Print(format!("• {bullet}")))?;
                }
                self.line(&mut first)?;
                queue!(self.out, Print("[Enter] close".dim()))?;
            }
        }

        self.out.flush()
    }
}

/// Test double: keeps every rendered frame instead of drawing it. Clones
/// share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    frames: Arc<Mutex<Vec<DisplayEvent>>>,
}

impl RecordingPresenter {
    pub fn frames(&self) -> Vec<DisplayEvent> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, event: &DisplayEvent) -> io::Result<()> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_to_string(event: &DisplayEvent) -> String {
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.render(event).unwrap();
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn word_frame_highlights_the_pivot_in_place() {
        let out = render_to_string(&DisplayEvent::WordFrame {
            word: "reading".into(),
            fixation: 1,
        });
        let pivot = format!("{}", "e".red().bold());
        assert!(out.contains(&format!("r{pivot}ading")), "{out:?}");
        assert!(!out.contains(&format!("{}", "r".red().bold())));
    }

    #[test]
    fn summary_frame_lists_bullets_and_loading_line() {
        let loading = render_to_string(&DisplayEvent::SummaryFrame {
            lines: vec![],
            loading: true,
        });
        assert!(loading.contains("Summarizing"));

        let ready = render_to_string(&DisplayEvent::SummaryFrame {
            lines: vec!["first point".into(), "second point".into()],
            loading: false,
        });
        assert!(ready.contains("• first point"));
        assert!(ready.contains("• second point"));
        assert!(!ready.contains("Summarizing"));
    }

    #[test]
    fn ready_frame_shows_speed() {
        let out = render_to_string(&DisplayEvent::Ready {
            speed_wpm: 400,
            word_count: 2,
        });
        assert!(out.contains("2 words @ 400 wpm"));
    }

    #[test]
    fn recording_presenter_shares_frames_across_clones() {
        let recorder = RecordingPresenter::default();
        let mut handle = recorder.clone();
        handle.render(&DisplayEvent::Hidden).unwrap();
        assert_eq!(recorder.frames(), vec![DisplayEvent::Hidden]);
    }
}
