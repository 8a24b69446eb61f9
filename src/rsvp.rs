//! Rapid serial visual presentation: tokenizing, pacing and word stepping.
//!
//! Everything here is a pure function of its inputs. The only moving part is
//! the cursor, and that lives in the [`Session`] owned by the controller.

use std::time::Duration;

/// Fraction of a word's length where the eye should land.
const FIXATION_RATIO: f64 = 0.35;

/// One activation's worth of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    raw_text: String,
    words: Vec<String>,
    cursor: usize,
    pub speed_wpm: u32,
}

impl Session {
    /// Returns `None` when the text has no words to read.
    pub fn new(raw_text: String, speed_wpm: u32) -> Option<Self> {
        let words = tokenize(&raw_text);
        if words.is_empty() {
            return None;
        }
        Some(Self {
            raw_text,
            words,
            cursor: 0,
            speed_wpm: speed_wpm.max(1),
        })
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor == self.words.len()
    }
}

/// A word ready to show, with the char index to highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordStep {
    pub word: String,
    pub fixation: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Word(WordStep),
    End,
}

/// Split on runs of whitespace. Blank input gives an empty list.
pub fn tokenize(raw_text: &str) -> Vec<String> {
    raw_text.split_whitespace().map(str::to_owned).collect()
}

/// Fastest speed whose interval is still a whole millisecond.
pub const MAX_WPM: u32 = 60_000;

/// Milliseconds each word stays on screen at `speed_wpm`. Never zero.
pub fn interval_ms(speed_wpm: u32) -> u64 {
    ((60_000.0 / f64::from(speed_wpm.max(1))).round() as u64).max(1)
}

pub fn interval(speed_wpm: u32) -> Duration {
    Duration::from_millis(interval_ms(speed_wpm))
}

/// Char index of the optimal recognition point.
pub fn fixation_index(word: &str) -> usize {
    let len = word.chars().count();
    if len <= 1 {
        return 0;
    }
    ((len as f64 * FIXATION_RATIO).round() as usize).saturating_sub(1)
}

/// Emit the word under the cursor and step past it.
pub fn advance(session: &mut Session) -> Advance {
    let Some(word) = session.words.get(session.cursor) else {
        return Advance::End;
    };
    let step = WordStep {
        word: word.clone(),
        fixation: fixation_index(word),
    };
    session.cursor += 1;
    Advance::Word(step)
}

/// Split a word around its fixation char: `(before, pivot, after)`.
pub fn split_at_fixation(word: &str, fixation: usize) -> (&str, &str, &str) {
    let mut indices = word.char_indices().skip(fixation);
    let Some((start, _)) = indices.next() else {
        return (word, "", "");
    };
    let end = indices.next().map(|(i, _)| i).unwrap_or(word.len());
    (&word[..start], &word[start..end], &word[end..])
}
