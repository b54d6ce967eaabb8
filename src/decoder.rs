//! Received-Morse decoder.
//!
//! Consumes timed key edges, classifies the spans between them with the
//! adaptive [`TimingClassifier`], accumulates `.`/`-` patterns, and emits
//! decoded characters into a bounded, timestamped text queue.
//!
//! ```text
//! key edges ──▶ classifier ──▶ pattern buffer ──▶ decode table ──▶ text
//! ```
//!
//! The decoder sits behind a best-effort consumer: it may miss samples,
//! so every span is re-measured from the edges it actually observed.

use heapless::{Deque, Vec};

use crate::classifier::{ElementClass, TimingClassifier};
use crate::morse;

/// Maximum pattern length; longer input flushes as `?`.
const MAX_PATTERN: usize = 8;

/// Decoded characters retained before the oldest is dropped.
const TEXT_CAPACITY: usize = 64;

/// A decoded character and when its closing gap was observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedChar {
    pub ch: char,
    pub at_us: i64,
}

/// Receive state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RxState {
    /// Nothing heard yet (or line went quiet past a word gap).
    Idle,
    /// Key is down; timing a mark.
    Mark,
    /// Key is up; timing a space.
    Space,
}

/// Edge-timed Morse decoder.
pub struct MorseDecoder {
    state: RxState,
    last_edge_us: i64,
    pattern: Vec<u8, MAX_PATTERN>,
    classifier: TimingClassifier,
    text: Deque<DecodedChar, TEXT_CAPACITY>,
    /// Suppresses duplicate word spaces.
    last_was_space: bool,
}

impl Default for MorseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MorseDecoder {
    pub fn new() -> Self {
        Self {
            state: RxState::Idle,
            last_edge_us: 0,
            pattern: Vec::new(),
            classifier: TimingClassifier::new(),
            text: Deque::new(),
            last_was_space: true,
        }
    }

    /// Feed one key edge.
    ///
    /// `key_down` is the line state AFTER the edge; `now_us` its timestamp.
    /// Repeated edges in the same direction are ignored.
    pub fn on_edge(&mut self, now_us: i64, key_down: bool) {
        match (self.state, key_down) {
            (RxState::Idle, true) => {
                self.state = RxState::Mark;
                self.last_edge_us = now_us;
            }
            (RxState::Idle, false) => {}

            (RxState::Mark, false) => {
                let duration = (now_us - self.last_edge_us).max(0) as u32;
                match self.classifier.classify(duration, true) {
                    ElementClass::Dit => self.push_symbol(b'.', now_us),
                    ElementClass::Dah => self.push_symbol(b'-', now_us),
                    // Bounce or dead air: not an element
                    _ => {}
                }
                self.state = RxState::Space;
                self.last_edge_us = now_us;
            }
            (RxState::Mark, true) => {}

            (RxState::Space, true) => {
                let duration = (now_us - self.last_edge_us).max(0) as u32;
                self.handle_space(duration, now_us);
                self.state = RxState::Mark;
                self.last_edge_us = now_us;
            }
            (RxState::Space, false) => {}
        }
    }

    /// Time-driven flush for a line that went quiet without another edge.
    ///
    /// Call periodically from the consuming task; the trailing character
    /// of a transmission has no closing edge to trigger its gap.
    pub fn poll_space(&mut self, now_us: i64) {
        if self.state != RxState::Space {
            return;
        }
        let duration = (now_us - self.last_edge_us).max(0) as u32;
        match self.classifier.classify(duration, false) {
            ElementClass::CharGap => self.flush_pattern(now_us),
            ElementClass::WordGap => {
                self.flush_pattern(now_us);
                self.push_word_space(now_us);
                self.state = RxState::Idle;
            }
            // Still inside the character, or implausibly long (dead air
            // already flushed on the way past WordGap)
            _ => {
                if duration > 5_000_000 {
                    self.flush_pattern(now_us);
                    self.push_word_space(now_us);
                    self.state = RxState::Idle;
                }
            }
        }
    }

    /// Pop the oldest decoded character.
    pub fn pop(&mut self) -> Option<DecodedChar> {
        self.text.pop_front()
    }

    /// Decoded characters waiting to be popped.
    pub fn pending(&self) -> usize {
        self.text.len()
    }

    /// Current speed estimate from the embedded classifier.
    pub fn wpm(&self) -> u32 {
        self.classifier.wpm()
    }

    pub fn classifier(&self) -> &TimingClassifier {
        &self.classifier
    }

    /// Drop all state, including the classifier's adaptation.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // --- Private ---

    fn handle_space(&mut self, duration: u32, now_us: i64) {
        match self.classifier.classify(duration, false) {
            ElementClass::IntraGap => {}
            ElementClass::CharGap => self.flush_pattern(now_us),
            ElementClass::WordGap => {
                self.flush_pattern(now_us);
                self.push_word_space(now_us);
            }
            _ => {
                // Beyond any word gap: same outcome
                if duration > 5_000_000 {
                    self.flush_pattern(now_us);
                    self.push_word_space(now_us);
                }
            }
        }
    }

    fn push_symbol(&mut self, sym: u8, now_us: i64) {
        if self.pattern.push(sym).is_err() {
            // Ninth symbol: flush the garbled pattern and restart with it
            self.push_char('?', now_us);
            self.pattern.clear();
            let _ = self.pattern.push(sym);
        }
    }

    fn flush_pattern(&mut self, now_us: i64) {
        if self.pattern.is_empty() {
            return;
        }
        // Pattern bytes are only ever b'.' / b'-'
        let s = core::str::from_utf8(&self.pattern).unwrap_or("");
        let ch = morse::decode(s).unwrap_or('?');
        self.pattern.clear();
        self.push_char(ch, now_us);
    }

    fn push_char(&mut self, ch: char, now_us: i64) {
        if self.text.is_full() {
            self.text.pop_front();
        }
        let _ = self.text.push_back(DecodedChar { ch, at_us: now_us });
        self.last_was_space = ch == ' ';
    }

    fn push_word_space(&mut self, now_us: i64) {
        if !self.last_was_space {
            self.push_char(' ', now_us);
        }
    }
}
