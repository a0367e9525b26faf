//! Typed footnote markup detection
//!
//! The detector keeps the last few typed characters of the container being
//! typed into. When the window ends in `[^N]` it reports the literal's
//! offsets so the markup can be swapped for a Reference.

use doc_model::{NodeId, Position};
use regex_lite::Regex;
use std::ops::Range;

const FOOTNOTE_MARKUP: &str = r"\[\^([0-9]+)\]$";

/// A `[^N]` literal found at the end of typed text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub container: NodeId,
    /// Container offsets of the whole literal
    pub literal: Range<usize>,
    /// Container offsets of the digit run
    pub digits: Range<usize>,
    pub candidate: u32,
    /// The literal as typed
    pub text: String,
}

impl PatternMatch {
    /// Position the Reference will take once the literal is removed
    pub fn position(&self) -> Position {
        Position::new(self.container, self.literal.start)
    }
}

/// Bounded trailing-text window over the typed input
#[derive(Debug, Clone)]
pub struct AutoDetector {
    pattern: Option<Regex>,
    window: String,
    capacity: usize,
    container: Option<NodeId>,
    /// Container offset right after the last typed character
    end: usize,
}

impl AutoDetector {
    pub fn new(capacity: usize) -> Self {
        Self {
            pattern: Regex::new(FOOTNOTE_MARKUP).ok(),
            window: String::new(),
            capacity: capacity.max(4),
            container: None,
            end: 0,
        }
    }

    /// Forget the typed history
    pub fn reset(&mut self) {
        self.window.clear();
        self.container = None;
        self.end = 0;
    }

    /// Record `text` typed at `position` and check the window for markup
    pub fn observe(&mut self, position: Position, text: &str) -> Option<PatternMatch> {
        if self.container != Some(position.node_id) || self.end != position.offset {
            self.reset();
            self.container = Some(position.node_id);
        }
        self.window.push_str(text);
        self.end = position.offset + text.chars().count();
        self.trim();

        let found = self.find()?;
        self.reset();
        Some(found)
    }

    fn trim(&mut self) {
        let len = self.window.chars().count();
        if len > self.capacity {
            let cut = self
                .window
                .char_indices()
                .nth(len - self.capacity)
                .map(|(byte, _)| byte)
                .unwrap_or(self.window.len());
            self.window.drain(..cut);
        }
    }

    fn find(&self) -> Option<PatternMatch> {
        let container = self.container?;
        let captures = self.pattern.as_ref()?.captures(&self.window)?;
        let whole = captures.get(0)?;
        let digits = captures.get(1)?;
        // Digit runs too long for an id are not footnote markup
        let candidate = digits.as_str().parse::<u32>().ok()?;

        let window_start = self.end - self.window.chars().count();
        let offset_of = |byte: usize| window_start + self.window[..byte].chars().count();

        Some(PatternMatch {
            container,
            literal: offset_of(whole.start())..offset_of(whole.end()),
            digits: offset_of(digits.start())..offset_of(digits.end()),
            candidate,
            text: whole.as_str().to_string(),
        })
    }
}

impl Default for AutoDetector {
    fn default() -> Self {
        Self::new(64)
    }
}
