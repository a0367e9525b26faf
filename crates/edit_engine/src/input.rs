//! Pluggable keyboard and text input handling

use crate::footnote_commands::auto_insert_from_pattern;
use crate::{AutoDetector, EditingEngine, FootnoteConfig, PatternMatch, Result, Writer};
use doc_model::{Position, Selection};
use tracing::debug;

/// Input delivered by the host editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Backspace or delete pressed with this selection
    Delete { selection: Selection },
    /// Text typed at a collapsed caret
    TextInput { position: Position, text: String },
}

/// Whether the host's default handling should still run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// A handler the host routes input events through
pub trait InputHandler {
    fn handle(&mut self, engine: &mut EditingEngine, event: &InputEvent) -> Result<Propagation>;
}

/// Footnote-aware input: the delete key rules and `[^N]` detection.
///
/// Typed text is inserted by the handler itself, so text events always stop
/// propagation. A detected literal is replaced in a transaction queued
/// behind the one that typed it.
#[derive(Debug, Clone)]
pub struct FootnoteInputHandler {
    detector: Option<AutoDetector>,
}

impl FootnoteInputHandler {
    pub fn new(config: &FootnoteConfig) -> Self {
        Self {
            detector: config
                .autodetect
                .then(|| AutoDetector::new(config.window_len)),
        }
    }

    fn reset_detector(&mut self) {
        if let Some(detector) = &mut self.detector {
            detector.reset();
        }
    }
}

impl Default for FootnoteInputHandler {
    fn default() -> Self {
        Self::new(&FootnoteConfig::default())
    }
}

impl InputHandler for FootnoteInputHandler {
    fn handle(&mut self, engine: &mut EditingEngine, event: &InputEvent) -> Result<Propagation> {
        match event {
            InputEvent::Delete { selection } => {
                self.reset_detector();
                let action = engine.handle_delete_key(selection)?;
                Ok(if action.allows_default() {
                    Propagation::Continue
                } else {
                    Propagation::Stop
                })
            }
            InputEvent::TextInput { position, text } => {
                let found = self
                    .detector
                    .as_mut()
                    .and_then(|d| d.observe(*position, text));

                let typed = engine.change(|w| {
                    w.insert_text(*position, text)?;
                    if let Some(found) = found {
                        w.enqueue(move |w| replace_markup(w, found));
                    }
                    Ok(())
                });
                if typed.is_err() {
                    self.reset_detector();
                }
                typed.map(|_| Propagation::Stop)
            }
        }
    }
}

/// Swap a detected literal for a Reference, provided the literal is still
/// where it was typed
fn replace_markup(writer: &mut Writer<'_>, found: PatternMatch) -> Result<()> {
    let current = writer
        .tree()
        .text_between(found.container, found.literal.start, found.literal.end);
    if current.as_deref() != Some(found.text.as_str()) {
        debug!(literal = %found.text, "typed footnote markup moved before replacement");
        return Ok(());
    }
    let outcome = auto_insert_from_pattern(
        writer,
        found.candidate,
        found.position(),
        Some(found.literal.clone()),
    )?;
    debug!(?outcome, "replaced typed footnote markup");
    Ok(())
}
