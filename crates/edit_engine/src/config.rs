//! Editing configuration

use serde::{Deserialize, Serialize};

/// Footnote editing options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FootnoteConfig {
    /// Turn typed `[^N]` markup into footnote references
    pub autodetect: bool,
    /// Characters of trailing typed text the detector keeps per container
    pub window_len: usize,
    /// Maximum number of undoable batches
    pub undo_limit: usize,
}

impl Default for FootnoteConfig {
    fn default() -> Self {
        Self {
            autodetect: true,
            window_len: 64,
            undo_limit: 100,
        }
    }
}
