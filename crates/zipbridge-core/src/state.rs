//! Last-known state reported by the extension.

use crate::{CaptionState, InboundUpdate};
use std::collections::BTreeSet;

/// A state slot touched by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangedField {
    CaptionState,
    LastWord,
}

/// Caption state and last captioned word.
///
/// Only decoded updates write here. Values survive peer disconnects; they are
/// reset only by constructing a new store.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    caption_state: CaptionState,
    last_word: String,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caption_state(&self) -> &CaptionState {
        &self.caption_state
    }

    pub fn last_word(&self) -> &str {
        &self.last_word
    }

    /// Apply the fields present in `update`.
    ///
    /// Every present field counts as changed, even if it carries the value
    /// already stored, so the caller always refreshes what the extension sent.
    pub fn apply_update(&mut self, update: InboundUpdate) -> BTreeSet<ChangedField> {
        let mut changed = BTreeSet::new();
        if let Some(status) = update.status {
            self.caption_state = status;
            changed.insert(ChangedField::CaptionState);
        }
        if let Some(word) = update.last_word {
            self.last_word = word;
            changed.insert(ChangedField::LastWord);
        }
        changed
    }
}
