//! Logical speaker slots and routing of synthesized audio by language.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A logical speaker slot. The broadcast setup drives two outputs, one per
/// translated language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerSlot {
    A,
    B,
}

/// Assignment of a language and output device to a speaker slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerAssignment {
    /// Language this speaker carries (e.g. "es").
    pub language: String,
    /// Output device identifier; `None` routes to the system default.
    pub device_id: Option<String>,
    /// Human-readable device name.
    pub device_name: String,
}

/// Holds at most one assignment per slot; a new assignment replaces the old.
#[derive(Default)]
pub struct SpeakerRouter {
    slots: Mutex<HashMap<SpeakerSlot, SpeakerAssignment>>,
}

impl SpeakerRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a slot, returning the assignment it replaced.
    pub fn assign(
        &self,
        slot: SpeakerSlot,
        assignment: SpeakerAssignment,
    ) -> Option<SpeakerAssignment> {
        self.slots
            .lock()
            .ok()
            .and_then(|mut slots| slots.insert(slot, assignment))
    }

    /// Clears a slot, returning the removed assignment.
    pub fn clear(&self, slot: SpeakerSlot) -> Option<SpeakerAssignment> {
        self.slots
            .lock()
            .ok()
            .and_then(|mut slots| slots.remove(&slot))
    }

    /// Current assignment for a slot.
    pub fn assignment(&self, slot: SpeakerSlot) -> Option<SpeakerAssignment> {
        self.slots
            .lock()
            .ok()
            .and_then(|slots| slots.get(&slot).cloned())
    }

    /// Finds the slot carrying a language, if any.
    pub fn slot_for_language(&self, language: &str) -> Option<(SpeakerSlot, SpeakerAssignment)> {
        let slots = self.slots.lock().ok()?;
        slots
            .iter()
            .find(|(_, a)| a.language == language)
            .map(|(slot, a)| (*slot, a.clone()))
    }
}
