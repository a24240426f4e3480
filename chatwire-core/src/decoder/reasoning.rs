//! Tracking of streamed reasoning ("thinking") text.

use crate::message::{ReasoningEcho, ReasoningField};

/// Where a stream is with respect to its reasoning block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningPhase {
    /// No reasoning seen yet.
    #[default]
    None,
    /// Reasoning is arriving.
    Active,
    /// Answer text started after reasoning; later reasoning is ignored.
    Done,
}

/// Accumulates reasoning separately from the answer text.
#[derive(Debug, Default)]
pub(crate) struct ReasoningTracker {
    phase: ReasoningPhase,
    /// Cumulative text, kept for live display across the whole session.
    text: String,
    /// Key of the first fragment.
    field: Option<ReasoningField>,
    /// Fragments not yet echoed into an assistant turn.
    chunks: Vec<String>,
}

impl ReasoningTracker {
    /// Record a reasoning fragment. Returns whether it was accepted.
    pub(crate) fn observe_reasoning(&mut self, field: ReasoningField, text: String) -> bool {
        if self.phase == ReasoningPhase::Done || text.is_empty() {
            return false;
        }
        self.phase = ReasoningPhase::Active;
        self.field.get_or_insert(field);
        self.text.push_str(&text);
        self.chunks.push(text);
        true
    }

    /// Note that non-empty answer text arrived.
    pub(crate) fn observe_answer(&mut self) {
        if self.phase == ReasoningPhase::Active {
            self.phase = ReasoningPhase::Done;
        }
    }

    pub(crate) fn phase(&self) -> ReasoningPhase {
        self.phase
    }

    pub(crate) fn text(&self) -> Option<&str> {
        (!self.text.is_empty()).then_some(self.text.as_str())
    }

    /// Drain pending fragments into an echo for the assistant turn.
    ///
    /// The phase and cumulative text are left untouched.
    pub(crate) fn take_echo(&mut self) -> Option<ReasoningEcho> {
        let field = self.field?;
        if self.chunks.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.chunks).concat();
        Some(ReasoningEcho { field, text })
    }
}
