//! Pending slot
//!
//! Holds the one highlight drafted from a selection that has not been
//! confirmed by the store yet. Setting a new draft abandons the old one.
//!
//! A draft can be deleted before any update cycle draws it, so it never
//! shows up among the erased highlights. The slot remembers the deletion
//! until the cycle that sees the record gone clears it.

use tracing::debug;

use crate::models::{HighlightId, PendingHighlight};

#[derive(Debug, Default)]
pub struct PendingSlot {
    draft: Option<PendingHighlight>,
    deleted: bool,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a draft, replacing any previous one
    pub fn set(&mut self, draft: PendingHighlight) {
        self.deleted = false;
        if let Some(previous) = self.draft.replace(draft) {
            debug!("Abandoned pending highlight {}", previous.id);
        }
    }

    /// Empty the slot, returning what was in it
    pub fn clear(&mut self) -> Option<PendingHighlight> {
        self.deleted = false;
        self.draft.take()
    }

    pub fn get(&self) -> Option<&PendingHighlight> {
        self.draft.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut PendingHighlight> {
        self.draft.as_mut()
    }

    pub fn id(&self) -> Option<&HighlightId> {
        self.draft.as_ref().map(|d| &d.id)
    }

    /// Note that the draft with this id was asked to be deleted
    pub fn mark_deleted(&mut self, id: &HighlightId) {
        if self.id() == Some(id) {
            self.deleted = true;
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.draft.is_none()
    }
}
