//! Overlay seam
//!
//! The overlay owns the highlights drawn into a document. The engine only
//! ever holds ids and asks the overlay to anchor, erase, style and focus.
//!
//! ## Events
//!
//! Clicks and selections are not handled inline. The overlay posts a
//! [`Gesture`] through the [`GestureSender`] it was subscribed with, and the
//! engine processes it later when the host drains the queue.

use tokio::sync::mpsc;

use crate::error::AnchorResult;
use crate::models::{Color, HighlightId, PendingHighlight, RangeAnchor};

/// A highlight currently drawn in the document
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredHighlight {
    pub id: HighlightId,
    pub anchor: RangeAnchor,
    /// Visual style; `None` until a color has been applied
    pub style: Option<Color>,
}

/// User gesture emitted by the overlay
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// A click, on a highlight or on plain text
    Click(Option<HighlightId>),
    /// A text selection finished
    Select {
        /// Existing highlights the selection touches
        overlapping: Vec<HighlightId>,
        /// Draft covering the selection, if one could be made
        draft: Option<PendingHighlight>,
    },
}

/// Sending half of the engine's gesture queue
pub type GestureSender = mpsc::UnboundedSender<Gesture>;

/// Live highlight overlay drawn into a document
pub trait Overlay {
    /// Draw a highlight for `anchor` under `id`
    fn anchor(&mut self, id: &HighlightId, anchor: &RangeAnchor) -> AnchorResult<()>;

    /// Remove a drawn highlight; unknown ids are ignored
    fn erase(&mut self, id: &HighlightId);

    /// Look up a drawn highlight
    fn get(&self, id: &HighlightId) -> Option<&AnchoredHighlight>;

    /// Apply a visual style to a drawn highlight
    fn set_style(&mut self, id: &HighlightId, color: Color);

    /// Ids of drawn highlights in document order
    fn ordered_ids(&self) -> Vec<HighlightId>;

    /// Position in [`Overlay::ordered_ids`] that a range would occupy
    fn insertion_index(&self, anchor: &RangeAnchor) -> usize;

    /// Blur whatever highlight has focus
    fn clear_focus(&mut self);

    /// Give visual and keyboard focus to a drawn highlight
    fn focus(&mut self, id: &HighlightId);

    /// The highlight holding focus, if any
    fn focused(&self) -> Option<HighlightId>;

    /// Drop any active text selection in the document
    fn clear_selection(&mut self);

    /// Start posting click/select gestures to `sender`
    fn subscribe(&mut self, sender: GestureSender);

    /// Stop posting gestures
    fn unsubscribe(&mut self);

    /// Whether a highlight with this id is drawn
    fn contains(&self, id: &HighlightId) -> bool {
        self.get(id).is_some()
    }
}
