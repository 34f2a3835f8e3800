//! Focus arbitration
//!
//! Picks the single highlight that should hold focus after a cycle.

use crate::models::HighlightId;

/// Inputs to [`resolve_focus`], each already resolved against the overlay
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusInputs<'a> {
    /// Explicitly focused highlight, if it is drawn
    pub focused: Option<&'a HighlightId>,
    /// Focused id as of the previous cycle
    pub prev_focused: Option<&'a HighlightId>,
    /// A draft is open
    pub has_pending: bool,
    /// Scroll-target highlight, if it is drawn
    pub scroll_target: Option<&'a HighlightId>,
}

/// Choose the highlight to focus, first match wins:
///
/// 1. explicit focus
/// 2. the scroll target, but only before the reader has interacted
///    (no previous focus and no open draft)
/// 3. nothing
pub fn resolve_focus<'a>(inputs: FocusInputs<'a>) -> Option<&'a HighlightId> {
    if let Some(focused) = inputs.focused {
        return Some(focused);
    }
    if !inputs.has_pending && inputs.prev_focused.is_none() {
        return inputs.scroll_target;
    }
    None
}
