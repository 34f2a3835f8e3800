//! In-memory overlay
//!
//! Models a document as an ordered list of text containers. Highlights are
//! anchored against container text, so a range that no longer fits the text
//! fails to anchor just as it would in a real page.

use tracing::debug;

use crate::error::{AnchorError, AnchorResult};
use crate::models::{Color, HighlightId, PendingHighlight, RangeAnchor};
use crate::overlay::{AnchoredHighlight, Gesture, GestureSender, Overlay};

/// Structural change made to the overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Anchor(HighlightId),
    Erase(HighlightId),
    Style(HighlightId, Color),
}

#[derive(Debug, Clone)]
struct Container {
    id: String,
    text: String,
}

/// Overlay over an in-memory document
#[derive(Debug, Default)]
pub struct MemoryOverlay {
    containers: Vec<Container>,
    /// Kept in document order
    highlights: Vec<AnchoredHighlight>,
    focused: Option<HighlightId>,
    selection: Option<RangeAnchor>,
    subscriber: Option<GestureSender>,
    mutations: Vec<Mutation>,
}

impl MemoryOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a container to the document (builder style)
    pub fn with_container(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.add_container(id, text);
        self
    }

    /// Append a container, or replace the text of an existing one
    pub fn add_container(&mut self, id: impl Into<String>, text: impl Into<String>) {
        let id = id.into();
        let text = text.into();
        match self.containers.iter_mut().find(|c| c.id == id) {
            Some(container) => container.text = text,
            None => self.containers.push(Container { id, text }),
        }
    }

    /// Remove a container, as a content revision would
    pub fn remove_container(&mut self, id: &str) {
        self.containers.retain(|c| c.id != id);
    }

    /// Text covered by a drawn highlight
    pub fn text_of(&self, id: &HighlightId) -> Option<&str> {
        let highlight = self.get(id)?;
        let container = self.container(&highlight.anchor.container)?;
        container
            .text
            .get(highlight.anchor.start..highlight.anchor.end)
    }

    /// Click on a highlight (or on plain text with `None`)
    ///
    /// Returns whether a subscriber received the gesture.
    pub fn click(&self, id: Option<&str>) -> bool {
        self.emit(Gesture::Click(id.map(HighlightId::from)))
    }

    /// Select text, drafting a highlight when the range is valid
    ///
    /// Returns the draft id that was posted, if any.
    pub fn select(&mut self, anchor: RangeAnchor) -> Option<HighlightId> {
        let overlapping: Vec<HighlightId> = self
            .highlights
            .iter()
            .filter(|h| overlaps(&h.anchor, &anchor))
            .map(|h| h.id.clone())
            .collect();

        let draft = self
            .validate(&anchor)
            .ok()
            .map(|()| PendingHighlight::draft(anchor.clone()));
        let draft_id = draft.as_ref().map(|d| d.id.clone());

        self.selection = Some(anchor);
        if !self.emit(Gesture::Select { overlapping, draft }) {
            return None;
        }
        draft_id
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriber.is_some()
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    /// Structural changes since the last [`MemoryOverlay::clear_mutations`]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    fn emit(&self, gesture: Gesture) -> bool {
        let Some(tx) = &self.subscriber else {
            debug!("No subscriber, dropping {:?}", gesture);
            return false;
        };
        match tx.send(gesture) {
            Ok(()) => true,
            Err(e) => {
                debug!("Gesture queue closed, dropping {:?}", e.0);
                false
            }
        }
    }

    fn container(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    fn validate(&self, anchor: &RangeAnchor) -> AnchorResult<()> {
        let container =
            self.container(&anchor.container)
                .ok_or_else(|| AnchorError::MissingContainer {
                    container: anchor.container.clone(),
                })?;
        AnchorError::check(anchor, container.text.len())
    }

    /// Sort key for a range: container order, then offset
    fn position(&self, anchor: &RangeAnchor) -> (usize, usize) {
        let container = self
            .containers
            .iter()
            .position(|c| c.id == anchor.container)
            .unwrap_or(usize::MAX);
        (container, anchor.start)
    }
}

fn overlaps(a: &RangeAnchor, b: &RangeAnchor) -> bool {
    a.container == b.container && a.start < b.end && b.start < a.end
}

impl Overlay for MemoryOverlay {
    fn anchor(&mut self, id: &HighlightId, anchor: &RangeAnchor) -> AnchorResult<()> {
        if self.contains(id) {
            return Err(AnchorError::AlreadyAnchored(id.clone()));
        }
        self.validate(anchor)?;

        let index = self.insertion_index(anchor);
        self.highlights.insert(
            index,
            AnchoredHighlight {
                id: id.clone(),
                anchor: anchor.clone(),
                style: None,
            },
        );
        self.mutations.push(Mutation::Anchor(id.clone()));
        Ok(())
    }

    fn erase(&mut self, id: &HighlightId) {
        let before = self.highlights.len();
        self.highlights.retain(|h| &h.id != id);
        if self.highlights.len() == before {
            debug!("Erase of unknown highlight {}", id);
            return;
        }
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
        }
        self.mutations.push(Mutation::Erase(id.clone()));
    }

    fn get(&self, id: &HighlightId) -> Option<&AnchoredHighlight> {
        self.highlights.iter().find(|h| &h.id == id)
    }

    fn set_style(&mut self, id: &HighlightId, color: Color) {
        if let Some(highlight) = self.highlights.iter_mut().find(|h| &h.id == id) {
            highlight.style = Some(color);
            self.mutations.push(Mutation::Style(id.clone(), color));
        }
    }

    fn ordered_ids(&self) -> Vec<HighlightId> {
        self.highlights.iter().map(|h| h.id.clone()).collect()
    }

    fn insertion_index(&self, anchor: &RangeAnchor) -> usize {
        let key = self.position(anchor);
        self.highlights
            .iter()
            .take_while(|h| self.position(&h.anchor) <= key)
            .count()
    }

    fn clear_focus(&mut self) {
        self.focused = None;
    }

    fn focus(&mut self, id: &HighlightId) {
        if self.contains(id) {
            self.focused = Some(id.clone());
        }
    }

    fn focused(&self) -> Option<HighlightId> {
        self.focused.clone()
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn subscribe(&mut self, sender: GestureSender) {
        self.subscriber = Some(sender);
    }

    fn unsubscribe(&mut self) {
        self.subscriber = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn document() -> MemoryOverlay {
        MemoryOverlay::new()
            .with_container("intro", "Cells are the basic unit of life.")
            .with_container("body", "Mitochondria produce energy for the cell.")
    }

    #[test]
    fn test_anchor_and_text() {
        let mut overlay = document();
        overlay
            .anchor(&"a".into(), &RangeAnchor::new("body", 0, 12))
            .unwrap();
        assert_eq!(overlay.text_of(&"a".into()), Some("Mitochondria"));
        assert_eq!(overlay.mutations(), &[Mutation::Anchor("a".into())]);
    }

    #[test]
    fn test_anchor_failures() {
        let mut overlay = document();
        let missing = overlay.anchor(&"a".into(), &RangeAnchor::new("appendix", 0, 3));
        assert!(matches!(missing, Err(AnchorError::MissingContainer { .. })));

        let long = overlay.anchor(&"b".into(), &RangeAnchor::new("intro", 5, 500));
        assert!(matches!(long, Err(AnchorError::OutOfBounds { .. })));

        overlay
            .anchor(&"c".into(), &RangeAnchor::new("intro", 0, 5))
            .unwrap();
        let twice = overlay.anchor(&"c".into(), &RangeAnchor::new("intro", 0, 5));
        assert!(matches!(twice, Err(AnchorError::AlreadyAnchored(_))));
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn test_document_order() {
        let mut overlay = document();
        overlay
            .anchor(&"late".into(), &RangeAnchor::new("body", 20, 26))
            .unwrap();
        overlay
            .anchor(&"early".into(), &RangeAnchor::new("intro", 10, 15))
            .unwrap();
        overlay
            .anchor(&"middle".into(), &RangeAnchor::new("body", 0, 5))
            .unwrap();

        let order: Vec<String> = overlay.ordered_ids().into_iter().map(|id| id.0).collect();
        assert_eq!(order, vec!["early", "middle", "late"]);
        assert_eq!(overlay.insertion_index(&RangeAnchor::new("body", 10, 12)), 2);
        assert_eq!(overlay.insertion_index(&RangeAnchor::new("intro", 0, 2)), 0);
    }

    #[test]
    fn test_erase_drops_focus() {
        let mut overlay = document();
        overlay
            .anchor(&"a".into(), &RangeAnchor::new("intro", 0, 5))
            .unwrap();
        overlay.focus(&"a".into());
        assert_eq!(overlay.focused(), Some("a".into()));

        overlay.erase(&"a".into());
        assert!(overlay.focused().is_none());
        assert!(overlay.is_empty());

        // Unknown ids are ignored and not logged
        overlay.clear_mutations();
        overlay.erase(&"a".into());
        assert!(overlay.mutations().is_empty());
    }

    #[test]
    fn test_focus_requires_anchored_highlight() {
        let mut overlay = document();
        overlay.focus(&"ghost".into());
        assert!(overlay.focused().is_none());
    }

    #[test]
    fn test_select_posts_draft() {
        let mut overlay = document();
        let (tx, mut rx) = mpsc::unbounded_channel();
        overlay.subscribe(tx);

        let draft_id = overlay.select(RangeAnchor::new("intro", 0, 5)).unwrap();
        assert!(overlay.has_selection());

        match rx.try_recv().unwrap() {
            Gesture::Select { overlapping, draft } => {
                assert!(overlapping.is_empty());
                assert_eq!(draft.unwrap().id, draft_id);
            }
            other => panic!("unexpected gesture {:?}", other),
        }
    }

    #[test]
    fn test_select_reports_overlap() {
        let mut overlay = document();
        overlay
            .anchor(&"a".into(), &RangeAnchor::new("intro", 0, 10))
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        overlay.subscribe(tx);

        overlay.select(RangeAnchor::new("intro", 5, 15));
        match rx.try_recv().unwrap() {
            Gesture::Select { overlapping, .. } => {
                assert_eq!(overlapping, vec![HighlightId::from("a")]);
            }
            other => panic!("unexpected gesture {:?}", other),
        }
    }

    #[test]
    fn test_unsubscribed_gestures_are_dropped() {
        let overlay = document();
        assert!(!overlay.click(Some("a")));
    }

    #[test]
    fn test_closed_queue_reports_undelivered() {
        let mut overlay = document();
        let (tx, rx) = mpsc::unbounded_channel();
        overlay.subscribe(tx);
        drop(rx);

        assert!(!overlay.click(Some("a")));
        assert!(overlay.select(RangeAnchor::new("intro", 0, 5)).is_none());
    }
}
