//! Highlight synchronization engine
//!
//! Keeps the overlay drawn into a page consistent with the canonical
//! highlight records in the store.
//!
//! ## Update cycle
//!
//! [`HighlightEngine::update`] runs once per state change and always performs
//! these steps in order:
//!
//! 1. anchor the pending draft if the store now has its record
//! 2. sync styles of drawn highlights to their record colors
//! 3. anchor records that are not drawn yet
//! 4. erase drawn highlights that have no record
//! 5. blur everything
//! 6. resolve and apply focus
//! 7. drop the pending draft if it was erased in step 4, or deleted before
//!    it was ever drawn
//! 8. report whether anything was anchored or erased
//!
//! Anchoring failures skip the record. The only error surfaced to the caller
//! is a missing scroll target, through [`UpdateHooks`].

mod focus;
mod gestures;
mod pending;
mod report;


pub use focus::{resolve_focus, FocusInputs};
pub use gestures::{AnsweredDialog, Confirmation, Drained, PendingDialog};
pub use pending::PendingSlot;
pub use report::{ErrorFlag, ScrollTargetReporter, UpdateHooks};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Capabilities, Config};
use crate::models::{Color, HighlightId, PendingHighlight};
use crate::overlay::Overlay;
use crate::snapshot::{CanonicalStore, Intent, Snapshot};
use gestures::GestureQueue;

/// Entry in the ordered highlight list shown next to the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: HighlightId,
    /// The draft that is not drawn yet
    pub pending: bool,
}

impl Card {
    fn anchored(id: HighlightId) -> Self {
        Self { id, pending: false }
    }

    fn draft(id: HighlightId) -> Self {
        Self { id, pending: true }
    }
}

/// Scroll target that can be landed on once
pub struct ScrollTargetHandle<'a> {
    id: HighlightId,
    consumed: &'a mut Option<HighlightId>,
}

impl ScrollTargetHandle<'_> {
    pub fn id(&self) -> &HighlightId {
        &self.id
    }

    /// Mark the target as landed on; it stops steering focus and errors
    pub fn resolve(self) {
        debug!("Scroll target {} resolved", self.id);
        *self.consumed = Some(self.id);
    }
}

/// One engine per mounted page
pub struct HighlightEngine<O, S, C> {
    overlay: O,
    store: S,
    confirmation: C,
    capabilities: Capabilities,
    location_id: String,
    pending: PendingSlot,
    last_snapshot: Snapshot,
    cards: Vec<HighlightId>,
    reporter: ScrollTargetReporter,
    consumed_scroll_target: Option<HighlightId>,
    search_redraw: bool,
    gestures: GestureQueue,
    dialog_open: bool,
    mounted: bool,
}

impl<O, S, C> HighlightEngine<O, S, C>
where
    O: Overlay,
    S: CanonicalStore,
    C: Confirmation,
{
    /// Attach to an overlay and start receiving its gestures
    pub fn mount(mut overlay: O, store: S, confirmation: C, capabilities: Capabilities) -> Self {
        let gestures = GestureQueue::new();
        if let Some(sender) = gestures.sender() {
            overlay.subscribe(sender);
        }

        Self {
            overlay,
            store,
            confirmation,
            capabilities,
            location_id: crate::config::DEFAULT_LOCATION.to_string(),
            pending: PendingSlot::new(),
            last_snapshot: Snapshot::default(),
            cards: Vec::new(),
            reporter: ScrollTargetReporter::new(),
            consumed_scroll_target: None,
            search_redraw: false,
            gestures,
            dialog_open: false,
            mounted: true,
        }
    }

    /// Mount using capabilities and location from configuration
    pub fn mount_with_config(overlay: O, store: S, confirmation: C, config: &Config) -> Self {
        Self::mount(overlay, store, confirmation, config.capabilities)
            .with_location(config.location())
    }

    /// Set the location id stamped on highlights saved from drafts
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = location_id.into();
        self
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    /// Host access to the overlay, e.g. to forward document events
    pub fn overlay_mut(&mut self) -> &mut O {
        &mut self.overlay
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn is_active(&self, snapshot: &Snapshot) -> bool {
        self.mounted && (!self.capabilities.gated_by_feature_flag || snapshot.enabled)
    }

    /// Run one update cycle against the store's current snapshot
    ///
    /// `prev` is the snapshot of the previous cycle. Returns `true` when a
    /// highlight was anchored or erased, meaning the card list and anything
    /// drawn relative to highlight boundaries should be refreshed.
    pub fn update(&mut self, prev: &Snapshot, hooks: Option<&mut dyn UpdateHooks>) -> bool {
        let snapshot = self.store.snapshot();
        if !self.is_active(&snapshot) {
            self.last_snapshot = snapshot;
            return false;
        }

        if snapshot.highlight_scroll_target() != self.consumed_scroll_target.as_ref() {
            self.consumed_scroll_target = None;
        }

        let pending_attached = self.attach_pending(&snapshot);
        self.sync_styles(&snapshot);
        let added = self.anchor_new(&snapshot);
        let removed = self.erase_stale(&snapshot);

        self.overlay.clear_focus();
        self.apply_focus(prev, &snapshot, hooks);

        let pending_removed = self.pending.id().is_some_and(|id| {
            removed.contains(id) || (self.pending.is_deleted() && !snapshot.contains(id))
        });
        if pending_removed {
            if let Some(draft) = self.pending.clear() {
                info!("Pending highlight {} was deleted", draft.id);
            }
        }

        self.last_snapshot = snapshot;

        let changed = pending_attached || !added.is_empty() || !removed.is_empty();
        if changed {
            self.cards = self.overlay.ordered_ids();
            if self.capabilities.search_integration {
                self.search_redraw = true;
            }
        }
        changed
    }

    /// Run an update cycle against the snapshot seen by the last one
    pub fn sync(&mut self, hooks: Option<&mut dyn UpdateHooks>) -> bool {
        let prev = self.last_snapshot.clone();
        self.update(&prev, hooks)
    }

    /// Step 1: a saved draft becomes a real highlight
    fn attach_pending(&mut self, snapshot: &Snapshot) -> bool {
        let Some(draft) = self.pending.get() else {
            return false;
        };
        if self.overlay.contains(&draft.id) || !snapshot.contains(&draft.id) {
            return false;
        }

        match self.overlay.anchor(&draft.id, &draft.anchor) {
            Ok(()) => {
                info!("Pending highlight {} persisted", draft.id);
                true
            }
            Err(e) => {
                debug!("Could not attach pending highlight {}: {}", draft.id, e);
                false
            }
        }
    }

    /// Step 2
    fn sync_styles(&mut self, snapshot: &Snapshot) {
        for record in snapshot.records.iter() {
            let current = match self.overlay.get(&record.id) {
                Some(anchored) => anchored.style,
                None => continue,
            };
            if current != Some(record.color) {
                self.overlay.set_style(&record.id, record.color);
            }
        }
    }

    /// Step 3: anchor records that arrived from elsewhere
    fn anchor_new(&mut self, snapshot: &Snapshot) -> Vec<HighlightId> {
        let mut added = Vec::new();
        for record in snapshot.records.iter() {
            if self.overlay.contains(&record.id) {
                continue;
            }
            match self.overlay.anchor(&record.id, &record.anchor) {
                Ok(()) => {
                    self.overlay.set_style(&record.id, record.color);
                    added.push(record.id.clone());
                }
                Err(e) if e.is_stale_content() => {
                    debug!("Skipping highlight {}: {}", record.id, e)
                }
                Err(e) => warn!("Could not anchor highlight {}: {}", record.id, e),
            }
        }
        added
    }

    /// Step 4
    fn erase_stale(&mut self, snapshot: &Snapshot) -> Vec<HighlightId> {
        let stale: Vec<HighlightId> = self
            .overlay
            .ordered_ids()
            .into_iter()
            .filter(|id| !snapshot.contains(id))
            .collect();

        for id in &stale {
            debug!("Erasing highlight {}", id);
            self.overlay.erase(id);
        }
        stale
    }

    /// Step 6
    fn apply_focus(
        &mut self,
        prev: &Snapshot,
        snapshot: &Snapshot,
        hooks: Option<&mut dyn UpdateHooks>,
    ) {
        let focused = snapshot
            .focused
            .as_ref()
            .filter(|id| self.overlay.contains(id));

        let target = snapshot
            .highlight_scroll_target()
            .filter(|id| self.consumed_scroll_target.as_ref() != Some(*id));
        let anchored_target = target.filter(|id| self.overlay.contains(id));

        if let (Some(hooks), Some(target)) = (hooks, target) {
            if snapshot.state_established() {
                self.reporter
                    .report(target, anchored_target.is_some(), hooks);
            }
        }

        let to_focus = resolve_focus(FocusInputs {
            focused,
            prev_focused: prev.focused.as_ref(),
            has_pending: !self.pending.is_empty(),
            scroll_target: anchored_target,
        });

        if let Some(id) = to_focus {
            self.overlay.focus(id);
            if snapshot.focused.as_ref() != Some(id) {
                self.store.dispatch(Intent::Focus { id: id.clone() });
            }
        }
    }

    /// Highlights in document order, with an undrawn draft slotted in
    pub fn cards(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self.cards.iter().cloned().map(Card::anchored).collect();

        if let Some(draft) = self.pending.get() {
            if !self.overlay.contains(&draft.id) {
                let index = self.overlay.insertion_index(&draft.anchor).min(cards.len());
                cards.insert(index, Card::draft(draft.id.clone()));
            }
        }
        cards
    }

    /// The scroll target, while it is drawn and not yet landed on
    pub fn scroll_target(&mut self) -> Option<ScrollTargetHandle<'_>> {
        let snapshot = self.store.snapshot();
        let id = snapshot.highlight_scroll_target()?;
        if self.consumed_scroll_target.as_ref() == Some(id) || !self.overlay.contains(id) {
            return None;
        }

        Some(ScrollTargetHandle {
            id: id.clone(),
            consumed: &mut self.consumed_scroll_target,
        })
    }

    /// Whether highlight boundaries changed since the last call
    pub fn take_search_redraw(&mut self) -> bool {
        std::mem::take(&mut self.search_redraw)
    }

    // ==================== Pending Slot ====================

    pub fn pending(&self) -> Option<&PendingHighlight> {
        self.pending.get()
    }

    /// Make `draft` the pending highlight, abandoning any previous draft
    pub fn set_pending(&mut self, draft: PendingHighlight) {
        self.pending.set(draft);
    }

    pub fn clear_pending(&mut self) -> Option<PendingHighlight> {
        self.pending.clear()
    }

    /// Persist the draft with the chosen color
    ///
    /// The draft stays pending until its record shows up in the store, at
    /// which point the next cycle draws it. Returns the draft's id.
    pub fn save_pending(
        &mut self,
        color: Color,
        annotation: Option<String>,
    ) -> Option<HighlightId> {
        let draft = self.pending.get_mut()?;
        draft.color = Some(color);
        if annotation.is_some() {
            draft.annotation = annotation;
        }
        let draft = draft.clone();
        let id = draft.id.clone();

        if self.store.snapshot().contains(&id) {
            self.store.dispatch(Intent::Update {
                id: id.clone(),
                color: Some(color),
                annotation: draft.annotation,
            });
        } else {
            let record = draft.into_record(color, self.location_id.clone());
            self.store.dispatch(Intent::Create { record });
        }
        Some(id)
    }

    /// Discard the draft and blur it
    pub fn cancel_pending(&mut self) {
        let Some(draft) = self.pending.clear() else {
            return;
        };
        debug!("Pending highlight {} cancelled", draft.id);

        if self.store.snapshot().focused.as_ref() == Some(&draft.id) {
            self.store.dispatch(Intent::ClearFocus);
        }
        self.overlay.clear_selection();
    }

    // ==================== Edits ====================

    /// Ask the store to delete a highlight
    pub fn remove_highlight(&mut self, id: &HighlightId) {
        self.pending.mark_deleted(id);
        self.store.dispatch(Intent::Delete { id: id.clone() });
    }

    /// Ask the store to change a highlight's color
    pub fn recolor(&mut self, id: &HighlightId, color: Color) {
        if let Some(draft) = self.pending.get_mut().filter(|d| &d.id == id) {
            draft.color = Some(color);
        }
        self.store.dispatch(Intent::Update {
            id: id.clone(),
            color: Some(color),
            annotation: None,
        });
    }

    /// Release the overlay
    ///
    /// Unsubscribes from gestures, drops queued ones and erases every drawn
    /// highlight. Calling it again does nothing.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        self.overlay.unsubscribe();
        self.gestures.close();
        self.dialog_open = false;
        for id in self.overlay.ordered_ids() {
            self.overlay.erase(&id);
        }
        self.overlay.clear_focus();
        self.pending.clear();
        self.cards.clear();
        self.reporter.reset();
        info!("Highlight engine unmounted");
    }
}
