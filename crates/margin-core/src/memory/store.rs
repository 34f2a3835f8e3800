//! In-memory canonical store
//!
//! A shared handle over highlight state that applies dispatched intents the
//! way the application's reducer does. Clones share the same state, so a
//! host (or a test) can keep a handle while the engine owns another.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::models::{HighlightId, HighlightRecord, ScrollTarget};
use crate::snapshot::{CanonicalStore, Intent, Snapshot};

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Snapshot,
    dispatched: Vec<Intent>,
}

impl StoreState {
    fn records_mut(&mut self) -> &mut Vec<HighlightRecord> {
        Arc::make_mut(&mut self.snapshot.records)
    }

    fn bump(&mut self) {
        self.snapshot.version += 1;
    }
}

/// Canonical store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<StoreState>>,
}

impl MemoryStore {
    /// Empty store for a loaded page with highlighting enabled
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut state = store.inner.borrow_mut();
            state.snapshot.enabled = true;
            state.snapshot.page_loaded = true;
        }
        store
    }

    /// Store that has already received `records`
    pub fn with_records(records: Vec<HighlightRecord>) -> Self {
        let store = Self::new();
        store.receive_highlights(records);
        store
    }

    /// Apply an intent as the reducer would
    pub fn apply(&self, intent: &Intent) {
        let mut state = self.inner.borrow_mut();
        match intent {
            Intent::Focus { id } => {
                state.snapshot.focused = Some(id.clone());
            }
            Intent::ClearFocus => {
                state.snapshot.focused = None;
            }
            Intent::Create { record } => {
                let records = state.records_mut();
                match records.iter_mut().find(|r| r.id == record.id) {
                    Some(existing) => *existing = record.clone(),
                    None => records.push(record.clone()),
                }
            }
            Intent::Update {
                id,
                color,
                annotation,
            } => {
                let records = state.records_mut();
                let Some(record) = records.iter_mut().find(|r| &r.id == id) else {
                    debug!("Ignoring update for unknown highlight {}", id);
                    return;
                };
                if let Some(color) = color {
                    record.set_color(*color);
                }
                if annotation.is_some() {
                    record.set_annotation(annotation.clone());
                }
            }
            Intent::Delete { id } => {
                state.records_mut().retain(|r| &r.id != id);
                if state.snapshot.focused.as_ref() == Some(id) {
                    state.snapshot.focused = None;
                }
            }
        }
        state.bump();
    }

    /// Add a batch of records fetched for the page
    pub fn receive_highlights(&self, records: Vec<HighlightRecord>) {
        let mut state = self.inner.borrow_mut();
        state.records_mut().extend(records);
        state.snapshot.highlights_loaded = true;
        state.bump();
    }

    /// Navigate to another page: highlight state starts over
    pub fn change_location(&self) {
        let mut state = self.inner.borrow_mut();
        state.records_mut().clear();
        state.snapshot.focused = None;
        state.snapshot.highlights_loaded = false;
        state.snapshot.has_unsaved_highlight = false;
        state.bump();
    }

    pub fn set_scroll_target(&self, target: Option<ScrollTarget>) {
        let mut state = self.inner.borrow_mut();
        state.snapshot.scroll_target = target;
        state.bump();
    }

    pub fn set_unsaved(&self, unsaved: bool) {
        let mut state = self.inner.borrow_mut();
        state.snapshot.has_unsaved_highlight = unsaved;
        state.bump();
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.inner.borrow_mut();
        state.snapshot.enabled = enabled;
        state.bump();
    }

    pub fn set_logged_out(&self, logged_out: bool) {
        let mut state = self.inner.borrow_mut();
        state.snapshot.logged_out = logged_out;
        state.bump();
    }

    pub fn records(&self) -> Vec<HighlightRecord> {
        self.inner.borrow().snapshot.records.as_ref().clone()
    }

    pub fn focused(&self) -> Option<HighlightId> {
        self.inner.borrow().snapshot.focused.clone()
    }

    /// Every intent dispatched so far, oldest first
    pub fn dispatched(&self) -> Vec<Intent> {
        self.inner.borrow().dispatched.clone()
    }

    pub fn take_dispatched(&self) -> Vec<Intent> {
        std::mem::take(&mut self.inner.borrow_mut().dispatched)
    }
}

impl CanonicalStore for MemoryStore {
    fn snapshot(&self) -> Snapshot {
        self.inner.borrow().snapshot.clone()
    }

    fn dispatch(&mut self, intent: Intent) {
        self.apply(&intent);
        self.inner.borrow_mut().dispatched.push(intent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Color, RangeAnchor};

    fn record(id: &str) -> HighlightRecord {
        HighlightRecord::new(id, Color::Yellow, RangeAnchor::new("p1", 0, 3), "page")
    }

    #[test]
    fn test_new_store_is_enabled_but_not_loaded() {
        let store = MemoryStore::new();
        let snapshot = store.snapshot();
        assert!(snapshot.enabled);
        assert!(!snapshot.highlights_loaded);
        assert!(snapshot.records.is_empty());
    }

    #[test]
    fn test_create_and_delete() {
        let mut store = MemoryStore::new();
        store.dispatch(Intent::Create { record: record("a") });
        store.dispatch(Intent::Focus { id: "a".into() });
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.focused(), Some("a".into()));

        store.dispatch(Intent::Delete { id: "a".into() });
        assert!(store.records().is_empty());
        // Deleting the focused highlight drops focus
        assert!(store.focused().is_none());
    }

    #[test]
    fn test_create_keeps_ids_unique() {
        let mut store = MemoryStore::new();
        store.dispatch(Intent::Create { record: record("a") });
        let mut again = record("a");
        again.set_color(Color::Pink);
        store.dispatch(Intent::Create { record: again });

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].color, Color::Pink);
    }

    #[test]
    fn test_update_merges_fields() {
        let mut store = MemoryStore::with_records(vec![record("a")]);
        store.dispatch(Intent::Update {
            id: "a".into(),
            color: Some(Color::Green),
            annotation: None,
        });
        store.dispatch(Intent::Update {
            id: "a".into(),
            color: None,
            annotation: Some("why".to_string()),
        });

        let records = store.records();
        assert_eq!(records[0].color, Color::Green);
        assert_eq!(records[0].annotation.as_deref(), Some("why"));
    }

    #[test]
    fn test_update_unknown_is_ignored() {
        let mut store = MemoryStore::new();
        store.dispatch(Intent::Update {
            id: "ghost".into(),
            color: Some(Color::Blue),
            annotation: None,
        });
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_versions_increase() {
        let store = MemoryStore::new();
        let before = store.snapshot().version;
        store.set_unsaved(true);
        store.set_scroll_target(Some(ScrollTarget::highlight("x")));
        assert_eq!(store.snapshot().version, before + 2);
    }

    #[test]
    fn test_change_location_resets() {
        let mut store = MemoryStore::with_records(vec![record("a")]);
        store.dispatch(Intent::Focus { id: "a".into() });
        store.change_location();

        let snapshot = store.snapshot();
        assert!(snapshot.records.is_empty());
        assert!(snapshot.focused.is_none());
        assert!(!snapshot.highlights_loaded);
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let mut store = MemoryStore::with_records(vec![record("a")]);
        let before = store.snapshot();
        store.dispatch(Intent::Delete { id: "a".into() });

        assert_eq!(before.records.len(), 1);
        assert!(store.snapshot().records.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let mut store = MemoryStore::new();
        let handle = store.clone();
        store.dispatch(Intent::Focus { id: "a".into() });

        assert_eq!(handle.focused(), Some("a".into()));
        assert_eq!(handle.take_dispatched().len(), 1);
        assert!(store.dispatched().is_empty());
    }
}
