//! Canonical store seam
//!
//! The engine reads application state through immutable [`Snapshot`]s and
//! changes it only by dispatching [`Intent`]s. It never writes records
//! directly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{Color, HighlightId, HighlightRecord, ScrollTarget};

/// Immutable view of the highlight state for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Bumped on every applied intent
    pub version: u64,
    /// Canonical highlight records
    pub records: Arc<Vec<HighlightRecord>>,
    /// Explicitly focused highlight
    pub focused: Option<HighlightId>,
    /// Where navigation asked to land
    pub scroll_target: Option<ScrollTarget>,
    /// Whether a focused highlight has edits that were not saved
    pub has_unsaved_highlight: bool,
    /// Highlighting feature flag
    pub enabled: bool,
    /// Records for this page have been received
    pub highlights_loaded: bool,
    /// No user is signed in
    pub logged_out: bool,
    /// Page content is available
    pub page_loaded: bool,
}

impl Snapshot {
    /// Look up a record by id
    pub fn record(&self, id: &HighlightId) -> Option<&HighlightRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Check whether a record with this id is canonical
    pub fn contains(&self, id: &HighlightId) -> bool {
        self.record(id).is_some()
    }

    /// The scroll target, when it points at a highlight
    pub fn highlight_scroll_target(&self) -> Option<&HighlightId> {
        self.scroll_target.as_ref().and_then(ScrollTarget::highlight_id)
    }

    /// Whether enough state has arrived to judge a scroll target missing
    ///
    /// Signed-out readers never receive highlights, so a loaded page is
    /// enough for them.
    pub fn state_established(&self) -> bool {
        self.highlights_loaded || (self.logged_out && self.page_loaded)
    }
}

/// One-way request to change canonical state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Focus a highlight
    Focus { id: HighlightId },
    /// Drop explicit focus
    ClearFocus,
    /// Persist a new highlight
    Create { record: HighlightRecord },
    /// Change color and/or note of a highlight
    Update {
        id: HighlightId,
        color: Option<Color>,
        annotation: Option<String>,
    },
    /// Delete a highlight
    Delete { id: HighlightId },
}

/// Access to canonical application state
pub trait CanonicalStore {
    /// Current immutable state
    fn snapshot(&self) -> Snapshot;

    /// Request a state change; the result is observed in a later snapshot
    fn dispatch(&mut self, intent: Intent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RangeAnchor;

    fn snapshot_with(ids: &[&str]) -> Snapshot {
        let records = ids
            .iter()
            .map(|id| HighlightRecord::new(*id, Color::Blue, RangeAnchor::new("p", 0, 1), "page"))
            .collect();
        Snapshot {
            records: Arc::new(records),
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_record_lookup() {
        let snapshot = snapshot_with(&["a", "b"]);
        assert!(snapshot.contains(&"a".into()));
        assert!(!snapshot.contains(&"c".into()));
        assert_eq!(snapshot.record(&"b".into()).unwrap().id.as_str(), "b");
    }

    #[test]
    fn test_state_established() {
        let mut snapshot = Snapshot::default();
        assert!(!snapshot.state_established());

        snapshot.logged_out = true;
        assert!(!snapshot.state_established());
        snapshot.page_loaded = true;
        assert!(snapshot.state_established());

        let loaded = Snapshot {
            highlights_loaded: true,
            ..Snapshot::default()
        };
        assert!(loaded.state_established());
    }

    #[test]
    fn test_search_scroll_target_is_not_a_highlight() {
        let snapshot = Snapshot {
            scroll_target: Some(ScrollTarget::Search {
                index: 0,
                element_id: "term-1".to_string(),
            }),
            ..Snapshot::default()
        };
        assert!(snapshot.highlight_scroll_target().is_none());
    }

    #[test]
    fn test_intent_serialization() {
        let intent = Intent::Focus { id: "x".into() };
        let json = serde_json::to_string(&intent).unwrap();
        assert_eq!(json, r#"{"intent":"focus","id":"x"}"#);
    }
}
