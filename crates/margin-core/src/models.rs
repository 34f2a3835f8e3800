//! Data models for margin
//!
//! Defines the highlight records held by the canonical store, the draft
//! created by a text selection, and the navigation scroll target.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a highlight, shared by canonical records and the overlay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct HighlightId(pub String);

impl HighlightId {
    /// Generate a fresh id for a selection-created draft
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HighlightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for HighlightId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HighlightId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Highlight color, doubling as the overlay's visual style
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
}

impl Color {
    /// First style offered to a new highlight
    pub const DEFAULT: Color = Color::Yellow;

    /// All colors in picker order
    pub const ALL: [Color; 5] = [
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Pink,
    ];

    /// Lowercase label, matching the serialized form
    pub fn label(&self) -> &'static str {
        match self {
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Pink => "pink",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}


/// Serialized description of a text range
///
/// Only overlays interpret this; the engine passes it through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RangeAnchor {
    /// Id of the document element holding the text
    pub container: String,
    /// Character offset where the range starts
    pub start: usize,
    /// Character offset where the range ends (exclusive)
    pub end: usize,
}

impl RangeAnchor {
    pub fn new(container: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            container: container.into(),
            start,
            end,
        }
    }
}

/// A canonical highlight, owned by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighlightRecord {
    /// Unique within one page's collection
    pub id: HighlightId,
    /// Highlight color
    pub color: Color,
    /// Optional note attached to the highlight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Where the highlight sits in the document
    pub anchor: RangeAnchor,
    /// Page (location) the highlight belongs to
    pub location_id: String,
}

impl HighlightRecord {
    /// Create a record without an annotation
    pub fn new(
        id: impl Into<HighlightId>,
        color: Color,
        anchor: RangeAnchor,
        location_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            color,
            annotation: None,
            anchor,
            location_id: location_id.into(),
        }
    }

    /// Update the color
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Update the note; an empty note removes it
    pub fn set_annotation(&mut self, annotation: Option<String>) {
        self.annotation = annotation.filter(|a| !a.is_empty());
    }
}

/// A highlight drafted from a text selection, not yet persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingHighlight {
    pub id: HighlightId,
    pub anchor: RangeAnchor,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub annotation: Option<String>,
}

impl PendingHighlight {
    /// Draft a highlight over `anchor` with a freshly generated id
    pub fn draft(anchor: RangeAnchor) -> Self {
        Self::with_id(HighlightId::generate(), anchor)
    }

    /// Draft a highlight with a specific id
    pub fn with_id(id: impl Into<HighlightId>, anchor: RangeAnchor) -> Self {
        Self {
            id: id.into(),
            anchor,
            color: None,
            annotation: None,
        }
    }

    /// Turn the draft into the record that gets persisted
    pub fn into_record(self, color: Color, location_id: impl Into<String>) -> HighlightRecord {
        let mut record = HighlightRecord::new(self.id, color, self.anchor, location_id);
        record.set_annotation(self.annotation);
        record
    }
}

/// Navigation request to land on an element when a page loads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScrollTarget {
    /// Land on a stored highlight (shared links)
    Highlight { id: HighlightId },
    /// Land on a search hit; handled by search tooling
    Search { index: usize, element_id: String },
}

impl ScrollTarget {
    pub fn highlight(id: impl Into<HighlightId>) -> Self {
        ScrollTarget::Highlight { id: id.into() }
    }

    /// The highlight id, if this target points at a highlight
    pub fn highlight_id(&self) -> Option<&HighlightId> {
        match self {
            ScrollTarget::Highlight { id } => Some(id),
            ScrollTarget::Search { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = HighlightId::generate();
        let b = HighlightId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_color_labels() {
        assert_eq!(Color::DEFAULT.to_string(), "yellow");
        assert_eq!(Color::Pink.label(), "pink");
        assert_eq!(Color::ALL.len(), 5);
    }

    #[test]
    fn test_empty_annotation_is_dropped() {
        let mut record =
            HighlightRecord::new("a", Color::Blue, RangeAnchor::new("p1", 0, 4), "page-1");
        record.set_annotation(Some("note".to_string()));
        assert_eq!(record.annotation.as_deref(), Some("note"));

        record.set_annotation(Some(String::new()));
        assert!(record.annotation.is_none());
    }

    #[test]
    fn test_pending_into_record() {
        let mut draft = PendingHighlight::with_id("d", RangeAnchor::new("p2", 3, 9));
        draft.annotation = Some("remember this".to_string());

        let record = draft.into_record(Color::Green, "page-7");
        assert_eq!(record.id, HighlightId::from("d"));
        assert_eq!(record.color, Color::Green);
        assert_eq!(record.anchor, RangeAnchor::new("p2", 3, 9));
        assert_eq!(record.location_id, "page-7");
        assert_eq!(record.annotation.as_deref(), Some("remember this"));
    }

    #[test]
    fn test_scroll_target_serialization() {
        let target = ScrollTarget::highlight("abc");
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, r#"{"type":"highlight","id":"abc"}"#);

        let search: ScrollTarget =
            serde_json::from_str(r#"{"type":"search","index":2,"element_id":"term-3"}"#).unwrap();
        assert!(search.highlight_id().is_none());
    }

    #[test]
    fn test_record_serialization_skips_missing_annotation() {
        let record = HighlightRecord::new("a", Color::Blue, RangeAnchor::new("p1", 0, 4), "page");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("annotation"));
        let parsed: HighlightRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
