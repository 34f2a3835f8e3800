//! Anchoring errors
//!
//! An anchor failure means a stored range no longer matches the document
//! content. The update cycle skips such records instead of failing.

use thiserror::Error;

use crate::models::{HighlightId, RangeAnchor};

/// Errors an overlay reports when it cannot draw a highlight
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    /// The element the range points into is not in the document
    #[error("Container '{container}' not found in document")]
    MissingContainer { container: String },

    /// The range extends past the end of the container's text
    #[error("Range {start}..{end} exceeds container '{container}' (length {len})")]
    OutOfBounds {
        container: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// The range ends before it starts, or is empty
    #[error("Range {start}..{end} in '{container}' is empty or inverted")]
    Inverted {
        container: String,
        start: usize,
        end: usize,
    },

    /// A highlight with this id is already drawn
    #[error("Highlight '{0}' is already anchored")]
    AlreadyAnchored(HighlightId),
}

impl AnchorError {
    /// Check a range against a container's text length
    pub fn check(anchor: &RangeAnchor, len: usize) -> Result<(), AnchorError> {
        if anchor.end <= anchor.start {
            return Err(AnchorError::Inverted {
                container: anchor.container.clone(),
                start: anchor.start,
                end: anchor.end,
            });
        }
        if anchor.end > len {
            return Err(AnchorError::OutOfBounds {
                container: anchor.container.clone(),
                start: anchor.start,
                end: anchor.end,
                len,
            });
        }
        Ok(())
    }

    /// Whether the document changed underneath the stored range
    ///
    /// Stale anchors are expected after content revisions and are only
    /// worth a debug log.
    pub fn is_stale_content(&self) -> bool {
        matches!(
            self,
            AnchorError::MissingContainer { .. } | AnchorError::OutOfBounds { .. }
        )
    }
}

/// Result type for anchoring
pub type AnchorResult<T> = Result<T, AnchorError>;
