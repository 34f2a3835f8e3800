//! Replay scripts
//!
//! A script describes a page (its text containers and stored highlights)
//! and a sequence of reader actions to run against the engine.
//!
//! ```toml
//! confirmations = [false]
//! scroll_target = "a"
//!
//! [[containers]]
//! id = "p1"
//! text = "Photosynthesis converts light into chemical energy."
//!
//! [[records]]
//! id = "a"
//! color = "blue"
//! container = "p1"
//! start = 0
//! end = 14
//!
//! [[steps]]
//! action = "update"
//!
//! [[steps]]
//! action = "click"
//! id = "a"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use margin_core::{Capabilities, Color, HighlightId, HighlightRecord, RangeAnchor};

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Script has no text containers")]
    NoContainers,

    #[error("Container '{0}' is defined twice")]
    DuplicateContainer(String),

    #[error("Highlight '{0}' is defined twice")]
    DuplicateRecord(HighlightId),
}

/// A block of page text highlights can be anchored in
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSpec {
    pub id: String,
    pub text: String,
}

/// A stored highlight, flattened for easy writing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordSpec {
    pub id: HighlightId,
    #[serde(default = "default_color")]
    pub color: Color,
    pub container: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
}

impl RecordSpec {
    pub fn into_record(self, default_location: &str) -> HighlightRecord {
        let location = self
            .location_id
            .unwrap_or_else(|| default_location.to_string());
        let mut record = HighlightRecord::new(
            self.id,
            self.color,
            RangeAnchor::new(self.container, self.start, self.end),
            location,
        );
        record.set_annotation(self.annotation);
        record
    }
}

/// One reader or host action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Run an update cycle
    Update,
    /// Click a highlight, or plain text when `id` is omitted
    Click {
        #[serde(default)]
        id: Option<HighlightId>,
    },
    /// Select a text range
    Select {
        container: String,
        start: usize,
        end: usize,
    },
    /// Save the pending draft
    Save {
        #[serde(default = "default_color")]
        color: Color,
        #[serde(default)]
        annotation: Option<String>,
    },
    /// Discard the pending draft
    Cancel,
    Delete {
        id: HighlightId,
    },
    Recolor {
        id: HighlightId,
        color: Color,
    },
    /// Focus a highlight from its card
    Focus {
        id: HighlightId,
    },
    /// A card gives up focus
    Blur,
    /// Highlights arrive from the server
    Receive {
        #[serde(default)]
        records: Vec<RecordSpec>,
    },
    /// Mark the focused highlight as having unsaved edits (or not)
    Unsaved {
        #[serde(default = "default_true")]
        value: bool,
    },
    /// Navigate to a highlight, or clear the target when `id` is omitted
    Scroll {
        #[serde(default)]
        id: Option<HighlightId>,
    },
    /// Land on the scroll target
    ResolveScroll,
    /// End the turn: process queued clicks and selections
    RunDeferred,
}

impl Step {
    /// Action name as written in scripts
    pub fn name(&self) -> &'static str {
        match self {
            Step::Update => "update",
            Step::Click { .. } => "click",
            Step::Select { .. } => "select",
            Step::Save { .. } => "save",
            Step::Cancel => "cancel",
            Step::Delete { .. } => "delete",
            Step::Recolor { .. } => "recolor",
            Step::Focus { .. } => "focus",
            Step::Blur => "blur",
            Step::Receive { .. } => "receive",
            Step::Unsaved { .. } => "unsaved",
            Step::Scroll { .. } => "scroll",
            Step::ResolveScroll => "resolve_scroll",
            Step::RunDeferred => "run_deferred",
        }
    }
}

/// A complete replay scenario
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub containers: Vec<ContainerSpec>,

    /// Highlights already stored for the page
    #[serde(default)]
    pub records: Vec<RecordSpec>,

    /// Whether stored highlights have been received before the first step
    #[serde(default = "default_true")]
    pub loaded: bool,

    #[serde(default)]
    pub logged_out: bool,

    #[serde(default)]
    pub scroll_target: Option<HighlightId>,

    /// Answers given to confirmation dialogs, in order
    #[serde(default)]
    pub confirmations: Vec<bool>,

    /// Overrides the configured capabilities
    #[serde(default)]
    pub capabilities: Option<Capabilities>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    /// Load and validate a script file
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a script
    pub fn parse(content: &str) -> Result<Self, ScriptError> {
        let script: Script = toml::from_str(content)?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<(), ScriptError> {
        if self.containers.is_empty() {
            return Err(ScriptError::NoContainers);
        }

        let mut containers = HashSet::new();
        for container in &self.containers {
            if !containers.insert(container.id.as_str()) {
                return Err(ScriptError::DuplicateContainer(container.id.clone()));
            }
        }

        let mut records = HashSet::new();
        for record in &self.records {
            if !records.insert(&record.id) {
                return Err(ScriptError::DuplicateRecord(record.id.clone()));
            }
        }
        Ok(())
    }
}

fn default_color() -> Color {
    Color::DEFAULT
}

fn default_true() -> bool {
    true
}
