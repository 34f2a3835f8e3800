//! Replay command
//!
//! Runs a scripted reading session through the engine, using the in-memory
//! store and overlay, and reports what every step did.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use margin_core::memory::{MemoryOverlay, MemoryStore, ScriptedConfirmation};
use margin_core::{
    CanonicalStore, Card, Color, Config, ErrorFlag, HighlightEngine, HighlightId,
    HighlightRecord, Intent, Overlay, RangeAnchor, ScrollTarget,
};

use crate::output::Output;
use crate::script::{Script, Step};

/// Outcome of one script step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 1-based position in the script
    pub index: usize,
    pub action: &'static str,
    /// Set for update steps: whether highlight boundaries changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Intents the store received during the step
    pub intents: Vec<Intent>,
}

/// A highlight drawn in the overlay at the end of the session
#[derive(Debug, Clone, Serialize)]
pub struct HighlightView {
    pub id: HighlightId,
    pub color: Option<Color>,
    pub focused: bool,
    pub text: Option<String>,
}

/// Final state of a replayed session
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub overlay: Vec<HighlightView>,
    pub cards: Vec<Card>,
    pub focused: Option<HighlightId>,
    pub pending: Option<HighlightId>,
    pub scroll_error: Option<HighlightId>,
}

/// Replay a script file
pub async fn replay(path: &Path, config: &Config, output: &Output) -> Result<()> {
    let script = Script::load(path).with_context(|| format!("Failed to load {:?}", path))?;
    let report = run(&script, config).await;
    output.print_replay(&report)
}

/// Run a parsed script to completion
pub async fn run(script: &Script, config: &Config) -> ReplayReport {
    info!("Replaying {} steps", script.steps.len());
    let mut session = Session::new(script, config);

    let mut steps = Vec::with_capacity(script.steps.len());
    for (i, step) in script.steps.iter().enumerate() {
        steps.push(session.step(i + 1, step).await);
    }

    let report = session.finish(steps);
    info!(
        "Replay finished with {} highlight(s) drawn",
        report.overlay.len()
    );
    report
}

struct Session {
    engine: HighlightEngine<MemoryOverlay, MemoryStore, ScriptedConfirmation>,
    store: MemoryStore,
    errors: ErrorFlag,
    location: String,
    /// Records from the script that have not been delivered yet
    held: Vec<HighlightRecord>,
}

impl Session {
    fn new(script: &Script, config: &Config) -> Self {
        let mut overlay = MemoryOverlay::new();
        for container in &script.containers {
            overlay.add_container(container.id.as_str(), container.text.as_str());
        }

        let location = config.location().to_string();
        let records: Vec<HighlightRecord> = script
            .records
            .iter()
            .cloned()
            .map(|r| r.into_record(&location))
            .collect();

        let store = MemoryStore::new();
        store.set_logged_out(script.logged_out);
        store.set_scroll_target(script.scroll_target.clone().map(ScrollTarget::highlight));
        let held = if script.loaded {
            store.receive_highlights(records);
            Vec::new()
        } else {
            records
        };

        let capabilities = script.capabilities.unwrap_or(config.capabilities);
        let confirmation = ScriptedConfirmation::new(script.confirmations.iter().copied());
        let engine =
            HighlightEngine::mount(overlay, store.clone(), confirmation, capabilities)
                .with_location(location.as_str());

        Self {
            engine,
            store,
            errors: ErrorFlag::default(),
            location,
            held,
        }
    }

    async fn step(&mut self, index: usize, step: &Step) -> StepReport {
        debug!("Step {}: {:?}", index, step);
        let mut changed = None;

        let detail = match step {
            Step::Update => {
                let result = self.engine.sync(Some(&mut self.errors));
                changed = Some(result);
                result.then(|| format!("{} highlight(s) drawn", self.engine.overlay().len()))
            }
            Step::Click { id } => {
                let delivered = self.engine.overlay().click(id.as_ref().map(|i| i.as_str()));
                if delivered {
                    Some(format!("{} gesture(s) waiting", self.engine.deferred_len()))
                } else {
                    Some("not delivered".to_string())
                }
            }
            Step::Select {
                container,
                start,
                end,
            } => {
                let anchor = RangeAnchor::new(container.as_str(), *start, *end);
                match self.engine.overlay_mut().select(anchor) {
                    Some(id) => Some(format!("drafted {}", id)),
                    None => Some("no draft".to_string()),
                }
            }
            Step::Save { color, annotation } => {
                match self.engine.save_pending(*color, annotation.clone()) {
                    Some(id) => Some(format!("saved {}", id)),
                    None => Some("nothing pending".to_string()),
                }
            }
            Step::Cancel => {
                self.engine.cancel_pending();
                None
            }
            Step::Delete { id } => {
                self.engine.remove_highlight(id);
                None
            }
            Step::Recolor { id, color } => {
                self.engine.recolor(id, *color);
                None
            }
            Step::Focus { id } => {
                self.store.dispatch(Intent::Focus { id: id.clone() });
                None
            }
            Step::Blur => {
                self.store.dispatch(Intent::ClearFocus);
                None
            }
            Step::Receive { records } => {
                let mut batch = std::mem::take(&mut self.held);
                batch.extend(records.iter().cloned().map(|r| r.into_record(&self.location)));
                let count = batch.len();
                self.store.receive_highlights(batch);
                Some(format!("{} record(s)", count))
            }
            Step::Unsaved { value } => {
                self.store.set_unsaved(*value);
                None
            }
            Step::Scroll { id } => {
                self.store
                    .set_scroll_target(id.clone().map(ScrollTarget::highlight));
                None
            }
            Step::ResolveScroll => match self.engine.scroll_target() {
                Some(target) => {
                    let id = target.id().clone();
                    target.resolve();
                    Some(format!("landed on {}", id))
                }
                None => Some("no scroll target".to_string()),
            },
            Step::RunDeferred => {
                let processed = self.engine.run_deferred().await;
                Some(format!("{} gesture(s)", processed))
            }
        };

        StepReport {
            index,
            action: step.name(),
            changed,
            detail,
            intents: self.store.take_dispatched(),
        }
    }

    fn finish(mut self, steps: Vec<StepReport>) -> ReplayReport {
        let overlay = self.engine.overlay();
        let focused_in_overlay = overlay.focused();
        let views = overlay
            .ordered_ids()
            .into_iter()
            .map(|id| HighlightView {
                color: overlay.get(&id).and_then(|h| h.style),
                focused: focused_in_overlay.as_ref() == Some(&id),
                text: overlay.text_of(&id).map(str::to_string),
                id,
            })
            .collect();

        let report = ReplayReport {
            steps,
            overlay: views,
            cards: self.engine.cards(),
            focused: self.store.focused(),
            pending: self.engine.pending().map(|p| p.id.clone()),
            scroll_error: self.errors.error.clone(),
        };

        self.engine.unmount();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            location_id: Some("chapter-2".to_string()),
            ..Config::default()
        }
    }

    const DOCUMENT: &str = r#"
[[containers]]
id = "p1"
text = "Photosynthesis converts light into chemical energy."

[[containers]]
id = "p2"
text = "Chlorophyll absorbs mostly blue and red light."
"#;

    fn script(body: &str) -> Script {
        Script::parse(&format!("{}\n{}", body, DOCUMENT)).unwrap()
    }

    #[tokio::test]
    async fn test_replay_scroll_target() {
        let script = script(
            r#"
scroll_target = "x"
records = [{ id = "x", color = "blue", container = "p2", start = 0, end = 11 }]
steps = [{ action = "update" }, { action = "resolve_scroll" }, { action = "resolve_scroll" }]
"#,
        );

        let report = run(&script, &config()).await;
        assert_eq!(report.steps[0].changed, Some(true));
        assert_eq!(
            report.steps[0].intents,
            vec![Intent::Focus { id: "x".into() }]
        );
        assert_eq!(report.steps[1].detail.as_deref(), Some("landed on x"));
        assert_eq!(report.steps[2].detail.as_deref(), Some("no scroll target"));

        assert_eq!(report.overlay.len(), 1);
        assert!(report.overlay[0].focused);
        assert_eq!(report.overlay[0].text.as_deref(), Some("Chlorophyll"));
        assert_eq!(report.focused, Some("x".into()));
    }

    #[tokio::test]
    async fn test_replay_selection_to_highlight() {
        let script = script(
            r#"
steps = [
    { action = "update" },
    { action = "select", container = "p1", start = 15, end = 23 },
    { action = "run_deferred" },
    { action = "save", color = "pink" },
    { action = "update" },
]
"#,
        );

        let report = run(&script, &config()).await;
        assert_eq!(report.steps[2].detail.as_deref(), Some("1 gesture(s)"));
        assert!(matches!(report.steps[2].intents[0], Intent::Focus { .. }));

        let Intent::Create { record } = &report.steps[3].intents[0] else {
            panic!("expected a create intent");
        };
        assert_eq!(record.color, Color::Pink);
        assert_eq!(record.location_id, "chapter-2");

        assert_eq!(report.steps[4].changed, Some(true));
        assert_eq!(report.overlay[0].text.as_deref(), Some("converts"));
        assert_eq!(report.overlay[0].color, Some(Color::Pink));
        assert_eq!(report.pending, Some(record.id.clone()));
    }

    #[tokio::test]
    async fn test_replay_missing_target_reported() {
        let script = script(
            r#"
scroll_target = "late"
loaded = false
records = [{ id = "late", container = "p1", start = 0, end = 14 }]
steps = [
    { action = "update" },
    { action = "receive" },
    { action = "update" },
    { action = "scroll", id = "nowhere" },
    { action = "update" },
]
"#,
        );

        let report = run(&script, &config()).await;
        assert_eq!(report.steps[0].changed, Some(false));
        assert_eq!(report.steps[1].detail.as_deref(), Some("1 record(s)"));
        assert_eq!(report.steps[2].changed, Some(true));
        assert_eq!(report.scroll_error, Some("nowhere".into()));
    }

    #[tokio::test]
    async fn test_replay_cancelled_click() {
        let script = script(
            r#"
confirmations = [false]
records = [
    { id = "a", container = "p1", start = 0, end = 14 },
    { id = "b", container = "p2", start = 0, end = 11 },
]
steps = [
    { action = "update" },
    { action = "focus", id = "a" },
    { action = "unsaved" },
    { action = "click", id = "b" },
    { action = "run_deferred" },
]
"#,
        );

        let report = run(&script, &config()).await;
        assert_eq!(report.steps[3].detail.as_deref(), Some("1 gesture(s) waiting"));
        assert!(report.steps[4].intents.is_empty());
        assert_eq!(report.focused, Some("a".into()));
    }

    #[tokio::test]
    async fn test_replay_read_only_capabilities() {
        let script = script(
            r#"
capabilities = { editable = false }
steps = [
    { action = "select", container = "p1", start = 0, end = 14 },
    { action = "run_deferred" },
    { action = "save" },
]
"#,
        );

        let report = run(&script, &config()).await;
        assert_eq!(report.steps[2].detail.as_deref(), Some("nothing pending"));
        assert!(report.cards.is_empty());
    }
}
