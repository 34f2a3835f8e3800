//! margin core library
//!
//! This crate keeps a live overlay of reader highlights drawn into a page
//! consistent with the canonical highlight records held in application
//! state.
//!
//! # Architecture
//!
//! - **Canonical store**: immutable snapshots of highlight records, changed
//!   only through dispatched intents
//! - **Overlay**: mutable set of highlights drawn into the document
//! - **Engine**: reconciles the two once per state change, owns the pending
//!   draft and arbitrates focus
//!
//! # Quick Start
//!
//! ```text
//! let mut engine = HighlightEngine::mount(overlay, store, confirmation, Capabilities::default());
//!
//! // After every state change
//! if engine.sync(Some(&mut error_flag)) {
//!     render(engine.cards());
//! }
//!
//! // At the end of each UI turn
//! engine.run_deferred().await;
//! ```
//!
//! # Modules
//!
//! - `engine`: update cycle, pending slot, focus arbitration, gestures
//! - `models`: highlight records, drafts, scroll targets
//! - `snapshot`: canonical store seam
//! - `overlay`: overlay seam and gestures
//! - `memory`: in-memory store, overlay and confirmations
//! - `config`: capabilities and configuration loading

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod models;
pub mod overlay;
pub mod snapshot;

pub use config::{Capabilities, Config};
pub use engine::{
    AnsweredDialog, Card, Confirmation, Drained, ErrorFlag, HighlightEngine, PendingDialog,
    ScrollTargetHandle, UpdateHooks,
};
pub use error::AnchorError;
pub use models::{Color, HighlightId, HighlightRecord, PendingHighlight, RangeAnchor, ScrollTarget};
pub use overlay::{AnchoredHighlight, Gesture, GestureSender, Overlay};
pub use snapshot::{CanonicalStore, Intent, Snapshot};
