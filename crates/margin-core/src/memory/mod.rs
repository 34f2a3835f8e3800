//! In-memory collaborators
//!
//! Reference implementations of the store, overlay and confirmation seams.
//! The CLI replays sessions against them and the engine tests use them.

mod confirm;
mod overlay;
mod store;

pub use confirm::{DeferredConfirmation, ScriptedConfirmation};
pub use overlay::{MemoryOverlay, Mutation};
pub use store::MemoryStore;
