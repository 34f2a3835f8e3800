//! Deferred click and select handling
//!
//! Gestures posted by the overlay wait in a FIFO queue until the host drains
//! it. Hosts drain the queue only after the current turn's synchronous
//! callbacks have run, so a card that blurs itself in response to the same
//! click has already done so when the click is processed.
//!
//! Unsaved edits guard every focus change behind a confirmation. Nothing is
//! dispatched and the overlay is not touched until the reader confirms.
//! [`HighlightEngine::drain_deferred`] stops at a gesture that needs a
//! confirmation and hands back a [`PendingDialog`] that does not borrow the
//! engine, so update cycles keep running while the dialog is open. The
//! answered dialog is passed to [`HighlightEngine::resume`], which checks
//! the store again before acting on it.

use futures_util::future::LocalBoxFuture;
use tokio::sync::mpsc;
use tracing::debug;

use super::HighlightEngine;
use crate::models::{HighlightId, PendingHighlight};
use crate::overlay::{Gesture, GestureSender, Overlay};
use crate::snapshot::{CanonicalStore, Intent};

/// Asks the reader whether to discard unsaved highlight edits
pub trait Confirmation {
    /// Resolves `true` to proceed, `false` to abandon the gesture
    fn show_confirmation(&self) -> LocalBoxFuture<'static, bool>;
}

/// Queue of gestures waiting for the end of the turn
#[derive(Debug)]
pub(crate) struct GestureQueue {
    tx: Option<GestureSender>,
    rx: Option<mpsc::UnboundedReceiver<Gesture>>,
}

impl GestureQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
        }
    }

    pub(crate) fn sender(&self) -> Option<GestureSender> {
        self.tx.clone()
    }

    fn next(&mut self) -> Option<Gesture> {
        self.rx.as_mut()?.try_recv().ok()
    }

    pub(crate) fn len(&self) -> usize {
        self.rx.as_ref().map_or(0, |rx| rx.len())
    }

    /// Drop queued gestures and refuse new ones
    pub(crate) fn close(&mut self) {
        self.tx = None;
        if let Some(mut rx) = self.rx.take() {
            rx.close();
        }
    }
}

/// A gesture held back until the reader answers
#[derive(Debug, Clone, PartialEq)]
enum Blocked {
    Click(HighlightId),
    Select(PendingHighlight),
}

/// Confirmation dialog opened by a gesture
///
/// Await [`PendingDialog::answer`] and hand the result to
/// [`HighlightEngine::resume`]. The engine drains no further gestures until
/// it does.
#[must_use = "the gesture only completes once the answer is passed to resume"]
pub struct PendingDialog {
    gesture: Blocked,
    reply: LocalBoxFuture<'static, bool>,
}

impl PendingDialog {
    /// Wait for the reader
    pub async fn answer(self) -> AnsweredDialog {
        let confirmed = self.reply.await;
        AnsweredDialog {
            gesture: self.gesture,
            confirmed,
        }
    }
}

impl std::fmt::Debug for PendingDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDialog")
            .field("gesture", &self.gesture)
            .finish_non_exhaustive()
    }
}

/// The reader's answer to a [`PendingDialog`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredDialog {
    gesture: Blocked,
    confirmed: bool,
}

/// Result of [`HighlightEngine::drain_deferred`]
#[derive(Debug)]
pub struct Drained {
    /// Gestures taken off the queue, including one that opened a dialog
    pub processed: usize,
    pub dialog: Option<PendingDialog>,
}

impl<O, S, C> HighlightEngine<O, S, C>
where
    O: Overlay,
    S: CanonicalStore,
    C: Confirmation,
{
    /// Number of gestures waiting to run
    pub fn deferred_len(&self) -> usize {
        self.gestures.len()
    }

    /// Process queued gestures in the order they were posted
    ///
    /// Stops at the first gesture that needs a confirmation and returns its
    /// dialog. Later gestures stay queued until that dialog is resumed.
    pub fn drain_deferred(&mut self) -> Drained {
        let mut drained = Drained {
            processed: 0,
            dialog: None,
        };
        if self.dialog_open {
            return drained;
        }

        while let Some(gesture) = self.gestures.next() {
            drained.processed += 1;
            if let Some(dialog) = self.begin_gesture(gesture) {
                self.dialog_open = true;
                drained.dialog = Some(dialog);
                break;
            }
        }
        drained
    }

    /// Finish the gesture that opened a dialog
    pub fn resume(&mut self, answered: AnsweredDialog) {
        self.dialog_open = false;
        if !self.is_active(&self.store.snapshot()) {
            debug!("Highlighting disabled, dropping answered {:?}", answered.gesture);
            return;
        }

        if !answered.confirmed {
            debug!("{:?} cancelled", answered.gesture);
            self.overlay.clear_selection();
            return;
        }

        match answered.gesture {
            Blocked::Click(id) => self.finish_click(id),
            Blocked::Select(draft) => self.finish_select(draft),
        }
    }

    /// Drain the queue, waiting on each dialog in turn
    ///
    /// Returns how many gestures were processed.
    pub async fn run_deferred(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let drained = self.drain_deferred();
            processed += drained.processed;
            let Some(dialog) = drained.dialog else {
                return processed;
            };
            let answered = dialog.answer().await;
            self.resume(answered);
        }
    }

    fn begin_gesture(&mut self, gesture: Gesture) -> Option<PendingDialog> {
        if !self.is_active(&self.store.snapshot()) {
            debug!("Highlighting disabled, dropping {:?}", gesture);
            return None;
        }

        match gesture {
            Gesture::Click(id) => self.begin_click(id?),
            Gesture::Select { overlapping, draft } => self.begin_select(overlapping, draft?),
        }
    }

    fn begin_click(&mut self, id: HighlightId) -> Option<PendingDialog> {
        let snapshot = self.store.snapshot();
        if snapshot.focused.as_ref() == Some(&id) {
            return None;
        }

        let guarded = self.capabilities.editable
            && snapshot.focused.is_some()
            && snapshot.has_unsaved_highlight;
        if guarded {
            return Some(self.ask(Blocked::Click(id)));
        }

        self.store.dispatch(Intent::Focus { id });
        None
    }

    fn finish_click(&mut self, id: HighlightId) {
        // The store may have moved while the dialog was open
        let snapshot = self.store.snapshot();
        if snapshot.focused.as_ref() == Some(&id)
            || !snapshot.contains(&id)
            || !self.overlay.contains(&id)
        {
            debug!("Highlight {} changed while confirming, not focusing", id);
            return;
        }

        self.store.dispatch(Intent::Focus { id });
    }

    fn begin_select(
        &mut self,
        overlapping: Vec<HighlightId>,
        draft: PendingHighlight,
    ) -> Option<PendingDialog> {
        if !self.capabilities.editable || !overlapping.is_empty() {
            return None;
        }

        if self.store.snapshot().has_unsaved_highlight {
            return Some(self.ask(Blocked::Select(draft)));
        }

        self.finish_select(draft);
        None
    }

    fn finish_select(&mut self, draft: PendingHighlight) {
        self.store.dispatch(Intent::Focus {
            id: draft.id.clone(),
        });
        self.pending.set(draft);
    }

    fn ask(&self, gesture: Blocked) -> PendingDialog {
        debug!("Asking to confirm {:?}", gesture);
        PendingDialog {
            gesture,
            reply: self.confirmation.show_confirmation(),
        }
    }
}
