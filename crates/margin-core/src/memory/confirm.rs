//! Confirmation dialogs without a UI

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures_util::future::{self, FutureExt, LocalBoxFuture};
use tokio::sync::oneshot;

use crate::engine::Confirmation;

/// Answers dialogs from a queue; an empty queue answers "cancel"
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirmation {
    answers: Rc<RefCell<VecDeque<bool>>>,
    asked: Rc<Cell<usize>>,
}

impl ScriptedConfirmation {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Rc::new(RefCell::new(answers.into_iter().collect())),
            asked: Rc::default(),
        }
    }

    /// Queue the answer for a future dialog
    pub fn push(&self, answer: bool) {
        self.answers.borrow_mut().push_back(answer);
    }

    /// How many dialogs were shown
    pub fn asked(&self) -> usize {
        self.asked.get()
    }
}

impl Confirmation for ScriptedConfirmation {
    fn show_confirmation(&self) -> LocalBoxFuture<'static, bool> {
        self.asked.set(self.asked.get() + 1);
        let answer = self.answers.borrow_mut().pop_front().unwrap_or(false);
        future::ready(answer).boxed_local()
    }
}

/// Dialogs stay open until answered through a handle
///
/// Dropping an unanswered dialog counts as cancelling it.
#[derive(Debug, Clone, Default)]
pub struct DeferredConfirmation {
    open: Rc<RefCell<VecDeque<oneshot::Sender<bool>>>>,
}

impl DeferredConfirmation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dialogs waiting for an answer
    pub fn open_dialogs(&self) -> usize {
        self.open.borrow().len()
    }

    /// Answer the oldest open dialog; returns false if none was open
    pub fn answer(&self, confirmed: bool) -> bool {
        match self.open.borrow_mut().pop_front() {
            Some(tx) => tx.send(confirmed).is_ok(),
            None => false,
        }
    }
}

impl Confirmation for DeferredConfirmation {
    fn show_confirmation(&self) -> LocalBoxFuture<'static, bool> {
        let (tx, rx) = oneshot::channel();
        self.open.borrow_mut().push_back(tx);
        async move { rx.await.unwrap_or(false) }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_answers_in_order() {
        let confirm = ScriptedConfirmation::new([true]);
        assert!(confirm.show_confirmation().await);
        assert!(!confirm.show_confirmation().await);
        assert_eq!(confirm.asked(), 2);
    }

    #[tokio::test]
    async fn test_deferred_waits_for_answer() {
        let confirm = DeferredConfirmation::new();
        let dialog = confirm.show_confirmation();
        assert_eq!(confirm.open_dialogs(), 1);

        assert!(confirm.answer(true));
        assert!(dialog.await);
        assert!(!confirm.answer(true));
    }

    #[tokio::test]
    async fn test_dropped_dialog_cancels() {
        let confirm = DeferredConfirmation::new();
        let dialog = confirm.show_confirmation();
        confirm.open.borrow_mut().clear();
        assert!(!dialog.await);
    }
}
