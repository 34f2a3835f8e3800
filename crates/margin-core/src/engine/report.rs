//! Scroll-target error reporting
//!
//! A scroll target whose highlight cannot be found is surfaced through
//! [`UpdateHooks`]; a later cycle that finds it clears the error.

use tracing::warn;

use crate::models::HighlightId;

/// Caller-provided error callbacks for an update cycle
pub trait UpdateHooks {
    /// The requested highlight is not in the document
    fn set_error(&mut self, id: &HighlightId);

    /// A previously reported miss has been resolved
    fn clear_error(&mut self);
}

/// Remembers which miss is outstanding so hooks fire once per transition
#[derive(Debug, Default)]
pub struct ScrollTargetReporter {
    reported: Option<HighlightId>,
}

impl ScrollTargetReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of resolving `target` this cycle
    pub fn report(&mut self, target: &HighlightId, resolved: bool, hooks: &mut dyn UpdateHooks) {
        if resolved {
            if self.reported.take().is_some() {
                hooks.clear_error();
            }
            return;
        }

        if self.reported.as_ref() != Some(target) {
            warn!("Scroll target highlight {} not found", target);
            hooks.set_error(target);
            self.reported = Some(target.clone());
        }
    }

    pub fn reset(&mut self) {
        self.reported = None;
    }
}

/// [`UpdateHooks`] that keeps the current error and counts calls
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorFlag {
    pub error: Option<HighlightId>,
    pub set_calls: usize,
    pub clear_calls: usize,
}

impl UpdateHooks for ErrorFlag {
    fn set_error(&mut self, id: &HighlightId) {
        self.error = Some(id.clone());
        self.set_calls += 1;
    }

    fn clear_error(&mut self) {
        self.error = None;
        self.clear_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_reported_once() {
        let mut reporter = ScrollTargetReporter::new();
        let mut flag = ErrorFlag::default();
        let x = HighlightId::from("x");

        reporter.report(&x, false, &mut flag);
        reporter.report(&x, false, &mut flag);

        assert_eq!(flag.error, Some(x));
        assert_eq!(flag.set_calls, 1);
    }

    #[test]
    fn test_resolution_clears_outstanding_miss() {
        let mut reporter = ScrollTargetReporter::new();
        let mut flag = ErrorFlag::default();
        let x = HighlightId::from("x");

        reporter.report(&x, false, &mut flag);
        reporter.report(&x, true, &mut flag);
        assert!(flag.error.is_none());
        assert_eq!(flag.clear_calls, 1);

        // Nothing outstanding, nothing to clear
        reporter.report(&x, true, &mut flag);
        assert_eq!(flag.clear_calls, 1);
    }

    #[test]
    fn test_new_target_is_reported() {
        let mut reporter = ScrollTargetReporter::new();
        let mut flag = ErrorFlag::default();

        reporter.report(&"x".into(), false, &mut flag);
        reporter.report(&"y".into(), false, &mut flag);

        assert_eq!(flag.error, Some("y".into()));
        assert_eq!(flag.set_calls, 2);
    }
}
