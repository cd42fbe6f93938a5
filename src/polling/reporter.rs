//! Result reporting for poll sessions
//!
//! Every snapshot a poll observes, and every log page a tail fetches, is
//! handed to a [`ResultReporter`] as soon as it arrives. Rendering is the
//! reporter's business; the pollers never print.

use crate::api::LogPage;
use crate::core::StatusSnapshot;

/// Receives poll results as they arrive
///
/// This trait is object-safe and can be used as `&dyn ResultReporter`.
pub trait ResultReporter: Send + Sync {
    /// Called once per fetched snapshot, in fetch order
    fn on_snapshot(&self, _snapshot: &StatusSnapshot) {}

    /// Called for each non-empty page of tailed logs
    fn on_log_page(&self, _page: &LogPage) {}
}

/// Reporter that ignores everything
#[derive(Debug, Clone, Default)]
pub struct NoopReporter;

impl ResultReporter for NoopReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OperationKind, OperationState};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct TestReporter {
        states: Arc<Mutex<Vec<OperationState>>>,
    }

    impl ResultReporter for TestReporter {
        fn on_snapshot(&self, snapshot: &StatusSnapshot) {
            self.states.lock().unwrap().push(snapshot.state);
        }
    }

    #[test]
    fn test_reporter_is_object_safe() {
        let reporter = TestReporter {
            states: Arc::new(Mutex::new(Vec::new())),
        };
        let dyn_reporter: &dyn ResultReporter = &reporter;
        dyn_reporter.on_snapshot(&StatusSnapshot::new(1, OperationKind::Build, OperationState::Pending));
        dyn_reporter.on_log_page(&LogPage::empty());

        assert_eq!(*reporter.states.lock().unwrap(), vec![OperationState::Pending]);
    }

    #[test]
    fn test_noop_reporter() {
        let reporter = NoopReporter;
        reporter.on_snapshot(&StatusSnapshot::new(1, OperationKind::Deploy, OperationState::Success));
    }
}
