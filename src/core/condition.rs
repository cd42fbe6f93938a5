//! Terminal-state classification of status snapshots

use crate::core::snapshot::{OperationState, StatusSnapshot};
use crate::core::state::SessionState;

/// What the poller should do after observing a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not terminal yet, schedule another fetch
    Continue,
    /// Remote operation finished successfully
    Succeeded,
    /// Remote operation failed with no failed sub-operations to report
    Failed,
    /// Remote operation failed in one or more sub-operations
    PartiallyFailed,
}

impl Classification {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Classification::Continue)
    }

    /// Session state reached by this classification
    pub fn session_state(&self) -> SessionState {
        match self {
            Classification::Continue => SessionState::Polling,
            Classification::Succeeded => SessionState::Succeeded,
            Classification::Failed => SessionState::Failed,
            Classification::PartiallyFailed => SessionState::PartiallyFailed,
        }
    }
}

/// Decides whether polling continues and, if not, how the operation ended
pub trait TerminalClassifier: Send + Sync {
    fn classify(&self, snapshot: &StatusSnapshot) -> Classification;
}

/// Classifier shared by build, deploy and validation polls
///
/// A FAILURE with any failed sub-operation is a partial failure so the
/// caller can report per-component detail.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

impl TerminalClassifier for StandardClassifier {
    fn classify(&self, snapshot: &StatusSnapshot) -> Classification {
        match snapshot.state {
            OperationState::Pending | OperationState::InProgress => Classification::Continue,
            OperationState::Success => Classification::Succeeded,
            OperationState::PartialFailure => Classification::PartiallyFailed,
            OperationState::Failure => {
                if snapshot.sub_operations.iter().any(|s| s.is_failed()) {
                    Classification::PartiallyFailed
                } else {
                    Classification::Failed
                }
            }
        }
    }
}

impl<F> TerminalClassifier for F
where
    F: Fn(&StatusSnapshot) -> Classification + Send + Sync,
{
    fn classify(&self, snapshot: &StatusSnapshot) -> Classification {
        self(snapshot)
    }
}
