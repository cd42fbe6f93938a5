//! Poll session state models

use crate::core::snapshot::{StatusSnapshot, SubOperation};
use serde::{Deserialize, Serialize};

/// State of a single polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Session created, no fetch dispatched yet
    Started,
    /// At least one fetch dispatched, no terminal snapshot yet
    Polling,
    /// Remote operation reported success
    Succeeded,
    /// Remote operation reported failure with no failed sub-operations
    Failed,
    /// Remote operation failed in one or more sub-operations
    PartiallyFailed,
    /// Local ceiling exceeded
    TimedOut,
    /// The status fetch itself failed
    Errored,
    /// Cancellation observed at a scheduling boundary
    Cancelled,
}

impl SessionState {
    /// Check if the session is in a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Started | SessionState::Polling)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Started, Polling) | (Started, Cancelled) => true,
            (Polling, Polling)
            | (Polling, Succeeded)
            | (Polling, Failed)
            | (Polling, PartiallyFailed)
            | (Polling, TimedOut)
            | (Polling, Errored)
            | (Polling, Cancelled) => true,
            _ => false,
        }
    }

    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::for_state(*self)
    }
}

/// Process exit classification derived from a final session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn for_state(state: SessionState) -> Self {
        match state {
            SessionState::Succeeded | SessionState::Cancelled => ExitStatus::Success,
            _ => ExitStatus::Failure,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == ExitStatus::Success
    }

    /// Combine two results: any failure wins
    pub fn and(self, other: ExitStatus) -> ExitStatus {
        if self.is_success() {
            other
        } else {
            ExitStatus::Failure
        }
    }
}

/// Resolved result of a poll
///
/// Remote failures resolve rather than reject so the caller can decide
/// how to present sub-operation detail.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(StatusSnapshot),
    Failed(StatusSnapshot),
    PartiallyFailed(StatusSnapshot),
    Cancelled {
        last_snapshot: Option<StatusSnapshot>,
    },
}

impl PollOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            PollOutcome::Succeeded(_) => SessionState::Succeeded,
            PollOutcome::Failed(_) => SessionState::Failed,
            PollOutcome::PartiallyFailed(_) => SessionState::PartiallyFailed,
            PollOutcome::Cancelled { .. } => SessionState::Cancelled,
        }
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            PollOutcome::Succeeded(s) | PollOutcome::Failed(s) | PollOutcome::PartiallyFailed(s) => {
                Some(s)
            }
            PollOutcome::Cancelled { last_snapshot } => last_snapshot.as_ref(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Succeeded(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PollOutcome::Failed(_) | PollOutcome::PartiallyFailed(_))
    }

    pub fn failed_sub_operations(&self) -> Vec<&SubOperation> {
        self.snapshot()
            .map(StatusSnapshot::failed_sub_operations)
            .unwrap_or_default()
    }

    pub fn exit_status(&self) -> ExitStatus {
        self.state().exit_status()
    }
}
