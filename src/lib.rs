//! hubctl - command-line client for developer platform builds, deploys and logs

pub mod api;
pub mod cli;
pub mod core;
pub mod polling;
pub mod project;

// Re-export commonly used types
pub use api::{ApiClient, ApiClientConfig, ApiError, LogSource, StatusFetcher};
pub use core::{ExitStatus, OperationId, OperationKind, OperationState, PollOutcome, SessionState, StatusSnapshot};
pub use polling::{PollError, PollOptions, Poller, ResultReporter, TailPoller};
