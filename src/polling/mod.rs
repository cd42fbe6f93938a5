//! Long-running operation polling

pub mod chain;
pub mod poller;
pub mod reporter;
pub mod tail;

pub use chain::{auto_deploy_target, poll_build_then_deploy, ChainHooks, ChainOutcome, Stage};
pub use poller::{PollError, PollOptions, PollSession, Poller};
pub use reporter::{NoopReporter, ResultReporter};
pub use tail::{TailPoller, TailSummary};
