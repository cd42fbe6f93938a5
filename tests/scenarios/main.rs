//! Scenario-based tests for hubctl polling

mod helpers;

mod cancellation;
mod chained_deploy;
mod log_tail;
mod poll_lifecycle;
mod timeouts;
