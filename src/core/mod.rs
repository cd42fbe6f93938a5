//! Core domain models
//!
//! This module defines the data structures shared by every poll: remote
//! operation snapshots, the poll session state machine, terminal-state
//! classification and the CLI configuration.

pub mod config;
pub mod condition;
pub mod snapshot;
pub mod state;

pub use condition::*;
pub use snapshot::*;
pub use state::*;
