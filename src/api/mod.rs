//! Remote API boundary
//!
//! The poller only ever talks to the traits in this module. `ApiClient`
//! is the HTTP implementation; tests substitute scripted fakes.

pub mod client;
pub mod fetchers;
pub mod response;

use crate::core::{OperationId, StatusSnapshot};
use async_trait::async_trait;
pub use client::{ApiClient, ApiClientConfig};
pub use fetchers::{
    BuildStatusFetcher, DeployStatusFetcher, FunctionBuildFetcher, RouteLogSource,
    ValidationStatusFetcher,
};
pub use response::{ApiError, Cursor, LogEntry, LogPage};

/// Performs exactly one remote status check per call
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self, operation_id: &OperationId) -> Result<StatusSnapshot, ApiError>;
}

/// Source of paged execution logs for the tailing poller
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Most recent log entry, `None` if nothing was ever logged
    async fn fetch_latest(&self) -> Result<Option<LogEntry>, ApiError>;

    /// Entries after `after` (or the first page when `None`)
    async fn fetch_page(&self, after: Option<&Cursor>) -> Result<LogPage, ApiError>;
}
