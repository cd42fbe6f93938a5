//! Per-kind status fetchers backed by `ApiClient`

use crate::api::{ApiClient, ApiError, Cursor, LogEntry, LogPage, LogSource, StatusFetcher};
use crate::core::{OperationId, OperationKind, StatusSnapshot};
use async_trait::async_trait;
use serde_json::Value;

/// Turn a raw status payload into a snapshot, or a decode error
fn decode(kind: OperationKind, operation_id: &OperationId, raw: Value) -> Result<StatusSnapshot, ApiError> {
    kind.snapshot(operation_id.clone(), raw).ok_or_else(|| {
        ApiError::decode(
            &format!("{} {}", kind, operation_id),
            "status payload has no 'status' field",
        )
    })
}

/// Polls the status of a project build
#[derive(Debug, Clone)]
pub struct BuildStatusFetcher {
    client: ApiClient,
    project: String,
}

impl BuildStatusFetcher {
    pub fn new(client: ApiClient, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
        }
    }
}

#[async_trait]
impl StatusFetcher for BuildStatusFetcher {
    async fn fetch_status(&self, operation_id: &OperationId) -> Result<StatusSnapshot, ApiError> {
        let raw = self.client.fetch_build_status(&self.project, operation_id).await?;
        decode(OperationKind::Build, operation_id, raw)
    }
}

/// Polls the status of a project deploy
#[derive(Debug, Clone)]
pub struct DeployStatusFetcher {
    client: ApiClient,
    project: String,
}

impl DeployStatusFetcher {
    pub fn new(client: ApiClient, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
        }
    }
}

#[async_trait]
impl StatusFetcher for DeployStatusFetcher {
    async fn fetch_status(&self, operation_id: &OperationId) -> Result<StatusSnapshot, ApiError> {
        let raw = self.client.fetch_deploy_status(&self.project, operation_id).await?;
        decode(OperationKind::Deploy, operation_id, raw)
    }
}

/// Polls a marketplace asset validation
#[derive(Debug, Clone)]
pub struct ValidationStatusFetcher {
    client: ApiClient,
}

impl ValidationStatusFetcher {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusFetcher for ValidationStatusFetcher {
    async fn fetch_status(&self, operation_id: &OperationId) -> Result<StatusSnapshot, ApiError> {
        let raw = self.client.fetch_validation_status(operation_id).await?;
        decode(OperationKind::Validation, operation_id, raw)
    }
}

/// Polls a serverless function package build
#[derive(Debug, Clone)]
pub struct FunctionBuildFetcher {
    client: ApiClient,
}

impl FunctionBuildFetcher {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusFetcher for FunctionBuildFetcher {
    async fn fetch_status(&self, operation_id: &OperationId) -> Result<StatusSnapshot, ApiError> {
        let raw = self.client.fetch_function_build(operation_id).await?;
        decode(OperationKind::FunctionBuild, operation_id, raw)
    }
}

/// Execution logs of one function route
#[derive(Debug, Clone)]
pub struct RouteLogSource {
    client: ApiClient,
    route: String,
    limit: Option<u32>,
}

impl RouteLogSource {
    pub fn new(client: ApiClient, route: impl Into<String>) -> Self {
        Self {
            client,
            route: route.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl LogSource for RouteLogSource {
    async fn fetch_latest(&self) -> Result<Option<LogEntry>, ApiError> {
        self.client.fetch_latest_log(&self.route).await
    }

    async fn fetch_page(&self, after: Option<&Cursor>) -> Result<LogPage, ApiError> {
        self.client.fetch_logs(&self.route, after, self.limit).await
    }
}
