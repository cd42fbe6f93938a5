//! Status snapshots of remote operations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Opaque identifier of a remote operation
///
/// Builds are numbered, deploys and validations use string task ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationId::Numeric(id) => write!(f, "{}", id),
            OperationId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for OperationId {
    fn from(id: u64) -> Self {
        OperationId::Numeric(id)
    }
}

impl From<&str> for OperationId {
    fn from(id: &str) -> Self {
        OperationId::Text(id.to_string())
    }
}

impl From<String> for OperationId {
    fn from(id: String) -> Self {
        OperationId::Text(id)
    }
}

impl OperationId {
    /// Read an id out of a JSON value (number or string)
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(OperationId::Numeric),
            Value::String(s) if !s.is_empty() => Some(OperationId::Text(s.clone())),
            _ => None,
        }
    }
}

/// Semantic state bucket every remote status collapses into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Pending,
    InProgress,
    Success,
    Failure,
    PartialFailure,
}

impl OperationState {
    /// Whether polling stops once this state is observed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Success | OperationState::Failure | OperationState::PartialFailure
        )
    }
}

/// Kind of remote operation, each with its own status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Build,
    Deploy,
    Validation,
    FunctionBuild,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Build => "build",
            OperationKind::Deploy => "deploy",
            OperationKind::Validation => "validation",
            OperationKind::FunctionBuild => "function build",
        };
        f.write_str(name)
    }
}

impl OperationKind {
    /// Map a remote status string to its semantic bucket
    pub fn state_for(&self, status: &str) -> OperationState {
        match status.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "ENQUEUED" | "QUEUED" | "REQUESTED" | "NOT_STARTED" => {
                OperationState::Pending
            }
            "IN_PROGRESS" | "BUILDING" | "DEPLOYING" | "RUNNING" | "PROCESSING" => {
                OperationState::InProgress
            }
            "SUCCESS" | "SUCCEEDED" | "COMPLETE" | "COMPLETED" | "DONE" => OperationState::Success,
            "FAILURE" | "FAILED" | "ERROR" => OperationState::Failure,
            "PARTIAL_FAILURE" | "PARTIALLY_FAILED" => OperationState::PartialFailure,
            other => {
                warn!("Unknown {} status '{}', treating as in progress", self, other);
                OperationState::InProgress
            }
        }
    }

    /// JSON field holding the list of sub-operations, and the name field inside each entry
    fn sub_operation_fields(&self) -> Option<(&'static str, &'static str)> {
        match self {
            OperationKind::Build => Some(("subbuildStatuses", "buildName")),
            OperationKind::Deploy => Some(("subdeployStatuses", "deployName")),
            OperationKind::Validation | OperationKind::FunctionBuild => None,
        }
    }

    /// Decode a raw status payload into a snapshot
    ///
    /// Returns `None` when the payload carries no `status` field.
    pub fn snapshot(&self, operation_id: OperationId, raw: Value) -> Option<StatusSnapshot> {
        let status = raw.get("status")?.as_str()?.to_string();
        let state = self.state_for(&status);

        let sub_operations = self
            .sub_operation_fields()
            .and_then(|(list, name)| {
                raw.get(list).and_then(Value::as_array).map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| SubOperation::from_json(*self, entry, name))
                        .collect()
                })
            })
            .unwrap_or_default();

        let error_message = raw
            .get("errorReason")
            .or_else(|| raw.get("errorMessage"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(StatusSnapshot {
            operation_id,
            kind: *self,
            status,
            state,
            sub_operations,
            error_message,
            raw,
        })
    }
}

/// A named constituent of a larger operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubOperation {
    pub name: String,
    pub state: OperationState,
    pub error_message: Option<String>,
}

impl SubOperation {
    pub fn new(name: impl Into<String>, state: OperationState) -> Self {
        Self {
            name: name.into(),
            state,
            error_message: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    fn from_json(kind: OperationKind, entry: &Value, name_field: &str) -> Option<Self> {
        let name = entry.get(name_field)?.as_str()?.to_string();
        let state = entry
            .get("status")
            .and_then(Value::as_str)
            .map(|s| kind.state_for(s))
            .unwrap_or(OperationState::Pending);
        let error_message = entry
            .get("errorMessage")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self {
            name,
            state,
            error_message,
        })
    }

    pub fn is_failed(&self) -> bool {
        self.state == OperationState::Failure
    }
}

/// One point-in-time status read of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    /// Status string exactly as reported by the remote
    pub status: String,
    pub state: OperationState,
    pub sub_operations: Vec<SubOperation>,
    /// Top-level error detail, when the remote supplies one
    pub error_message: Option<String>,
    /// Unmodified response payload
    pub raw: Value,
}

impl StatusSnapshot {
    /// Build a snapshot directly from a state, mostly useful for fakes
    pub fn new(operation_id: impl Into<OperationId>, kind: OperationKind, state: OperationState) -> Self {
        let status = match state {
            OperationState::Pending => "PENDING",
            OperationState::InProgress => "IN_PROGRESS",
            OperationState::Success => "SUCCESS",
            OperationState::Failure => "FAILURE",
            OperationState::PartialFailure => "PARTIAL_FAILURE",
        };
        Self {
            operation_id: operation_id.into(),
            kind,
            status: status.to_string(),
            state,
            sub_operations: Vec::new(),
            error_message: None,
            raw: serde_json::json!({ "status": status }),
        }
    }

    pub fn with_sub_operations(mut self, sub_operations: Vec<SubOperation>) -> Self {
        self.sub_operations = sub_operations;
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn failed_sub_operations(&self) -> Vec<&SubOperation> {
        self.sub_operations.iter().filter(|s| s.is_failed()).collect()
    }

    /// Count of sub-operations that reached a terminal state
    pub fn finished_sub_operations(&self) -> usize {
        self.sub_operations
            .iter()
            .filter(|s| s.state.is_terminal())
            .count()
    }

    /// Deploy task started automatically by a successful build, if any
    pub fn auto_deploy_locator(&self) -> Option<OperationId> {
        let enabled = self
            .raw
            .get("isAutoDeployEnabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !enabled {
            return None;
        }
        self.raw
            .get("deployStatusTaskLocator")
            .and_then(|locator| locator.get("id"))
            .and_then(OperationId::from_json)
    }
}
