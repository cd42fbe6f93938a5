//! API error and response types

use crate::core::OperationId;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error types for API operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status
    #[error("{method} {path} failed with status {status}: {message}")]
    Http {
        status: u16,
        method: String,
        path: String,
        message: String,
    },

    /// The request never produced a response (connection, TLS, timeout)
    #[error("Request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not have the expected shape
    #[error("Unexpected response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    pub fn http(status: u16, method: &str, path: &str, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            method: method.to_string(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(path: &str, message: impl Into<String>) -> Self {
        ApiError::Decode {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            ApiError::Decode { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// Message suitable for showing to the user as-is
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Extract the most useful message from an error response body
pub fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    v.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildReference {
    pub build_id: u64,
}

/// Project details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latest_build: Option<BuildReference>,
    #[serde(default)]
    pub deployed_build_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub build_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionBuildResponse {
    pub build_id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStartResponse {
    pub validation_id: Value,
}

/// Error attached to a function execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One serverless function execution log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Usually a string, some routes report numeric ids
    pub id: OperationId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub execution_time: Option<u64>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub error: Option<LogError>,
}

impl LogEntry {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Cursor that asks for entries after this one
    ///
    /// String ids are base64-encoded; numeric ids are passed through as-is.
    pub fn cursor(&self) -> Cursor {
        match &self.id {
            OperationId::Text(id) => Cursor::from_log_id(id),
            OperationId::Numeric(id) => Cursor(id.to_string()),
        }
    }
}

/// Continuation token for paged log requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    /// Cursor derived from a log id: the base64 of the id
    pub fn from_log_id(id: &str) -> Self {
        Cursor(base64::engine::general_purpose::STANDARD.encode(id.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NextPage {
    #[serde(default)]
    pub after: Option<Cursor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<NextPage>,
}

/// One page of function logs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LogPage {
    #[serde(default)]
    pub results: Vec<LogEntry>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl LogPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .and_then(|n| n.after.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A single marketplace validation check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCheck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
}

impl ValidationCheck {
    pub fn passed(&self) -> bool {
        self.status.eq_ignore_ascii_case("PASS")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub struct ValidationChecks {
    #[serde(default)]
    pub required: Vec<ValidationCheck>,
    #[serde(default)]
    pub recommended: Vec<ValidationCheck>,
}

/// Results of a finished marketplace validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ValidationResults {
    /// Problems that stopped the validation from running at all
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
    #[serde(default)]
    pub results: ValidationChecks,
}

impl ValidationResults {
    pub fn failed_required(&self) -> usize {
        self.results.required.iter().filter(|c| !c.passed()).count()
    }
}
