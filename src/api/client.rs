//! HTTP client for the platform REST API

use crate::api::response::*;
use crate::core::config::{AccountConfig, DEFAULT_HTTP_TIMEOUT_SECS, PROD_API_BASE_URL};
use crate::core::OperationId;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,

    /// Account every request is scoped to
    pub account_id: u64,

    /// Bearer token
    pub access_token: String,

    /// Timeout for requests in seconds
    pub timeout_secs: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: PROD_API_BASE_URL.to_string(),
            account_id: 0,
            access_token: String::new(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl ApiClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_account(account: &AccountConfig) -> Self {
        Self::new()
            .with_base_url(account.base_url())
            .with_account(account.account_id, account.access_token.clone())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_account(mut self, account_id: u64, access_token: String) -> Self {
        self.account_id = account_id;
        self.access_token = access_token;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Client for the platform REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("hubctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                path: config.base_url.clone(),
                source,
            })?;
        Ok(Self { config, http })
    }

    pub fn account_id(&self) -> u64 {
        self.config.account_id
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        self.http
            .request(method, url)
            .bearer_auth(&self.config.access_token)
            .query(&[("portalId", self.config.account_id)])
    }

    /// Send a request and turn non-2xx answers into `ApiError::Http`
    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        debug!("{} {}", method, path);
        let response = builder.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("{} {} returned {}: {}", method, path, status, body);
        Err(ApiError::http(
            status.as_u16(),
            method.as_str(),
            path,
            error_message_from_body(&body),
        ))
    }

    async fn json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(path, e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .send(Method::GET, path, self.request(Method::GET, path))
            .await?;
        Self::json(path, response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        let response = self
            .send(Method::POST, path, self.request(Method::POST, path).json(body))
            .await?;
        Self::json(path, response).await
    }

    // Projects

    pub async fn fetch_project(&self, project: &str) -> Result<ProjectDetails, ApiError> {
        self.get_json(&format!("/dfs/v1/projects/{}", encode_segment(project)))
            .await
    }

    pub async fn create_project(&self, project: &str) -> Result<ProjectDetails, ApiError> {
        self.post_json("/dfs/v1/projects", &json!({ "name": project }))
            .await
    }

    /// Upload a zipped project; the server answers with the build it created
    pub async fn upload_project(&self, project: &str, archive: &Path) -> Result<UploadResponse, ApiError> {
        let path = format!("/dfs/v1/projects/{}/upload", encode_segment(project));
        let bytes = tokio::fs::read(archive)
            .await
            .map_err(|e| ApiError::decode(&path, format!("cannot read {}: {}", archive.display(), e)))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(format!("{}.zip", project))
            .mime_str("application/zip")
            .map_err(|source| ApiError::Transport {
                path: path.clone(),
                source,
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .send(Method::POST, &path, self.request(Method::POST, &path).multipart(form))
            .await?;
        Self::json(&path, response).await
    }

    pub async fn fetch_build_status(&self, project: &str, build_id: &OperationId) -> Result<Value, ApiError> {
        self.get_json(&format!(
            "/dfs/v1/projects/{}/builds/{}/status",
            encode_segment(project),
            encode_segment(build_id)
        ))
        .await
    }

    pub async fn deploy_project(&self, project: &str, build_id: u64) -> Result<DeployResponse, ApiError> {
        self.post_json(
            &format!("/dfs/v1/projects/{}/deploys", encode_segment(project)),
            &json!({ "buildId": build_id }),
        )
        .await
    }

    pub async fn fetch_deploy_status(&self, project: &str, deploy_id: &OperationId) -> Result<Value, ApiError> {
        self.get_json(&format!(
            "/dfs/v1/projects/{}/deploys/{}/status",
            encode_segment(project),
            encode_segment(deploy_id)
        ))
        .await
    }

    // Serverless functions

    pub async fn build_function_package(&self, folder_path: &str) -> Result<FunctionBuildResponse, ApiError> {
        self.post_json("/cms/v3/functions/build/async", &json!({ "folderPath": folder_path }))
            .await
    }

    pub async fn fetch_function_build(&self, build_id: &OperationId) -> Result<Value, ApiError> {
        self.get_json(&format!("/cms/v3/functions/build/{}/poll", encode_segment(build_id)))
            .await
    }

    /// Fetch the plain-text build log behind a CDN url; 404 yields an empty log
    pub async fn fetch_build_log(&self, url: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: url.to_string(),
                source,
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(String::new());
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http(status, "GET", url, error_message_from_body(&body)));
        }

        response.text().await.map_err(|source| ApiError::Transport {
            path: url.to_string(),
            source,
        })
    }

    /// Latest execution log of a function route; `None` when it never ran
    pub async fn fetch_latest_log(&self, route: &str) -> Result<Option<LogEntry>, ApiError> {
        let path = format!("/cms/v3/functions/results/by-route/{}/latest", encode_segment(route));
        match self.get_json(&path).await {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_logs(
        &self,
        route: &str,
        after: Option<&Cursor>,
        limit: Option<u32>,
    ) -> Result<LogPage, ApiError> {
        let path = format!("/cms/v3/functions/results/by-route/{}", encode_segment(route));
        let mut builder = self.request(Method::GET, &path);
        if let Some(after) = after {
            builder = builder.query(&[("after", after.as_str())]);
        }
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit)]);
        }
        let response = self.send(Method::GET, &path, builder).await?;
        Self::json(&path, response).await
    }

    // Marketplace validation

    pub async fn start_validation(&self, asset_type: &str, asset_path: &str) -> Result<OperationId, ApiError> {
        let path = format!("/quality-engine/v1/validation/{}", encode_segment(asset_type));
        let response: ValidationStartResponse = self.post_json(&path, &json!({ "path": asset_path })).await?;
        OperationId::from_json(&response.validation_id)
            .ok_or_else(|| ApiError::decode(&path, "validationId is neither a number nor a string"))
    }

    pub async fn fetch_validation_status(&self, validation_id: &OperationId) -> Result<Value, ApiError> {
        self.get_json(&format!("/quality-engine/v1/validation/{}/status", encode_segment(validation_id)))
            .await
    }

    pub async fn fetch_validation_results(&self, validation_id: &OperationId) -> Result<ValidationResults, ApiError> {
        self.get_json(&format!("/quality-engine/v1/validation/{}/results", encode_segment(validation_id)))
            .await
    }
}

/// Escape a value used as a single path segment
fn encode_segment(value: impl ToString) -> String {
    urlencoding::encode(&value.to_string()).into_owned()
}
