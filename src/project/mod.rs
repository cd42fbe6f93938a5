//! Local project discovery and validation

pub mod archive;

use crate::api::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use archive::{build_archive, should_ignore, ArchiveError, ProjectArchive};

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "hsproject.json";

/// Error types for project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("No {PROJECT_CONFIG_FILE} found in {0} or any parent directory")]
    ConfigNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {PROJECT_CONFIG_FILE} at {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Project '{0}' does not exist. Run the upload again with --force-create to create it")]
    ProjectMissing(String),

    #[error("Project '{0}' has no builds to deploy. Run `hubctl project upload` first")]
    NoBuilds(String),

    #[error("Build #{build_id} does not exist for project '{project}'")]
    BuildNotFound { build_id: u64, project: String },

    #[error("Build #{0} is already deployed")]
    AlreadyDeployed(u64),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Contents of `hsproject.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub name: String,
    pub src_dir: String,
    #[serde(default)]
    pub platform_version: Option<String>,
}

/// A project config together with the directory it was found in
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub config: ProjectConfig,
    pub dir: PathBuf,
}

impl Project {
    /// Find `hsproject.json` at or above `start`
    pub fn find(start: &Path) -> Result<Self, ProjectError> {
        let start = start.canonicalize().map_err(|source| ProjectError::Read {
            path: start.to_path_buf(),
            source,
        })?;

        let dir = start
            .ancestors()
            .find(|dir| dir.join(PROJECT_CONFIG_FILE).is_file())
            .ok_or_else(|| ProjectError::ConfigNotFound(start.clone()))?;

        debug!("Found {} in {}", PROJECT_CONFIG_FILE, dir.display());
        Self::load(dir)
    }

    /// Load `hsproject.json` from exactly `dir`
    pub fn load(dir: &Path) -> Result<Self, ProjectError> {
        let path = dir.join(PROJECT_CONFIG_FILE);
        let content = fs::read_to_string(&path).map_err(|source| ProjectError::Read {
            path: path.clone(),
            source,
        })?;
        let config: ProjectConfig =
            serde_json::from_str(&content).map_err(|e| ProjectError::Invalid {
                path: path.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            config,
            dir: dir.to_path_buf(),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Absolute path of the source directory
    pub fn src_dir(&self) -> PathBuf {
        self.dir.join(&self.config.src_dir)
    }

    /// Check the config describes an uploadable project
    pub fn validate(&self) -> Result<(), ProjectError> {
        let invalid = |message: String| ProjectError::Invalid {
            path: self.dir.join(PROJECT_CONFIG_FILE),
            message,
        };

        if self.config.name.trim().is_empty() {
            return Err(invalid("'name' must not be empty".to_string()));
        }
        if self.config.src_dir.trim().is_empty() {
            return Err(invalid("'srcDir' must not be empty".to_string()));
        }

        let src_dir = self
            .src_dir()
            .canonicalize()
            .map_err(|_| invalid(format!("srcDir '{}' does not exist", self.config.src_dir)))?;
        let project_dir = self
            .dir
            .canonicalize()
            .map_err(|source| ProjectError::Read {
                path: self.dir.clone(),
                source,
            })?;

        if !src_dir.starts_with(&project_dir) {
            return Err(invalid(format!(
                "srcDir '{}' is outside the project directory",
                self.config.src_dir
            )));
        }
        if !src_dir.is_dir() {
            return Err(invalid(format!("srcDir '{}' is not a directory", self.config.src_dir)));
        }

        Ok(())
    }
}

/// Make sure the remote project exists, creating it when allowed
///
/// Returns `true` when the project was created.
pub async fn ensure_project_exists(
    client: &ApiClient,
    name: &str,
    force_create: bool,
) -> Result<bool, ProjectError> {
    match client.fetch_project(name).await {
        Ok(_) => Ok(false),
        Err(e) if e.is_not_found() => {
            if !force_create {
                return Err(ProjectError::ProjectMissing(name.to_string()));
            }
            client.create_project(name).await?;
            info!("Created project {}", name);
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

/// Check `build_id` can be deployed given the project's build history
pub fn validate_build_id(
    project: &str,
    build_id: u64,
    deployed_build_id: Option<u64>,
    latest_build_id: u64,
) -> Result<(), ProjectError> {
    if build_id > latest_build_id {
        return Err(ProjectError::BuildNotFound {
            build_id,
            project: project.to_string(),
        });
    }
    if deployed_build_id == Some(build_id) {
        return Err(ProjectError::AlreadyDeployed(build_id));
    }
    Ok(())
}
