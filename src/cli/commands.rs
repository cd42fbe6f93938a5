//! CLI command definitions

use crate::polling::PollOptions;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Project commands
#[derive(Debug, Subcommand, Clone)]
pub enum ProjectCommand {
    /// Upload a project and follow its build
    Upload(UploadCommand),

    /// Deploy a project build
    Deploy(DeployCommand),
}

/// Serverless function commands
#[derive(Debug, Subcommand, Clone)]
pub enum FunctionsCommand {
    /// Build and deploy a `.functions` folder
    Deploy(FunctionsDeployCommand),

    /// Show execution logs of a function route
    Logs(LogsCommand),
}

/// Theme commands
#[derive(Debug, Subcommand, Clone)]
pub enum ThemeCommand {
    /// Run marketplace validation on a theme
    MarketplaceValidate(MarketplaceValidateCommand),
}

/// Polling overrides shared by every command that waits on a remote operation
#[derive(Debug, Args, Clone, Default, PartialEq)]
pub struct PollArgs {
    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Milliseconds between status checks
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,
}

impl PollArgs {
    /// Apply the flags on top of configured options
    pub fn apply(&self, mut options: PollOptions) -> PollOptions {
        if let Some(interval_ms) = self.interval_ms {
            options.interval = Duration::from_millis(interval_ms);
        }
        if let Some(secs) = self.timeout {
            options.timeout = Some(Duration::from_secs(secs));
        }
        options
    }
}

/// Upload a project
#[derive(Debug, Args, Clone)]
pub struct UploadCommand {
    /// Path to a project folder
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Automatically create the project if it does not exist
    #[arg(long)]
    pub force_create: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Deploy a project build
#[derive(Debug, Args, Clone)]
pub struct DeployCommand {
    /// Project name (defaults to the project in the current directory)
    #[arg(long)]
    pub project: Option<String>,

    /// Build to deploy (defaults to the latest build)
    #[arg(long, alias = "build-id", value_parser = clap::value_parser!(u64).range(1..))]
    pub build: Option<u64>,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Build and deploy a serverless function package
#[derive(Debug, Args, Clone)]
pub struct FunctionsDeployCommand {
    /// Remote path of the `.functions` folder
    #[arg(value_parser = parse_functions_path)]
    pub path: String,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Show function logs
#[derive(Debug, Args, Clone)]
pub struct LogsCommand {
    /// Endpoint route of the function
    pub route: String,

    /// Only show the most recent log
    #[arg(long, short)]
    pub latest: bool,

    /// Keep following new logs until `q` or Ctrl-C
    #[arg(long, short, conflicts_with = "latest")]
    pub follow: bool,

    /// Print one line per execution
    #[arg(long)]
    pub compact: bool,

    /// Maximum number of logs per page
    #[arg(long)]
    pub limit: Option<u32>,
}

/// Validate a theme for the marketplace
#[derive(Debug, Args, Clone)]
pub struct MarketplaceValidateCommand {
    /// Remote path of the theme
    pub src: String,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Accept only paths of `.functions` folders
pub fn parse_functions_path(s: &str) -> Result<String, String> {
    let path = s.trim_end_matches('/');
    if path.ends_with(".functions") && path.len() > ".functions".len() {
        Ok(path.to_string())
    } else {
        Err(format!(
            "'{}' is not a .functions folder; the path must end with .functions",
            s
        ))
    }
}
