//! Command-line interface

pub mod commands;
pub mod display;
pub mod interrupt;
pub mod output;
pub mod terminal_output;

use clap::{Parser, Subcommand};
use commands::{FunctionsCommand, ProjectCommand, ThemeCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line client for developer platform operations
#[derive(Debug, Parser, Clone)]
#[command(name = "hubctl")]
#[command(version)]
#[command(about = "Upload, build, deploy and validate developer projects", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Account name or id to use
    #[arg(short, long, global = true)]
    pub account: Option<String>,

    /// Read the account from HUBCTL_* environment variables
    #[arg(long, global = true)]
    pub use_env: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Project uploads and deploys
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Serverless functions
    #[command(subcommand)]
    Functions(FunctionsCommand),

    /// Themes
    #[command(subcommand)]
    Theme(ThemeCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
