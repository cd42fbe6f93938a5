//! CLI configuration from YAML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PROD_API_BASE_URL: &str = "https://api.hubapi.com";
pub const QA_API_BASE_URL: &str = "https://api.hubapiqa.com";

/// Default interval between build/deploy/validation status checks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
/// Default interval between log tail fetches
pub const DEFAULT_TAIL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const ENV_ACCOUNT_ID: &str = "HUBCTL_ACCOUNT_ID";
const ENV_ACCESS_TOKEN: &str = "HUBCTL_ACCESS_TOKEN";
const ENV_ENV: &str = "HUBCTL_ENV";
const ENV_API_BASE_URL: &str = "HUBCTL_API_BASE_URL";

/// Platform environment an account lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Qa,
}

impl Environment {
    pub fn api_base_url(&self) -> &'static str {
        match self {
            Environment::Prod => PROD_API_BASE_URL,
            Environment::Qa => QA_API_BASE_URL,
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Environment::Prod),
            "qa" => Ok(Environment::Qa),
            other => anyhow::bail!("Unknown environment '{}' (expected 'prod' or 'qa')", other),
        }
    }
}

/// Top-level CLI configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Account used when `--account` is not given
    #[serde(default)]
    pub default_account: Option<String>,

    /// Configured accounts
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    /// Polling behaviour
    #[serde(default)]
    pub polling: PollingConfig,

    /// Per-request HTTP timeout (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// One platform account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub name: String,

    pub account_id: u64,

    #[serde(default)]
    pub env: Environment,

    /// Bearer token used for every request
    pub access_token: String,

    /// Explicit API base URL (overrides `env`)
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl AccountConfig {
    pub fn base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| self.env.api_base_url().to_string())
    }

    /// Human-readable account label, e.g. `dev (123456)`
    pub fn description(&self) -> String {
        format!("{} ({})", self.name, self.account_id)
    }
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Ceiling on a single poll session (absent = no ceiling)
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default = "default_tail_interval_ms")]
    pub tail_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: None,
            tail_interval_ms: DEFAULT_TAIL_INTERVAL_MS,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn tail_interval(&self) -> Duration {
        Duration::from_millis(self.tail_interval_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_tail_interval_ms() -> u64 {
    DEFAULT_TAIL_INTERVAL_MS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_account: None,
            accounts: Vec::new(),
            polling: PollingConfig::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl CliConfig {
    /// Default config location: `~/.hubctl/config.yml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".hubctl").join("config.yml"))
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CliConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration the way the CLI does
    ///
    /// With `use_env` the file is optional and the account comes from
    /// `HUBCTL_*` environment variables.
    pub fn load(path: Option<&Path>, use_env: bool) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file {}", p.display()))?;
                serde_yaml::from_str::<CliConfig>(&content)
                    .with_context(|| format!("Invalid config file {}", p.display()))?
            }
            Some(ref p) if !use_env => {
                anyhow::bail!(
                    "Config file {} not found (create it or pass --use-env)",
                    p.display()
                )
            }
            _ => CliConfig::default(),
        };

        if use_env {
            let account = account_from_env(|key| std::env::var(key).ok())?;
            config.default_account = Some(account.name.clone());
            config.accounts = vec![account];
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            anyhow::bail!("No accounts configured");
        }

        let mut seen = std::collections::HashSet::new();
        for account in &self.accounts {
            if !seen.insert(&account.name) {
                anyhow::bail!("Duplicate account name: {}", account.name);
            }
            if account.access_token.trim().is_empty() {
                anyhow::bail!("Account '{}' has an empty access token", account.name);
            }
        }

        if let Some(ref default) = self.default_account {
            if !self.accounts.iter().any(|a| &a.name == default) {
                anyhow::bail!("Default account '{}' is not configured", default);
            }
        }

        if self.polling.interval_ms == 0 {
            anyhow::bail!("polling.intervalMs must be greater than zero");
        }
        if self.polling.tail_interval_ms == 0 {
            anyhow::bail!("polling.tailIntervalMs must be greater than zero");
        }

        Ok(())
    }

    /// Resolve an account by name or numeric id
    ///
    /// Falls back to the default account, then to the only configured one.
    pub fn account(&self, selector: Option<&str>) -> Result<&AccountConfig> {
        if let Some(selector) = selector {
            return self
                .accounts
                .iter()
                .find(|a| a.name == selector || a.account_id.to_string() == selector)
                .ok_or_else(|| anyhow::anyhow!("Account '{}' is not configured", selector));
        }

        if let Some(ref default) = self.default_account {
            if let Some(account) = self.accounts.iter().find(|a| &a.name == default) {
                return Ok(account);
            }
        }

        match self.accounts.as_slice() {
            [only] => Ok(only),
            _ => anyhow::bail!("Multiple accounts configured; pass --account or set defaultAccount"),
        }
    }
}

/// Build an account from `HUBCTL_*` variables
fn account_from_env<F>(lookup: F) -> Result<AccountConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let account_id = lookup(ENV_ACCOUNT_ID)
        .ok_or_else(|| anyhow::anyhow!("{} is not set", ENV_ACCOUNT_ID))?;
    let account_id: u64 = account_id
        .trim()
        .parse()
        .with_context(|| format!("{} must be a numeric account id", ENV_ACCOUNT_ID))?;
    let access_token = lookup(ENV_ACCESS_TOKEN)
        .ok_or_else(|| anyhow::anyhow!("{} is not set", ENV_ACCESS_TOKEN))?;
    let env = match lookup(ENV_ENV) {
        Some(value) => Environment::parse(&value)?,
        None => Environment::Prod,
    };

    Ok(AccountConfig {
        name: format!("env-{}", account_id),
        account_id,
        env,
        access_token,
        api_base_url: lookup(ENV_API_BASE_URL),
    })
}
