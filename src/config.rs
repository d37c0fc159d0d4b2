use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::leadsflow_config::{CONFIG_FILE, EnvOverrides, LeadsflowToml};

/// Account user used when none is configured.
pub const DEFAULT_USER: &str = "default";

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub home: Option<PathBuf>,
    pub api_url: Option<String>,
    pub user: Option<String>,
    pub verbose: bool,
    pub yes: bool,
}

/// Runtime configuration for LeadsFlow.
///
/// Bridges `leadsflow.toml`, the environment and CLI flags into the values
/// the workspace and commands need.
#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub config_file: PathBuf,
    pub log_dir: PathBuf,
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
    pub user: String,
    pub lead_limit: Option<usize>,
    pub refresh_interval: Duration,
    pub chunk_size: usize,
    pub verbose: bool,
    pub yes: bool,
    /// The underlying file configuration
    toml: LeadsflowToml,
}

/// `--home`, else `LEADSFLOW_HOME`, else the platform data directory.
pub fn resolve_home(flag: Option<&Path>, env: &EnvOverrides) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &env.home {
        return Ok(PathBuf::from(path));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("leadsflow"))
        .ok_or_else(|| anyhow!("Could not determine a data directory; pass --home"))
}

impl Config {
    /// Load from the real environment: `.env`, then `leadsflow.toml` in the
    /// resolved home, then CLI flags.
    pub fn load(cli: CliOverrides) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let env = EnvOverrides::from_env();
        let home = resolve_home(cli.home.as_deref(), &env)?;
        let toml = LeadsflowToml::load_or_default(&home)
            .with_context(|| format!("Failed to load configuration from {}", home.display()))?;
        Ok(Self::resolve(home, toml, &env, cli))
    }

    /// Apply the environment and CLI layers over the file configuration.
    pub fn resolve(home: PathBuf, toml: LeadsflowToml, env: &EnvOverrides, cli: CliOverrides) -> Self {
        let api_url = cli
            .api_url
            .or_else(|| env.api_url.clone())
            .unwrap_or_else(|| toml.api.base_url.clone());
        let user = cli
            .user
            .or_else(|| env.user.clone())
            .or_else(|| toml.account.user.clone())
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        Self {
            config_file: home.join(CONFIG_FILE),
            log_dir: home.join("logs"),
            api_url,
            api_token: env.api_token.clone(),
            timeout: Duration::from_secs(toml.api.timeout_secs),
            user,
            lead_limit: toml.account.lead_limit,
            refresh_interval: Duration::from_secs(toml.sync.refresh_interval_secs.max(1)),
            chunk_size: toml.bulk_delete.chunk_size.max(1),
            verbose: cli.verbose,
            yes: cli.yes,
            home,
            toml,
        }
    }

    /// Get the underlying file configuration.
    pub fn toml(&self) -> &LeadsflowToml {
        &self.toml
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.home).context("Failed to create home directory")?;
        std::fs::create_dir_all(&self.log_dir).context("Failed to create log directory")?;
        Ok(())
    }
}
