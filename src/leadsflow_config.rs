//! File configuration for LeadsFlow.
//!
//! Reads `leadsflow.toml` from the home directory. Layering is
//! file → environment → CLI; this module owns the file layer and the
//! environment snapshot, [`crate::config::Config`] applies the CLI layer.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "https://crm.example.com"
//! timeout_secs = 15
//!
//! [account]
//! user = "ana@example.com"
//! lead_limit = 500
//!
//! [sync]
//! refresh_interval_secs = 30
//!
//! [bulk_delete]
//! chunk_size = 50
//! ```
//!
//! The API token is never read from the file; set `LEADSFLOW_API_TOKEN`
//! (a `.env` file in the working directory is honoured).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bulk_delete::DEFAULT_CHUNK_SIZE;

pub const CONFIG_FILE: &str = "leadsflow.toml";

pub const ENV_HOME: &str = "LEADSFLOW_HOME";
pub const ENV_API_URL: &str = "LEADSFLOW_API_URL";
pub const ENV_API_TOKEN: &str = "LEADSFLOW_API_TOKEN";
pub const ENV_USER: &str = "LEADSFLOW_USER";

/// Chunk sizes above this hammer the backend with concurrent deletes.
const MAX_SENSIBLE_CHUNK_SIZE: usize = 500;
/// Refresh intervals below this mostly re-download unchanged lists.
const MIN_SENSIBLE_INTERVAL_SECS: u64 = 5;

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Account identity and plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSection {
    /// Scopes device-local tracking such as deleted lead ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Plan lead limit. Unset means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_interval_secs() -> u64 {
    30
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDeleteSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for BulkDeleteSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// The complete leadsflow.toml configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadsflowToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub account: AccountSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub bulk_delete: BulkDeleteSection,
}

impl LeadsflowToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse leadsflow.toml")
    }

    /// Load `leadsflow.toml` from the home directory.
    /// Returns default configuration if the file doesn't exist.
    pub fn load_or_default(home: &Path) -> Result<Self> {
        let config_path = home.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize leadsflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!(
                "api.base_url '{}' should start with http:// or https://",
                self.api.base_url
            ));
        }
        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs is 0: every request would time out".to_string());
        }
        if self.sync.refresh_interval_secs < MIN_SENSIBLE_INTERVAL_SECS {
            warnings.push(format!(
                "sync.refresh_interval_secs {} is below {}s",
                self.sync.refresh_interval_secs, MIN_SENSIBLE_INTERVAL_SECS
            ));
        }
        match self.bulk_delete.chunk_size {
            0 => warnings.push("bulk_delete.chunk_size is 0; 1 will be used".to_string()),
            n if n > MAX_SENSIBLE_CHUNK_SIZE => warnings.push(format!(
                "bulk_delete.chunk_size {} exceeds {}",
                n, MAX_SENSIBLE_CHUNK_SIZE
            )),
            _ => {}
        }
        if self.account.lead_limit == Some(0) {
            warnings.push("account.lead_limit is 0: no lead can be created".to_string());
        }

        warnings
    }
}

/// Environment layer, captured once so resolution stays a pure function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub user: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl EnvOverrides {
    /// Read the process environment. `.env` must already be loaded.
    pub fn from_env() -> Self {
        Self {
            home: non_empty(std::env::var(ENV_HOME).ok()),
            api_url: non_empty(std::env::var(ENV_API_URL).ok()),
            api_token: non_empty(std::env::var(ENV_API_TOKEN).ok()),
            user: non_empty(std::env::var(ENV_USER).ok()),
        }
    }
}
