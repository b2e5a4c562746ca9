//! Configuration management for azdo-tools.
//!
//! Two layers:
//!
//! - [`Config`] is the persisted TOML file holding non-secret settings.
//!   It lives in a platform-specific location:
//!   - **macOS/Linux**: `~/.config/azdo-tools/config.toml`
//!   - **Windows**: `%APPDATA%\azdo-tools\config.toml`
//! - [`AzureDevOpsConfig`] is the resolved runtime value (organization,
//!   project, token) built once at startup from the file, the environment
//!   and the credential store, then handed to the gateway.
//!
//! # Example
//!
//! ```ignore
//! use azdo_core::config::{AzureDevOpsConfig, Config};
//!
//! let file = Config::load()?;
//! let config = AzureDevOpsConfig::resolve(&file, |key| std::env::var(key).ok(), None)?;
//! println!("{}", config.work_item_url(89));
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "azdo-tools";

/// Azure DevOps Services host.
pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";

/// Environment variables, in lookup order per setting.
pub const ENV_ORGANIZATION: &str = "AZURE_DEVOPS_ORGANIZATION";
pub const ENV_ORGANIZATION_URL: &str = "AZURE_DEVOPS_ORGANIZATION_URL";
pub const ENV_PROJECT: &str = "AZURE_DEVOPS_PROJECT";
pub const ENV_TOKEN: &str = "AZURE_DEVOPS_TOKEN";
pub const ENV_PAT: &str = "AZURE_DEVOPS_PAT";
pub const ENV_BASE_URL: &str = "AZURE_DEVOPS_BASE_URL";

// =============================================================================
// Persisted configuration
// =============================================================================

/// Main configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Azure DevOps settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_devops: Option<AzureDevOpsFileConfig>,
}

/// `[azure_devops]` table. The token is never written to the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureDevOpsFileConfig {
    /// Organization name (the `{org}` in `dev.azure.com/{org}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Server URL, for Azure DevOps Server or testing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `azure_devops.field` (e.g., `azure_devops.project`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let field = split_key(key)?;
        let section = self.azure_devops.get_or_insert_with(Default::default);
        let value = Some(value.to_string());

        match field {
            "organization" | "org" => section.organization = value,
            "project" => section.project = value,
            "base_url" | "url" => section.base_url = value,
            "token" => {
                return Err(Error::Config(
                    "The token is not stored in the config file. Use `azdo token set`".to_string(),
                ))
            }
            _ => {
                return Err(Error::Config(format!(
                    "Unknown Azure DevOps config field: {}",
                    field
                )))
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let field = split_key(key)?;
        let Some(section) = &self.azure_devops else {
            return Ok(None);
        };

        match field {
            "organization" | "org" => Ok(section.organization.clone()),
            "project" => Ok(section.project.clone()),
            "base_url" | "url" => Ok(section.base_url.clone()),
            _ => Err(Error::Config(format!(
                "Unknown Azure DevOps config field: {}",
                field
            ))),
        }
    }
}

fn split_key(key: &str) -> Result<&str> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: azure_devops.field",
            key
        )));
    }
    match parts[0] {
        "azure_devops" | "ado" => Ok(parts[1]),
        section => Err(Error::Config(format!("Unknown config section: {}", section))),
    }
}

// =============================================================================
// Resolved runtime configuration
// =============================================================================

/// Connection settings for one Azure DevOps organization and project.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureDevOpsConfig {
    pub organization: String,
    pub project: String,
    pub token: String,
    /// Host URL without trailing slash
    pub base_url: String,
}

impl AzureDevOpsConfig {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the host URL (Azure DevOps Server, mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Same connection, different project.
    pub fn with_project(&self, project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..self.clone()
        }
    }

    /// Resolve settings from the config file, the environment and a stored token.
    ///
    /// Environment values override the file. The token comes from
    /// `AZURE_DEVOPS_TOKEN`, then `AZURE_DEVOPS_PAT`, then `stored_token`.
    /// Empty values count as missing.
    pub fn resolve<F>(file: &Config, env: F, stored_token: Option<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let section = file.azure_devops.clone().unwrap_or_default();

        let organization = lookup(ENV_ORGANIZATION)
            .or_else(|| lookup(ENV_ORGANIZATION_URL).map(|url| organization_from_url(&url)))
            .filter(|org| !org.is_empty())
            .or(section.organization);
        let project = lookup(ENV_PROJECT).or(section.project);
        let token = env_token(&env).or(stored_token.filter(|t| !t.is_empty()));
        let base_url = lookup(ENV_BASE_URL)
            .or(section.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut missing = Vec::new();
        if organization.is_none() {
            missing.push(format!("{} or {}", ENV_ORGANIZATION, ENV_ORGANIZATION_URL));
        }
        if project.is_none() {
            missing.push(ENV_PROJECT.to_string());
        }
        if token.is_none() {
            missing.push(format!("{} or {}", ENV_TOKEN, ENV_PAT));
        }

        match (organization, project, token) {
            (Some(organization), Some(project), Some(token)) => {
                debug!(
                    organization = organization,
                    project = project,
                    "Resolved Azure DevOps configuration"
                );
                Ok(Self::new(organization, project, token).with_base_url(base_url))
            }
            _ => Err(Error::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Base URL of the work item tracking API for this project.
    pub fn api_base(&self) -> String {
        format!(
            "{}/{}/{}/_apis/wit",
            self.base_url, self.organization, self.project
        )
    }

    /// Browser URL of a work item.
    pub fn work_item_url(&self, id: u64) -> String {
        format!(
            "{}/{}/{}/_workitems/edit/{}",
            self.base_url, self.organization, self.project, id
        )
    }
}

impl fmt::Debug for AzureDevOpsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureDevOpsConfig")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Token from `AZURE_DEVOPS_TOKEN`, falling back to `AZURE_DEVOPS_PAT`.
///
/// A blank variable counts as unset, so an empty `AZURE_DEVOPS_TOKEN` does
/// not hide `AZURE_DEVOPS_PAT`.
pub fn env_token<F>(env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    lookup(ENV_TOKEN).or_else(|| lookup(ENV_PAT))
}

/// `https://dev.azure.com/contoso/` -> `contoso`
///
/// Only the `dev.azure.com` host is understood. Other hosts such as
/// `contoso.visualstudio.com` are returned unchanged.
fn organization_from_url(url: &str) -> String {
    let organization = url
        .trim()
        .trim_end_matches('/')
        .trim_start_matches(DEFAULT_BASE_URL)
        .trim_start_matches('/')
        .to_string();

    if organization.contains("://") {
        warn!(
            url = url,
            "Organization URL is not on {}; using it as the organization name", DEFAULT_BASE_URL
        );
    }
    organization
}

// =============================================================================
// Tests
// =============================================================================
