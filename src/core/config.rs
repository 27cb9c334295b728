//! Application configuration management
//!
//! Handles loading and saving application settings including:
//! - The OAuth application used to create authorizations
//! - Request timeout
//! - Per-host authentication mode (token negotiation or basic only)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::core::host_address::HostAddress;
use crate::error::{HubAuthError, Result};
use crate::github::api::OAuthApp;

/// How a host is logged in to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Negotiate an application token (default)
    #[default]
    Token,
    /// Username and password only, no token request
    Basic,
}

/// Per-host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub url: String,
    #[serde(default)]
    pub auth_mode: AuthMode,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds a whole login may take
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Host used when commands are given no `--host`
    #[serde(default = "default_host")]
    pub default_host: String,

    /// OAuth application client id
    #[serde(default = "default_client_id")]
    pub oauth_client_id: String,

    /// OAuth application client secret (prefer `HUBAUTH_CLIENT_SECRET`)
    #[serde(default)]
    pub oauth_client_secret: Option<String>,

    /// Note attached to created authorizations
    #[serde(default = "default_note")]
    pub authorization_note: String,

    /// Override for the session cache directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_host() -> String {
    crate::core::host_address::GITHUB_DOT_COM.to_string()
}

fn default_client_id() -> String {
    "hubauth".to_string()
}

fn default_note() -> String {
    "hubauth".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            default_host: default_host(),
            oauth_client_id: default_client_id(),
            oauth_client_secret: None,
            authorization_note: default_note(),
            cache_dir: None,
            hosts: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if not exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "hubauth", "hubauth")
            .ok_or_else(|| HubAuthError::Config("Could not determine config directory".into()))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for the session cache
    pub fn session_cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        Ok(Self::project_dirs()?.cache_dir().join("session"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn default_host_address(&self) -> Result<HostAddress> {
        HostAddress::parse(&self.default_host)
    }

    /// Auth mode for `host`; hosts without an entry negotiate tokens
    pub fn auth_mode(&self, host: &HostAddress) -> AuthMode {
        self.hosts
            .iter()
            .find(|entry| HostAddress::parse(&entry.url).ok().as_ref() == Some(host))
            .map(|entry| entry.auth_mode)
            .unwrap_or_default()
    }

    /// OAuth application, with `secret_override` winning over the file
    pub fn oauth_app(&self, secret_override: Option<String>) -> OAuthApp {
        let secret = secret_override
            .or_else(|| self.oauth_client_secret.clone())
            .unwrap_or_default();
        OAuthApp {
            client_id: self.oauth_client_id.clone(),
            client_secret: SecretString::from(secret),
            note: self.authorization_note.clone(),
            fingerprint: machine_fingerprint(),
        }
    }
}

/// Per-machine authorization fingerprint
fn machine_fingerprint() -> String {
    let machine = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let sanitized: String = machine
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    format!("hubauth-{}", sanitized.to_ascii_lowercase())
}
