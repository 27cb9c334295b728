//! Per-host login storage
//!
//! Holds the last-used `(user name, password-or-token)` pair for each host.
//! Storage is keyed strictly by `HostAddress`; a save always replaces both
//! fields, and an erase leaves empty strings behind.
//!
//! Two stores are provided:
//! - `KeyringLoginStore` - the system keyring (macOS Keychain, Linux Secret
//!   Service) with an in-memory cache to minimize keychain prompts
//! - `MemoryLoginStore` - process-local, for tests and ephemeral sessions

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use keyring::Entry;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::core::host_address::HostAddress;
use crate::error::{HubAuthError, Result};

const SERVICE_NAME: &str = "hubauth";

/// Prefixed tokens (`gho_...`, `ghp_...`) or the legacy 40-hex-digit format
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(gh[opsur]_[A-Za-z0-9_]{30,}|[0-9a-f]{40})$")
        .expect("Invalid regex pattern for token detection")
});

/// Credentials associated with one host
#[derive(Debug, Clone)]
pub struct LoginInfo {
    pub user_name: String,
    /// Either the account password or an authorization token
    pub password: SecretString,
}

impl LoginInfo {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The erased state
    pub fn empty() -> Self {
        Self::new("", "")
    }

    /// True when either field is missing
    pub fn is_empty(&self) -> bool {
        self.user_name.is_empty() || self.password.expose_secret().is_empty()
    }

    /// Whether the stored secret is an authorization token rather than a password
    pub fn holds_token(&self) -> bool {
        TOKEN_PATTERN.is_match(self.password.expose_secret())
    }
}

impl Default for LoginInfo {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for LoginInfo {
    fn eq(&self, other: &Self) -> bool {
        self.user_name == other.user_name
            && self.password.expose_secret() == other.password.expose_secret()
    }
}

impl Eq for LoginInfo {}

/// Keyed store of `LoginInfo` per host
#[async_trait]
pub trait LoginStore: Send + Sync {
    /// Stored credentials for `host`, or `LoginInfo::empty()` if none
    async fn get_login(&self, host: &HostAddress) -> Result<LoginInfo>;

    /// Replace the credentials for `host`
    async fn save_login(&self, host: &HostAddress, user_name: &str, password: &str) -> Result<()>;

    /// Reset the credentials for `host` to empty strings
    async fn erase_login(&self, host: &HostAddress) -> Result<()>;
}

/// Serializable keyring payload
///
/// Uses plain strings since SecretString doesn't implement Serialize.
#[derive(Debug, Serialize, Deserialize)]
struct StoredLogin {
    user_name: String,
    password: String,
    /// Version for future migrations
    version: u8,
}

/// Login store backed by the system keyring
///
/// One keyring entry per host (service `hubauth`, account = the host's
/// credential key). Reads are cached in memory:
/// - no cache entry = not yet fetched from keyring
/// - cached `LoginInfo::empty()` = fetched, nothing stored
#[derive(Default)]
pub struct KeyringLoginStore {
    cache: RwLock<HashMap<HostAddress, LoginInfo>>,
}

impl KeyringLoginStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(host: &HostAddress) -> Result<Entry> {
        Ok(Entry::new(SERVICE_NAME, &host.credential_key())?)
    }

    fn cached(&self, host: &HostAddress) -> Option<LoginInfo> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(host).cloned())
    }

    fn update_cache(&self, host: &HostAddress, login: LoginInfo) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(host.clone(), login);
        }
    }

    /// Fetch directly from the keyring (no cache)
    fn fetch_from_keyring(host: &HostAddress) -> Result<LoginInfo> {
        let entry = Self::entry(host)?;
        match entry.get_password() {
            Ok(json) => {
                let stored: StoredLogin = serde_json::from_str(&json).map_err(|e| {
                    HubAuthError::Credential(format!("Invalid stored login for {}: {}", host, e))
                })?;
                Ok(LoginInfo::new(stored.user_name, stored.password))
            }
            Err(keyring::Error::NoEntry) => Ok(LoginInfo::empty()),
            Err(e) => Err(HubAuthError::Credential(format!(
                "Cannot access system keychain. Make sure your keyring is unlocked. ({})",
                e
            ))),
        }
    }
}

#[async_trait]
impl LoginStore for KeyringLoginStore {
    async fn get_login(&self, host: &HostAddress) -> Result<LoginInfo> {
        if let Some(login) = self.cached(host) {
            return Ok(login);
        }

        // Keyring backends block; keep them off the runtime threads
        let key = host.clone();
        let login = tokio::task::spawn_blocking(move || Self::fetch_from_keyring(&key))
            .await
            .map_err(|e| HubAuthError::Credential(e.to_string()))??;

        self.update_cache(host, login.clone());
        Ok(login)
    }

    async fn save_login(&self, host: &HostAddress, user_name: &str, password: &str) -> Result<()> {
        let stored = StoredLogin {
            user_name: user_name.to_string(),
            password: password.to_string(),
            version: 1,
        };
        let json = serde_json::to_string(&stored)?;

        let key = host.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            Self::entry(&key)?.set_password(&json)?;
            Ok(())
        })
        .await
        .map_err(|e| HubAuthError::Credential(e.to_string()))??;

        self.update_cache(host, LoginInfo::new(user_name, password));
        Ok(())
    }

    async fn erase_login(&self, host: &HostAddress) -> Result<()> {
        let key = host.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<()> {
            match Self::entry(&key)?.delete_credential() {
                Ok(()) => Ok(()),
                Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
                Err(e) => Err(HubAuthError::Credential(e.to_string())),
            }
        })
        .await
        .map_err(|e| HubAuthError::Credential(e.to_string()))?;

        // Clear cache even if the keyring refused, so nothing reuses the login
        self.update_cache(host, LoginInfo::empty());

        result
    }
}

/// Process-local login store
#[derive(Default)]
pub struct MemoryLoginStore {
    logins: RwLock<HashMap<HostAddress, LoginInfo>>,
}

impl MemoryLoginStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoginStore for MemoryLoginStore {
    async fn get_login(&self, host: &HostAddress) -> Result<LoginInfo> {
        let logins = self
            .logins
            .read()
            .map_err(|e| HubAuthError::Credential(e.to_string()))?;
        Ok(logins.get(host).cloned().unwrap_or_default())
    }

    async fn save_login(&self, host: &HostAddress, user_name: &str, password: &str) -> Result<()> {
        let mut logins = self
            .logins
            .write()
            .map_err(|e| HubAuthError::Credential(e.to_string()))?;
        logins.insert(host.clone(), LoginInfo::new(user_name, password));
        Ok(())
    }

    async fn erase_login(&self, host: &HostAddress) -> Result<()> {
        let mut logins = self
            .logins
            .write()
            .map_err(|e| HubAuthError::Credential(e.to_string()))?;
        logins.insert(host.clone(), LoginInfo::empty());
        Ok(())
    }
}

/// Get a masked version of a secret for display (shows first 4 and last 4 chars)
pub fn mask_secret(secret: &SecretString) -> String {
    let exposed = secret.expose_secret();
    let chars: Vec<char> = exposed.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
