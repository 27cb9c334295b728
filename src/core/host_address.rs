//! Host address normalization
//!
//! A `HostAddress` identifies a GitHub-compatible server. The public
//! github.com service and Enterprise servers are told apart by URL, and
//! every spelling of the same server compares equal.

use std::fmt;

use url::Url;

use crate::error::{HubAuthError, Result};

/// Canonical web address of the public GitHub service
pub const GITHUB_DOT_COM: &str = "https://github.com";

/// API root of the public GitHub service
const GITHUB_API: &str = "https://api.github.com/";

/// Hostnames that all refer to the public service
const GITHUB_DOT_COM_HOSTS: &[&str] = &["github.com", "www.github.com", "api.github.com"];

/// Identifies a GitHub-compatible endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddress {
    /// Normalized web root, no trailing slash (e.g. `https://ghe.example.com:8443`)
    web: String,
    is_github_dot_com: bool,
}

impl HostAddress {
    /// The public github.com host
    pub fn github_dot_com() -> Self {
        Self {
            web: GITHUB_DOT_COM.to_string(),
            is_github_dot_com: true,
        }
    }

    /// Parse a host address from user input
    ///
    /// Accepts full URLs (`https://ghe.example.com/`) as well as bare
    /// hostnames (`ghe.example.com`), which default to https. Any path,
    /// query or credentials in the input are dropped.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(HubAuthError::InvalidHostAddress(input.to_string()));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let parsed = Url::parse(&with_scheme)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HubAuthError::InvalidHostAddress(input.to_string()));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| HubAuthError::InvalidHostAddress(input.to_string()))?
            .to_ascii_lowercase();

        if GITHUB_DOT_COM_HOSTS.contains(&host.as_str()) {
            return Ok(Self::github_dot_com());
        }

        // `port()` is None for the scheme's default port
        let web = match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };

        Ok(Self {
            web,
            is_github_dot_com: false,
        })
    }

    /// Whether this is the public github.com host
    pub fn is_github_dot_com(&self) -> bool {
        self.is_github_dot_com
    }

    /// Whether this is a self-hosted Enterprise server
    pub fn is_enterprise(&self) -> bool {
        !self.is_github_dot_com
    }

    /// Web root without trailing slash
    pub fn web_uri(&self) -> &str {
        &self.web
    }

    /// REST API root, always ending in `/`
    pub fn api_uri(&self) -> String {
        if self.is_github_dot_com {
            GITHUB_API.to_string()
        } else {
            format!("{}/api/v3/", self.web)
        }
    }

    /// Key under which credentials and cached objects for this host are stored
    ///
    /// The scheme is left out for https hosts only, so a plain-http server
    /// never shares an entry with the https one on the same host and port.
    pub fn credential_key(&self) -> String {
        match self.web.strip_prefix("https://") {
            Some(rest) => rest.to_string(),
            None => self.web.clone(),
        }
    }
}

impl Default for HostAddress {
    fn default() -> Self {
        Self::github_dot_com()
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.web)
    }
}

impl std::str::FromStr for HostAddress {
    type Err = HubAuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
