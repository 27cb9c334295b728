//! Custom error types for hubauth
//!
//! User-friendly error messages for all failure scenarios. The login
//! pipeline branches on the specific variant, so errors coming back from a
//! host keep their kind all the way up to the caller.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for hubauth
#[derive(Error, Debug)]
pub enum HubAuthError {
    /// The host answered 404 (unknown endpoint or server too old for scoped tokens)
    #[error("The host returned 404 Not Found: {0}\n\n  → Check the host address, or the server may not support scoped tokens.")]
    NotFound(String),

    /// The host rejected the requested scopes with a 422
    #[error("The host rejected the requested token scopes: {0}")]
    ScopesRejected(String),

    /// The two-factor code was rejected or the prompt was cancelled
    #[error("{}", two_factor_message(.cancelled))]
    TwoFactorChallengeFailed {
        /// Whether the user dismissed the prompt instead of entering a code
        cancelled: bool,
    },

    /// Username or password (or token) was refused
    #[error("Bad credentials: {0}\n\n  → Check your username and password and try again.")]
    BadCredentials(String),

    /// Any other non-success HTTP response
    #[error("Request to the host failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// The login took longer than the configured timeout
    #[error("Timed out talking to the host after {0} seconds.\n\n  → Check your network connection or raise 'request_timeout_secs'.")]
    Timeout(u64),

    /// A session cache key had no entry
    #[error("No cached value for key '{0}'")]
    CacheMiss(String),

    /// No stored credentials for a host
    #[error("You are not logged in to {0}.\n\n  → Run 'hubauth login --host {0}' to authenticate.")]
    NotAuthenticated(String),

    /// Host URL could not be parsed
    #[error("Cannot parse host address: {0}\n\n  → Expected format: https://github.com or https://ghe.example.com")]
    InvalidHostAddress(String),

    /// Credential storage error
    #[error("Cannot access secure storage: {0}\n\n  → On macOS: Make sure Keychain Access is available.\n  → On Linux: Ensure a secret service (like gnome-keyring) is running.")]
    Credential(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// Network request error
    #[error("Network request failed: {0}\n\n  → Check your internet connection.")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Failed to parse data: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization/deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),

    /// Invalid input from user
    #[error("{0}")]
    InvalidInput(String),
}

impl HubAuthError {
    /// Build the error for a non-success HTTP status
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::NOT_FOUND => HubAuthError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY => HubAuthError::ScopesRejected(message),
            StatusCode::UNAUTHORIZED => HubAuthError::BadCredentials(message),
            _ => HubAuthError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// 404 from the host
    pub fn is_not_found(&self) -> bool {
        matches!(self, HubAuthError::NotFound(_))
    }

    /// 422 scope validation failure
    pub fn is_scopes_rejected(&self) -> bool {
        matches!(self, HubAuthError::ScopesRejected(_))
    }

    /// Rejected or cancelled two-factor challenge
    pub fn is_two_factor_failure(&self) -> bool {
        matches!(self, HubAuthError::TwoFactorChallengeFailed { .. })
    }

    /// Failures that say nothing about the credentials themselves
    pub fn is_transport(&self) -> bool {
        matches!(self, HubAuthError::Network(_) | HubAuthError::Timeout(_))
    }
}

impl From<keyring::Error> for HubAuthError {
    fn from(err: keyring::Error) -> Self {
        HubAuthError::Credential(err.to_string())
    }
}

impl From<toml::de::Error> for HubAuthError {
    fn from(err: toml::de::Error) -> Self {
        HubAuthError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for HubAuthError {
    fn from(err: toml::ser::Error) -> Self {
        HubAuthError::Toml(err.to_string())
    }
}

impl From<url::ParseError> for HubAuthError {
    fn from(err: url::ParseError) -> Self {
        HubAuthError::InvalidHostAddress(err.to_string())
    }
}

fn two_factor_message(cancelled: &bool) -> &'static str {
    if *cancelled {
        "Two-factor authentication was cancelled."
    } else {
        "Two-factor authentication failed.\n\n  → Check the code from your authenticator app or SMS and try again."
    }
}

/// Result type alias using HubAuthError
pub type Result<T> = std::result::Result<T, HubAuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_auth_signals() {
        assert!(HubAuthError::from_status(StatusCode::NOT_FOUND, "x").is_not_found());
        assert!(
            HubAuthError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad scopes")
                .is_scopes_rejected()
        );
        assert!(matches!(
            HubAuthError::from_status(StatusCode::UNAUTHORIZED, "nope"),
            HubAuthError::BadCredentials(_)
        ));
        assert!(matches!(
            HubAuthError::from_status(StatusCode::BAD_GATEWAY, "oops"),
            HubAuthError::Api { status: 502, .. }
        ));
    }

    #[test]
    fn test_two_factor_messages() {
        let cancelled = HubAuthError::TwoFactorChallengeFailed { cancelled: true };
        assert_eq!(
            cancelled.to_string(),
            "Two-factor authentication was cancelled."
        );
        assert!(cancelled.is_two_factor_failure());
        assert!(!HubAuthError::Timeout(5).is_two_factor_failure());
        assert!(HubAuthError::Timeout(5).is_transport());
    }
}
