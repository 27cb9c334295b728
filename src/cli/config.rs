//! Configuration CLI command handlers

use crate::cli::commands::{ConfigCommand, ConfigKey};
use crate::core::config::Config;
use crate::core::host_address::HostAddress;
use crate::error::{HubAuthError, Result};

/// Handle configuration commands
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set { key, value } => handle_set(key, value),
        ConfigCommand::Get { key } => handle_get(key),
        ConfigCommand::Path => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
    }
}

/// Handle setting a configuration value
fn handle_set(key: ConfigKey, value: String) -> Result<()> {
    let mut config = Config::load()?;
    apply(&mut config, key, &value)?;
    config.save()?;
    println!("{} set to: {}", key_name(key), read(&config, key));
    Ok(())
}

/// Handle getting a configuration value
fn handle_get(key: ConfigKey) -> Result<()> {
    let config = Config::load()?;
    println!("{}", read(&config, key));
    Ok(())
}

fn apply(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    match key {
        ConfigKey::DefaultHost => {
            // Store the normalized form so lookups compare equal
            config.default_host = HostAddress::parse(value)?.to_string();
        }
        ConfigKey::RequestTimeout => {
            config.request_timeout_secs = value.trim().parse().map_err(|_| {
                HubAuthError::InvalidInput(format!(
                    "Invalid timeout '{}'. Expected a number of seconds.",
                    value
                ))
            })?;
        }
        ConfigKey::ClientId => {
            if value.trim().is_empty() {
                return Err(HubAuthError::InvalidInput(
                    "Client id cannot be empty".to_string(),
                ));
            }
            config.oauth_client_id = value.trim().to_string();
        }
    }
    Ok(())
}

fn read(config: &Config, key: ConfigKey) -> String {
    match key {
        ConfigKey::DefaultHost => config.default_host.clone(),
        ConfigKey::RequestTimeout => config.request_timeout_secs.to_string(),
        ConfigKey::ClientId => config.oauth_client_id.clone(),
    }
}

fn key_name(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::DefaultHost => "Default host",
        ConfigKey::RequestTimeout => "Request timeout",
        ConfigKey::ClientId => "Client id",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_default_host_normalizes() {
        let mut config = Config::default();
        apply(&mut config, ConfigKey::DefaultHost, "GHE.example.com/").unwrap();
        assert_eq!(config.default_host, "https://ghe.example.com");
    }

    #[test]
    fn test_apply_rejects_bad_timeout() {
        let mut config = Config::default();
        assert!(apply(&mut config, ConfigKey::RequestTimeout, "soon").is_err());
        apply(&mut config, ConfigKey::RequestTimeout, " 12 ").unwrap();
        assert_eq!(read(&config, ConfigKey::RequestTimeout), "12");
    }

    #[test]
    fn test_apply_rejects_empty_client_id() {
        let mut config = Config::default();
        assert!(apply(&mut config, ConfigKey::ClientId, "  ").is_err());
        assert_eq!(config.oauth_client_id, "hubauth");
    }
}
