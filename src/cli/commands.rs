//! CLI command definitions using clap
//!
//! Defines the command structure for the `hubauth` CLI tool.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// hubauth - log in to GitHub and GitHub Enterprise hosts
#[derive(Parser, Debug)]
#[command(name = "hubauth", version, about, long_about = None)]
pub struct Cli {
    /// Log each step of the login at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Keep credentials and cache in memory for this run only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// OAuth application client secret
    #[arg(long, global = true, env = "HUBAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to a host
    Login(LoginArgs),

    /// Log out of a host and remove stored credentials
    Logout(HostArgs),

    /// Show the login status of a host
    Status(HostArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Host selection shared by commands
#[derive(Args, Debug)]
pub struct HostArgs {
    /// Host URL (defaults to the configured default host)
    #[arg(long)]
    pub host: Option<String>,
}

/// Login arguments
#[derive(Args, Debug)]
pub struct LoginArgs {
    #[command(flatten)]
    pub host: HostArgs,

    /// User name or email (prompted when omitted)
    #[arg(long, short)]
    pub user: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: ConfigKey,
        /// Value to set
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: ConfigKey,
    },
    /// Print the configuration file path
    Path,
}

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum ConfigKey {
    /// Host used when --host is omitted
    DefaultHost,
    /// Seconds a login may take
    RequestTimeout,
    /// OAuth application client id
    ClientId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from([
            "hubauth",
            "login",
            "--host",
            "https://ghe.example.com",
            "--user",
            "octocat",
            "--ephemeral",
        ])
        .unwrap();

        assert!(cli.ephemeral);
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.host.host.as_deref(), Some("https://ghe.example.com"));
                assert_eq!(args.user.as_deref(), Some("octocat"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_set() {
        let cli =
            Cli::try_parse_from(["hubauth", "config", "set", "default-host", "ghe.example.com"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                command: ConfigCommand::Set {
                    key: ConfigKey::DefaultHost,
                    ..
                }
            })
        ));
    }
}
