//! hubauth - log in to GitHub and GitHub Enterprise hosts
//!
//! Negotiates a scoped application token for a host (falling back to
//! legacy scopes or basic auth on older Enterprise servers), stores it in
//! the system keyring and reports the login status.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hubauth::cli::auth::{self, AuthContext};
use hubauth::cli::commands::{Cli, Commands};
use hubauth::cli::config;
use hubauth::core::Config;
use hubauth::error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        // Config commands don't need stores or a network client
        Commands::Config(args) => config::handle_config(args.command),
        command => {
            let ctx = AuthContext::new(Config::load()?, cli.ephemeral, cli.client_secret)?;
            match command {
                Commands::Login(args) => auth::handle_login(&ctx, args).await,
                Commands::Logout(args) => auth::handle_logout(&ctx, args).await,
                Commands::Status(args) => auth::handle_status(&ctx, args).await,
                Commands::Config(_) => unreachable!(),
            }
        }
    }
}
