//! Authentication CLI command handlers

use std::io::{self, Write};
use std::sync::Arc;

use crate::cli::commands::{HostArgs, LoginArgs};
use crate::core::cache::{BlobCache, FileBlobCache, MemoryBlobCache};
use crate::core::config::Config;
use crate::core::credentials::{mask_secret, KeyringLoginStore, LoginStore, MemoryLoginStore};
use crate::core::host_address::HostAddress;
use crate::core::registry::HostRegistry;
use crate::core::session::AuthenticationResult;
use crate::error::{HubAuthError, Result};
use crate::github::api::GitHubApiClientFactory;
use crate::github::two_factor::PromptTwoFactorHandler;

/// Everything the auth commands need, wired from configuration
pub struct AuthContext {
    pub config: Config,
    pub logins: Arc<dyn LoginStore>,
    pub registry: HostRegistry,
}

impl AuthContext {
    /// Build the stores, API client factory and registry for this run
    pub fn new(config: Config, ephemeral: bool, client_secret: Option<String>) -> Result<Self> {
        let logins: Arc<dyn LoginStore> = if ephemeral {
            Arc::new(MemoryLoginStore::new())
        } else {
            Arc::new(KeyringLoginStore::new())
        };
        let cache: Arc<dyn BlobCache> = if ephemeral {
            Arc::new(MemoryBlobCache::new())
        } else {
            Arc::new(FileBlobCache::new(config.session_cache_dir()?))
        };

        let clients = GitHubApiClientFactory::new(
            logins.clone(),
            config.oauth_app(client_secret),
        )?;

        let registry = HostRegistry::new(
            Arc::new(clients),
            logins.clone(),
            cache,
            Arc::new(PromptTwoFactorHandler),
            config.clone(),
        );

        Ok(Self {
            config,
            logins,
            registry,
        })
    }

    fn host(&self, args: &HostArgs) -> Result<HostAddress> {
        match &args.host {
            Some(host) => HostAddress::parse(host),
            None => self.config.default_host_address(),
        }
    }
}

/// Handle the login command
pub async fn handle_login(ctx: &AuthContext, args: LoginArgs) -> Result<()> {
    let host = ctx.host(&args.host)?;

    let user_name = match args.user {
        Some(user) => user,
        None => prompt("Username or email: ")?,
    };
    if user_name.is_empty() {
        return Err(HubAuthError::InvalidInput("No username provided".to_string()));
    }

    let password = prompt("Password: ")?;
    if password.is_empty() {
        return Err(HubAuthError::InvalidInput("No password provided".to_string()));
    }

    println!();
    println!("Logging in to {}...", host);

    let session = ctx.registry.session(&host)?;
    match session.login(&user_name, &password).await {
        Ok(_) => {
            let login = session
                .user()
                .map(|user| user.login)
                .unwrap_or(user_name);
            println!("✓ Logged in to {} as @{}", host, login);
            if !session.supports_gist() {
                println!("  Gists are not available with the granted scopes.");
            }
            Ok(())
        }
        Err(e) => {
            match AuthenticationResult::from_error(&e, &host) {
                AuthenticationResult::EnterpriseServerNotFound => {
                    eprintln!("✗ {} does not look like a GitHub Enterprise server.", host);
                }
                AuthenticationResult::VerificationFailure => {
                    eprintln!("✗ Two-factor verification failed.");
                }
                _ => {}
            }
            Err(e)
        }
    }
}

/// Handle the logout command
pub async fn handle_logout(ctx: &AuthContext, args: HostArgs) -> Result<()> {
    let host = ctx.host(&args)?;

    if ctx.logins.get_login(&host).await?.is_empty() {
        println!("Not currently logged in to {}.", host);
        return Ok(());
    }

    ctx.registry.log_out(&host).await?;
    println!("Successfully logged out of {}.", host);
    Ok(())
}

/// Handle the status command
pub async fn handle_status(ctx: &AuthContext, args: HostArgs) -> Result<()> {
    let host = ctx.host(&args)?;
    let stored = ctx.logins.get_login(&host).await?;

    println!("Authentication Status:");
    println!("  Host: {}", host);

    if stored.is_empty() {
        println!("  Not logged in to {}", host);
        return Ok(());
    }

    let session = ctx.registry.session(&host)?;
    match session.login_from_cache().await {
        Ok(_) => {
            if let Some(user) = session.user() {
                println!("  Logged in as: @{}", user.login);
            }
            println!("  Credential: {}", mask_secret(&stored.password));
            println!(
                "  Gists: {}",
                if session.supports_gist() {
                    "available"
                } else {
                    "not available"
                }
            );
            Ok(())
        }
        Err(e) if e.is_transport() => {
            println!("  Stored login for: {} (host unreachable)", stored.user_name);
            Err(e)
        }
        Err(e) => {
            println!("  Stored login was rejected and has been removed.");
            Err(e)
        }
    }
}

/// Read one trimmed line from stdin after printing `label`
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
