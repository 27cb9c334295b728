//! hubauth - session manager for GitHub and GitHub Enterprise hosts
//!
//! This library turns a username/password into a verified, scoped and
//! cached session against a GitHub-compatible host, handling two-factor
//! challenges, legacy-scope retries for older Enterprise servers and
//! credential persistence.

pub mod cli;
pub mod core;
pub mod error;
pub mod github;

pub use error::{HubAuthError, Result};
