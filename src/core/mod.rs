//! Core functionality for hubauth
//!
//! This module contains the login machinery shared by the CLI:
//! - Host address normalization
//! - Credential storage
//! - Session cache
//! - The per-host session manager and the registry of sessions
//! - Application configuration

pub mod cache;
pub mod config;
pub mod credentials;
pub mod host_address;
pub mod registry;
pub mod session;

pub use cache::{BlobCache, FileBlobCache, HostCache, MemoryBlobCache};
pub use config::{AuthMode, Config};
pub use credentials::{KeyringLoginStore, LoginInfo, LoginStore, MemoryLoginStore};
pub use host_address::HostAddress;
pub use registry::HostRegistry;
pub use session::{AuthenticationResult, HostSession, LoginState};
