//! GitHub API integration module
//!
//! This module provides the network side of a login:
//! - The `ApiClient` seam and its REST implementation
//! - Two-factor challenge handling
//! - Error classification

pub mod api;
pub mod error_handler;
pub mod two_factor;

pub use api::{
    Account, ApiClient, ApiClientFactory, ApplicationAuthorization, GitHubApiClient,
    GitHubApiClientFactory, OAuthApp, ScopeSet, UserAndScopes,
};
pub use two_factor::{
    PromptTwoFactorHandler, TwoFactorChallenge, TwoFactorChallengeHandler, TwoFactorResponse,
    TwoFactorType,
};
