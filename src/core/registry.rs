//! One session per host
//!
//! The registry hands out a single shared `HostSession` per `HostAddress`
//! so that concurrent logins to the same host go through the same session
//! lock, while every session shares one login store and one cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::cache::BlobCache;
use crate::core::config::{AuthMode, Config};
use crate::core::credentials::LoginStore;
use crate::core::host_address::HostAddress;
use crate::core::session::{AuthenticationResult, HostSession};
use crate::error::{HubAuthError, Result};
use crate::github::api::ApiClientFactory;
use crate::github::two_factor::TwoFactorChallengeHandler;

/// Creates and tracks host sessions
pub struct HostRegistry {
    clients: Arc<dyn ApiClientFactory>,
    logins: Arc<dyn LoginStore>,
    cache: Arc<dyn BlobCache>,
    two_factor: Arc<dyn TwoFactorChallengeHandler>,
    config: Config,
    sessions: Mutex<HashMap<HostAddress, Arc<HostSession>>>,
}

impl HostRegistry {
    pub fn new(
        clients: Arc<dyn ApiClientFactory>,
        logins: Arc<dyn LoginStore>,
        cache: Arc<dyn BlobCache>,
        two_factor: Arc<dyn TwoFactorChallengeHandler>,
        config: Config,
    ) -> Self {
        Self {
            clients,
            logins,
            cache,
            two_factor,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for `host`, created on first use
    pub fn session(&self, host: &HostAddress) -> Result<Arc<HostSession>> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| HubAuthError::Config(format!("Session registry poisoned: {}", e)))?;

        if let Some(session) = sessions.get(host) {
            return Ok(session.clone());
        }

        let session = Arc::new(self.build_session(host));
        sessions.insert(host.clone(), session.clone());
        Ok(session)
    }

    fn build_session(&self, host: &HostAddress) -> HostSession {
        let mut session = HostSession::new(
            self.clients.create(host),
            self.logins.clone(),
            self.cache.clone(),
            self.two_factor.clone(),
        );

        let auth_mode = self.config.auth_mode(host);
        if auth_mode != AuthMode::Token {
            session = session.with_auth_mode(auth_mode);
        }
        if self.config.request_timeout_secs > 0 {
            session = session.with_timeout(Duration::from_secs(self.config.request_timeout_secs));
        }
        session
    }

    /// Log in to `host`
    pub async fn log_in(
        &self,
        host: &HostAddress,
        user_name: &str,
        password: &str,
    ) -> Result<AuthenticationResult> {
        self.session(host)?.login(user_name, password).await
    }

    /// Log out of `host`
    pub async fn log_out(&self, host: &HostAddress) -> Result<()> {
        self.session(host)?.log_out().await
    }

    /// Hosts whose session is currently logged in
    pub fn logged_in_hosts(&self) -> Vec<HostAddress> {
        let Ok(sessions) = self.sessions.lock() else {
            return Vec::new();
        };
        let mut hosts: Vec<HostAddress> = sessions
            .values()
            .filter(|session| session.is_logged_in())
            .map(|session| session.address().clone())
            .collect();
        hosts.sort_by(|a, b| a.web_uri().cmp(b.web_uri()));
        hosts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::MemoryBlobCache;
    use crate::core::credentials::{LoginInfo, MemoryLoginStore};
    use crate::github::api::{
        Account, ApiClient, ApplicationAuthorization, MockApiClient, UserAndScopes,
    };
    use crate::github::two_factor::MockTwoFactorChallengeHandler;

    /// Hands out mocks that accept any login
    struct AcceptingFactory;

    impl ApiClientFactory for AcceptingFactory {
        fn create(&self, host: &HostAddress) -> Arc<dyn ApiClient> {
            let mut api = MockApiClient::new();
            api.expect_host_address().return_const(host.clone());
            api.expect_get_or_create_application_authentication()
                .returning(|_, _| Ok(ApplicationAuthorization::new("token")));
            api.expect_get_user().returning(|| {
                Ok(UserAndScopes {
                    user: Account {
                        login: "octocat".to_string(),
                        id: 1,
                        name: None,
                        email: None,
                        avatar_url: None,
                        html_url: None,
                        is_enterprise: false,
                    },
                    scopes: None,
                })
            });
            Arc::new(api)
        }
    }

    fn registry(logins: Arc<MemoryLoginStore>) -> HostRegistry {
        HostRegistry::new(
            Arc::new(AcceptingFactory),
            logins,
            Arc::new(MemoryBlobCache::new()),
            Arc::new(MockTwoFactorChallengeHandler::new()),
            Config::default(),
        )
    }

    #[test]
    fn test_same_host_gets_same_session() {
        let registry = registry(Arc::new(MemoryLoginStore::new()));
        let a = registry
            .session(&HostAddress::parse("https://ghe.example.com/").unwrap())
            .unwrap();
        let b = registry
            .session(&HostAddress::parse("ghe.example.com").unwrap())
            .unwrap();
        let c = registry.session(&HostAddress::github_dot_com()).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_log_in_and_out_tracks_hosts() {
        let logins = Arc::new(MemoryLoginStore::new());
        let registry = registry(logins.clone());
        let github = HostAddress::github_dot_com();
        let enterprise = HostAddress::parse("https://ghe.example.com").unwrap();

        registry.log_in(&github, "octocat", "pw").await.unwrap();
        registry.log_in(&enterprise, "octocat", "pw").await.unwrap();
        assert_eq!(
            registry.logged_in_hosts(),
            vec![enterprise.clone(), github.clone()]
        );

        registry.log_out(&github).await.unwrap();
        assert_eq!(registry.logged_in_hosts(), vec![enterprise.clone()]);
        assert_eq!(logins.get_login(&github).await.unwrap(), LoginInfo::empty());
        assert_eq!(
            logins.get_login(&enterprise).await.unwrap(),
            LoginInfo::new("octocat", "token")
        );
    }
}
