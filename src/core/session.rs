//! Host session manager
//!
//! A `HostSession` turns a username/password into a verified, scoped and
//! cached session against one host:
//!
//! 1. Save the raw login so the API client can authenticate the token request
//! 2. Request an application token with the new scope set
//! 3. On an Enterprise host, retry once with the old scope set when the
//!    server answers 404 (no scoped tokens) or 422 (scopes rejected);
//!    if the old scope set also gets a 404 the host has no authorization
//!    API and the login falls back to basic auth
//! 4. Save the token in place of the password when one was issued
//! 5. Fetch the user and granted scopes, cache the user, derive gist support
//!
//! Any failure that escapes this pipeline evicts the cached user, erases
//! the stored login and leaves the session logged out, then surfaces the
//! original error unchanged. A login future dropped before it finishes gets
//! the same cleanup.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::core::cache::{BlobCache, HostCache};
use crate::core::config::AuthMode;
use crate::core::credentials::LoginStore;
use crate::core::host_address::HostAddress;
use crate::error::{HubAuthError, Result};
use crate::github::api::{Account, ApiClient, ApplicationAuthorization, ScopeSet, UserAndScopes};
use crate::github::two_factor::{InterceptingTwoFactorHandler, TwoFactorChallengeHandler};

/// Cache key of the logged-in account
pub const USER_CACHE_KEY: &str = "user";

/// Outcome of a login as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationResult {
    Success,
    Failure,
    /// The two-factor code was rejected or the prompt cancelled
    VerificationFailure,
    /// An Enterprise address that does not answer like a GitHub server
    EnterpriseServerNotFound,
}

impl AuthenticationResult {
    /// Result a UI should display for a failed login
    pub fn from_error(error: &HubAuthError, host: &HostAddress) -> Self {
        match error {
            e if e.is_two_factor_failure() => AuthenticationResult::VerificationFailure,
            HubAuthError::NotFound(_) | HubAuthError::Network(_) | HubAuthError::Timeout(_)
                if host.is_enterprise() =>
            {
                AuthenticationResult::EnterpriseServerNotFound
            }
            _ => AuthenticationResult::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == AuthenticationResult::Success
    }
}

/// Where a session is in its login lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    LoggedOut,
    Authenticating,
    LoggedIn,
}

#[derive(Debug, Default)]
struct SessionState {
    login: LoginState,
    supports_gist: bool,
    user: Option<Account>,
}

/// Login session for a single host
pub struct HostSession {
    address: HostAddress,
    api: Arc<dyn ApiClient>,
    logins: Arc<dyn LoginStore>,
    cache: HostCache,
    two_factor: Arc<dyn TwoFactorChallengeHandler>,
    auth_mode: AuthMode,
    timeout: Option<Duration>,
    /// Serializes login/logout for this host
    login_lock: Arc<Mutex<()>>,
    state: RwLock<SessionState>,
}

impl HostSession {
    /// Create a logged-out session for the host `api` talks to
    pub fn new(
        api: Arc<dyn ApiClient>,
        logins: Arc<dyn LoginStore>,
        cache: Arc<dyn BlobCache>,
        two_factor: Arc<dyn TwoFactorChallengeHandler>,
    ) -> Self {
        let address = api.host_address().clone();
        let cache = HostCache::new(cache, &address);
        Self {
            address,
            api,
            logins,
            cache,
            two_factor,
            auth_mode: AuthMode::default(),
            timeout: None,
            login_lock: Arc::new(Mutex::new(())),
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Skip token negotiation and log in with username/password only
    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Bound each login by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn address(&self) -> &HostAddress {
        &self.address
    }

    pub fn state(&self) -> LoginState {
        self.read_state().login
    }

    /// True iff the most recent login succeeded
    pub fn is_logged_in(&self) -> bool {
        self.state() == LoginState::LoggedIn
    }

    /// Gist support granted by the most recent successful login
    pub fn supports_gist(&self) -> bool {
        self.read_state().supports_gist
    }

    /// Account of the current login
    pub fn user(&self) -> Option<Account> {
        self.read_state().user.clone()
    }

    /// Cache view for this host
    pub fn cache(&self) -> &HostCache {
        &self.cache
    }

    /// Log in with a username (or email) and password
    ///
    /// Returns `Success` or the error that stopped the login, with its
    /// original kind.
    pub async fn login(&self, user_name: &str, password: &str) -> Result<AuthenticationResult> {
        let pending = self.begin(true).await;
        info!(host = %self.address, user = user_name, "Logging in");

        let outcome = self
            .bounded(self.authenticate(user_name, password))
            .await;

        let result = match outcome {
            Ok(user) => {
                self.set_logged_in(user);
                info!(host = %self.address, supports_gist = self.supports_gist(), "Logged in");
                Ok(AuthenticationResult::Success)
            }
            Err(error) => {
                self.clear_after_failure(&error).await;
                Err(error)
            }
        };
        pending.finish();
        result
    }

    /// Log in with the credentials already in the store
    ///
    /// No token is requested. Transport failures leave the stored login in
    /// place; any other failure erases it like `login` does.
    pub async fn login_from_cache(&self) -> Result<AuthenticationResult> {
        let pending = self.begin(false).await;
        let result = self.login_with_stored().await;
        pending.finish();
        result
    }

    async fn login_with_stored(&self) -> Result<AuthenticationResult> {
        let stored = match self.logins.get_login(&self.address).await {
            Ok(stored) => stored,
            Err(error) => {
                self.evict_user().await;
                self.set_logged_out();
                return Err(error);
            }
        };
        if stored.is_empty() {
            self.evict_user().await;
            self.set_logged_out();
            return Err(HubAuthError::NotAuthenticated(self.address.to_string()));
        }

        debug!(host = %self.address, user = %stored.user_name, "Logging in from stored credentials");
        match self.bounded(self.fetch_and_cache_user()).await {
            Ok(user) => {
                self.set_logged_in(user);
                Ok(AuthenticationResult::Success)
            }
            Err(error) if error.is_transport() => {
                warn!(host = %self.address, error = %error, "Host unreachable, keeping stored login");
                self.evict_user().await;
                self.set_logged_out();
                Err(error)
            }
            Err(error) => {
                self.clear_after_failure(&error).await;
                Err(error)
            }
        }
    }

    /// Forget the cached user and stored login for this host
    pub async fn log_out(&self) -> Result<()> {
        let _guard = self.login_lock.lock().await;
        info!(host = %self.address, "Logging out");

        let evicted = self.cache.invalidate_object(USER_CACHE_KEY).await;
        let erased = self.logins.erase_login(&self.address).await;
        self.set_logged_out();

        evicted?;
        erased
    }

    /// Take the login lock and enter `Authenticating`
    ///
    /// The returned guard holds the lock until `finish`; if it is dropped
    /// first, the login was cancelled and gets cleaned up.
    async fn begin(&self, erase_login: bool) -> PendingLogin<'_> {
        let lock = self.login_lock.clone().lock_owned().await;
        self.set_authenticating();
        PendingLogin {
            session: self,
            lock: Some(lock),
            erase_login,
        }
    }

    async fn bounded<T>(&self, work: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or(Err(HubAuthError::Timeout(limit.as_secs()))),
            None => work.await,
        }
    }

    async fn authenticate(&self, user_name: &str, password: &str) -> Result<UserAndScopes> {
        self.logins
            .save_login(&self.address, user_name, password)
            .await?;

        if self.auth_mode == AuthMode::Basic {
            debug!(host = %self.address, "Host configured for basic auth, skipping token request");
        } else {
            let authorization = self.request_authorization().await?;
            if authorization.has_token() {
                self.logins
                    .save_login(&self.address, user_name, &authorization.token)
                    .await?;
            } else {
                debug!(host = %self.address, "No token issued, keeping basic credentials");
            }
        }

        self.fetch_and_cache_user().await
    }

    async fn request_authorization(&self) -> Result<ApplicationAuthorization> {
        let interceptor = Arc::new(InterceptingTwoFactorHandler::new(self.two_factor.clone()));
        let handler: Arc<dyn TwoFactorChallengeHandler> = interceptor.clone();

        let error = match self
            .api
            .get_or_create_application_authentication(handler.clone(), ScopeSet::New)
            .await
        {
            Ok(authorization) => return Ok(authorization),
            Err(error) => error,
        };

        if !self.should_retry_with_old_scopes(&error, interceptor.was_challenged()) {
            return Err(error);
        }

        warn!(
            host = %self.address,
            error = %error,
            "Token request rejected, retrying with legacy scopes"
        );
        match self
            .api
            .get_or_create_application_authentication(handler, ScopeSet::Old)
            .await
        {
            Ok(authorization) => Ok(authorization),
            Err(retry) if error.is_not_found() && retry.is_not_found() => {
                info!(host = %self.address, "Host has no authorization API, using basic auth");
                Ok(ApplicationAuthorization::new(""))
            }
            Err(retry) => Err(retry),
        }
    }

    /// Old Enterprise servers signal unsupported scopes with 404 or 422
    fn should_retry_with_old_scopes(&self, error: &HubAuthError, challenged: bool) -> bool {
        self.address.is_enterprise()
            && !challenged
            && (error.is_not_found() || error.is_scopes_rejected())
    }

    async fn fetch_and_cache_user(&self) -> Result<UserAndScopes> {
        let user = self.api.get_user().await?;
        self.cache.insert_object(USER_CACHE_KEY, &user.user).await?;
        Ok(user)
    }

    async fn clear_after_failure(&self, error: &HubAuthError) {
        warn!(host = %self.address, error = %error, "Login failed");

        self.evict_user().await;
        erase_stored_login(self.logins.as_ref(), &self.address).await;
        self.set_logged_out();
    }

    async fn evict_user(&self) {
        evict_cached_user(&self.cache).await;
    }

    // Every write replaces whole fields, so a poisoned lock still holds a
    // valid state.
    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_authenticating(&self) {
        let mut state = self.write_state();
        state.login = LoginState::Authenticating;
        state.supports_gist = false;
    }

    fn set_logged_in(&self, user: UserAndScopes) {
        let mut state = self.write_state();
        state.login = LoginState::LoggedIn;
        state.supports_gist = user.supports_gist();
        state.user = Some(user.user);
    }

    fn set_logged_out(&self) {
        *self.write_state() = SessionState::default();
    }
}

async fn evict_cached_user(cache: &HostCache) {
    if let Err(e) = cache.invalidate_object(USER_CACHE_KEY).await {
        warn!(scope = cache.scope(), error = %e, "Failed to evict cached user");
    }
}

async fn erase_stored_login(logins: &dyn LoginStore, host: &HostAddress) {
    if let Err(e) = logins.erase_login(host).await {
        warn!(host = %host, error = %e, "Failed to erase stored login");
    }
}

/// A login in progress, holding the session's login lock
struct PendingLogin<'a> {
    session: &'a HostSession,
    lock: Option<OwnedMutexGuard<()>>,
    /// Whether the login wrote credentials that a cancellation must erase
    erase_login: bool,
}

impl PendingLogin<'_> {
    /// The login ran to completion and did its own cleanup
    fn finish(mut self) {
        self.lock.take();
    }
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };

        let session = self.session;
        warn!(host = %session.address, "Login cancelled");
        session.set_logged_out();

        let cache = session.cache.clone();
        let logins = session.logins.clone();
        let address = session.address.clone();
        let erase_login = self.erase_login;

        // The lock moves into the cleanup task so the next login on this
        // host waits for it.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _lock = lock;
                    evict_cached_user(&cache).await;
                    if erase_login {
                        erase_stored_login(logins.as_ref(), &address).await;
                    }
                });
            }
            Err(_) => {
                warn!(host = %address, "No runtime to clean up cancelled login");
            }
        }
    }
}
