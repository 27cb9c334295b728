//! Two-factor challenge handling
//!
//! When a host demands a one-time code the API client hands a
//! `TwoFactorChallenge` to a `TwoFactorChallengeHandler` and waits for the
//! answer. The handler may prompt a user, so it is itself async.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{HubAuthError, Result};

/// How the host delivers the one-time code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorType {
    Sms,
    AuthenticatorApp,
    Unknown,
}

impl TwoFactorType {
    /// Parse the delivery method from an `X-GitHub-OTP` header value
    pub fn from_header_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "sms" => TwoFactorType::Sms,
            "app" => TwoFactorType::AuthenticatorApp,
            _ => TwoFactorType::Unknown,
        }
    }
}

/// Context handed to the handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoFactorChallenge {
    pub kind: TwoFactorType,
    /// The previous code for this request was rejected
    pub previous_failed: bool,
}

/// Answer from the handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwoFactorResponse {
    Code(String),
    /// Ask the host to send another SMS
    ResendCode,
    Cancel,
}

/// Collaborator that resolves two-factor challenges
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TwoFactorChallengeHandler: Send + Sync {
    async fn handle_challenge(&self, challenge: &TwoFactorChallenge) -> Result<TwoFactorResponse>;
}

/// Wraps a handler and remembers whether a challenge was presented
///
/// A 404 that follows a two-factor exchange means the credentials reached
/// the authorization endpoint, so the session must not treat it as an old
/// server and retry with legacy scopes.
pub struct InterceptingTwoFactorHandler {
    inner: Arc<dyn TwoFactorChallengeHandler>,
    challenged: AtomicBool,
}

impl InterceptingTwoFactorHandler {
    pub fn new(inner: Arc<dyn TwoFactorChallengeHandler>) -> Self {
        Self {
            inner,
            challenged: AtomicBool::new(false),
        }
    }

    /// Whether the host issued at least one challenge
    pub fn was_challenged(&self) -> bool {
        self.challenged.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TwoFactorChallengeHandler for InterceptingTwoFactorHandler {
    async fn handle_challenge(&self, challenge: &TwoFactorChallenge) -> Result<TwoFactorResponse> {
        self.challenged.store(true, Ordering::SeqCst);
        self.inner.handle_challenge(challenge).await
    }
}

/// Handler that prompts on the terminal
pub struct PromptTwoFactorHandler;

impl PromptTwoFactorHandler {
    fn prompt(challenge: &TwoFactorChallenge) -> Result<TwoFactorResponse> {
        if challenge.previous_failed {
            eprintln!("✗ That code was not accepted.");
        }
        match challenge.kind {
            TwoFactorType::Sms => {
                eprintln!("A two-factor code was sent to your phone by SMS.");
                eprintln!("  (enter 'r' to resend it)");
            }
            TwoFactorType::AuthenticatorApp => {
                eprintln!("Open your authenticator app for a two-factor code.");
            }
            TwoFactorType::Unknown => {
                eprintln!("This account requires a two-factor code.");
            }
        }
        eprint!("Two-factor code (leave empty to cancel): ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(parse_prompt_answer(&input, challenge.kind))
    }
}

#[async_trait]
impl TwoFactorChallengeHandler for PromptTwoFactorHandler {
    async fn handle_challenge(&self, challenge: &TwoFactorChallenge) -> Result<TwoFactorResponse> {
        let challenge = challenge.clone();
        tokio::task::spawn_blocking(move || Self::prompt(&challenge))
            .await
            .map_err(|e| HubAuthError::InvalidInput(e.to_string()))?
    }
}

fn parse_prompt_answer(input: &str, kind: TwoFactorType) -> TwoFactorResponse {
    let answer = input.trim();
    if answer.is_empty() {
        TwoFactorResponse::Cancel
    } else if kind == TwoFactorType::Sms && answer.eq_ignore_ascii_case("r") {
        TwoFactorResponse::ResendCode
    } else {
        TwoFactorResponse::Code(answer.to_string())
    }
}
