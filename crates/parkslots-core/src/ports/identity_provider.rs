//! Identity provider port (driven/secondary port)
//!
//! Models an MSAL-style public client: an account cache with one active
//! account, silent token acquisition from cached session material, and
//! interactive flows (login, token, logout) that require the user.
//!
//! ## Design Notes
//!
//! - Silent acquisition reports [`AuthError::InteractionRequired`] when only
//!   the user can fix the problem (no cached tokens, refresh rejected).
//!   Every other failure uses a different variant, so callers can fall back
//!   to an interactive flow only when it can actually help.
//! - Account enumeration is synchronous; it reads local state only.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Account;

/// Authentication failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No account is signed in
    #[error("No session: call ensure_login first")]
    NoSession,

    /// Silent acquisition cannot succeed without user interaction
    #[error("Interaction required: {0}")]
    InteractionRequired(String),

    /// The user dismissed or abandoned an interactive flow
    #[error("Interactive flow cancelled: {0}")]
    Cancelled(String),

    /// Any other identity-provider failure
    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Prompt behaviour for interactive login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Let the user pick among signed-in accounts
    SelectAccount,
    /// Force credential entry
    Login,
    /// Force the consent screen
    Consent,
}

impl Prompt {
    pub fn as_str(self) -> &'static str {
        match self {
            Prompt::SelectAccount => "select_account",
            Prompt::Login => "login",
            Prompt::Consent => "consent",
        }
    }
}

/// Parameters for an interactive login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub scopes: Vec<String>,
    pub prompt: Option<Prompt>,
}

/// Parameters for token acquisition on behalf of an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub scopes: Vec<String>,
    pub account: Account,
}

/// Outcome of a successful login or token acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub access_token: String,
    pub account: Account,
    pub expires_on: Option<DateTime<Utc>>,
}

/// Port trait for the identity provider
#[async_trait::async_trait]
pub trait IIdentityProvider: Send + Sync {
    /// The account token acquisition currently targets
    fn active_account(&self) -> Option<Account>;

    /// All cached accounts, in cache order
    fn all_accounts(&self) -> Vec<Account>;

    /// Marks `account` active, or clears the active account with `None`
    fn set_active_account(&self, account: Option<&Account>);

    /// Interactive sign-in; the new account is added to the cache
    async fn login_popup(&self, request: &LoginRequest)
        -> Result<AuthenticationResult, AuthError>;

    /// Non-interactive token acquisition from cached session material
    async fn acquire_token_silent(
        &self,
        request: &TokenRequest,
    ) -> Result<AuthenticationResult, AuthError>;

    /// Interactive token acquisition
    async fn acquire_token_popup(
        &self,
        request: &TokenRequest,
    ) -> Result<AuthenticationResult, AuthError>;

    /// Interactive sign-out; the account is removed from the cache
    async fn logout_popup(&self, account: Option<&Account>) -> Result<(), AuthError>;
}

/// Port trait for anything that can hand out a bearer token
///
/// The Graph transport asks for a token on every request.
#[async_trait::async_trait]
pub trait IAccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token, for tests and tokens obtained out of band
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl IAccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}
