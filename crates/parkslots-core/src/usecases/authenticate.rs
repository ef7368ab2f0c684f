//! Authentication use case
//!
//! Wraps an [`IIdentityProvider`] with the policy the rest of the
//! application relies on: which account to use, which scopes to request,
//! and when an interactive flow is allowed to interrupt the user.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    domain::Account,
    ports::{
        AuthError, IAccessTokenSource, IIdentityProvider, LoginRequest, Prompt, TokenRequest,
    },
};

/// Scopes requested when none are configured
pub const DEFAULT_SCOPES: &[&str] = &["User.Read", "Sites.ReadWrite.All"];

/// Token and account policy over an identity provider
///
/// The "current" account is the active account if one is set, otherwise
/// the first cached account.
pub struct IdentityAdapter {
    provider: Arc<dyn IIdentityProvider>,
    scopes: Vec<String>,
}

impl IdentityAdapter {
    /// Creates an adapter requesting [`DEFAULT_SCOPES`]
    pub fn new(provider: Arc<dyn IIdentityProvider>) -> Self {
        Self {
            provider,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replaces the requested scopes; an empty list keeps the defaults
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        if !scopes.is_empty() {
            self.scopes = scopes;
        }
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// The account token requests target, without any interaction
    pub fn current_account(&self) -> Option<Account> {
        self.provider
            .active_account()
            .or_else(|| self.provider.all_accounts().into_iter().next())
    }

    /// Returns a signed-in account, logging in interactively if needed
    ///
    /// A cached account is promoted to active without user interaction.
    /// Only when the cache is empty does the user see a login prompt
    /// (`select_account`); the first account afterwards becomes active.
    pub async fn ensure_login(&self) -> Result<Account, AuthError> {
        if let Some(account) = self.provider.active_account() {
            debug!(username = %account.username, "Using active account");
            return Ok(account);
        }

        if let Some(account) = self.provider.all_accounts().into_iter().next() {
            debug!(username = %account.username, "Activating cached account");
            self.provider.set_active_account(Some(&account));
            return Ok(account);
        }

        info!("No cached account, starting interactive login");
        let request = LoginRequest {
            scopes: self.scopes.clone(),
            prompt: Some(Prompt::SelectAccount),
        };
        let result = self.provider.login_popup(&request).await?;

        let account = self
            .provider
            .all_accounts()
            .into_iter()
            .next()
            .unwrap_or(result.account);
        self.provider.set_active_account(Some(&account));

        info!(username = %account.username, "Signed in");
        Ok(account)
    }

    /// Returns an access token for the current account
    ///
    /// Silent acquisition is tried first. Only [`AuthError::InteractionRequired`]
    /// triggers the interactive fallback with the same scopes; every other
    /// failure is returned as is.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoSession`] if no account is cached.
    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        let account = self.current_account().ok_or(AuthError::NoSession)?;
        let request = TokenRequest {
            scopes: self.scopes.clone(),
            account,
        };

        match self.provider.acquire_token_silent(&request).await {
            Ok(result) => Ok(result.access_token),
            Err(AuthError::InteractionRequired(reason)) => {
                warn!(reason = %reason, "Silent token acquisition needs interaction");
                let result = self.provider.acquire_token_popup(&request).await?;
                Ok(result.access_token)
            }
            Err(err) => Err(err),
        }
    }

    /// Signs the current account out interactively
    pub async fn logout(&self) -> Result<(), AuthError> {
        let account = self.current_account();
        self.provider.logout_popup(account.as_ref()).await?;
        info!(
            username = account.as_ref().map(|a| a.username.as_str()).unwrap_or(""),
            "Signed out"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl IAccessTokenSource for IdentityAdapter {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.get_access_token().await
    }
}
