//! OAuthIdentityProvider - IIdentityProvider implementation for Microsoft identity platform
//!
//! Combines the PKCE flow, the local callback server, and browser launching
//! from [`crate::auth`] into the [`IIdentityProvider`] port contract.
//!
//! ## Design Notes
//!
//! - The account list and the active account live in the key-value store
//!   (`auth:accounts`, `auth:active`); tokens live in [`TokenStorage`],
//!   keyed by username.
//! - Silent acquisition never touches the browser. Missing tokens, a missing
//!   refresh token, or a rejected refresh all surface as
//!   [`AuthError::InteractionRequired`].
//! - "Popup" flows open the system browser and wait on the loopback
//!   redirect for at most [`INTERACTIVE_TIMEOUT`].

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use parkslots_core::{
    domain::Account,
    ports::{
        AuthError, AuthenticationResult, IIdentityProvider, IKeyValueStore, LoginRequest, Prompt,
        TokenRequest,
    },
};
use tracing::{debug, info, warn};

use crate::auth::{LocalCallbackServer, OAuth2Config, PKCEFlow, StoredTokens, TokenStorage};
use crate::client::{GraphClient, GRAPH_BASE_URL};

/// Key-value store key holding the JSON list of cached accounts
pub const ACCOUNTS_KEY: &str = "auth:accounts";

/// Key-value store key holding the active account's `home_account_id`
pub const ACTIVE_KEY: &str = "auth:active";

/// Longest wait for the user to finish an interactive flow
pub const INTERACTIVE_TIMEOUT: StdDuration = StdDuration::from_secs(300);

/// Stored access tokens closer than this to expiry are refreshed
const EXPIRY_MARGIN_MINUTES: i64 = 5;

/// Opens a URL for the user; the system browser by default
pub type BrowserOpener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// Identity provider backed by OAuth2 PKCE against Microsoft identity platform
pub struct OAuthIdentityProvider {
    config: OAuth2Config,
    store: Arc<dyn IKeyValueStore>,
    tokens: Arc<dyn TokenStorage>,
    graph_base_url: String,
    open_browser: BrowserOpener,
}

impl OAuthIdentityProvider {
    /// Creates a provider
    ///
    /// # Arguments
    ///
    /// * `config` - Client, tenant, and redirect settings
    /// * `store` - Persistence for the account cache
    /// * `tokens` - Persistence for token sets
    pub fn new(
        config: OAuth2Config,
        store: Arc<dyn IKeyValueStore>,
        tokens: Arc<dyn TokenStorage>,
    ) -> Self {
        Self {
            config,
            store,
            tokens,
            graph_base_url: GRAPH_BASE_URL.to_string(),
            open_browser: Arc::new(|url: &str| webbrowser::open(url)),
        }
    }

    /// Graph endpoint used to look up the signed-in user
    pub fn with_graph_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.graph_base_url = base_url.into();
        self
    }

    /// Replaces the browser launcher (headless runs, tests)
    pub fn with_browser(mut self, open_browser: BrowserOpener) -> Self {
        self.open_browser = open_browser;
        self
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    // ------------------------------------------------------------------
    // Account cache
    // ------------------------------------------------------------------

    fn load_accounts(&self) -> Vec<Account> {
        match self.store.get_item(ACCOUNTS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring unreadable account cache");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read account cache");
                Vec::new()
            }
        }
    }

    fn save_accounts(&self, accounts: &[Account]) {
        let result = serde_json::to_string(accounts)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.store
                    .set_item(ACCOUNTS_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "Failed to write account cache");
        }
    }

    /// Adds `account`, replacing a cached entry with the same ID in place
    fn remember_account(&self, account: &Account) {
        let mut accounts = self.load_accounts();
        match accounts
            .iter_mut()
            .find(|a| a.home_account_id == account.home_account_id)
        {
            Some(existing) => *existing = account.clone(),
            None => accounts.push(account.clone()),
        }
        self.save_accounts(&accounts);
    }

    fn forget_account(&self, account: &Account) {
        let mut accounts = self.load_accounts();
        accounts.retain(|a| a.home_account_id != account.home_account_id);
        self.save_accounts(&accounts);

        if self.active_id().as_deref() == Some(account.home_account_id.as_str()) {
            self.set_active_account(None);
        }
    }

    fn active_id(&self) -> Option<String> {
        self.store.get_item(ACTIVE_KEY).ok().flatten()
    }

    // ------------------------------------------------------------------
    // Flows
    // ------------------------------------------------------------------

    fn flow(&self, scopes: &[String]) -> Result<PKCEFlow, AuthError> {
        PKCEFlow::new(&self.config, scopes).map_err(|e| AuthError::Provider(format!("{e:#}")))
    }

    /// Browser round trip: authorize, receive the code, exchange it, look
    /// up the user, and cache both tokens and account.
    async fn interactive(
        &self,
        scopes: &[String],
        prompt: Option<Prompt>,
        login_hint: Option<&str>,
    ) -> Result<AuthenticationResult, AuthError> {
        info!("Starting OAuth2 PKCE login flow");
        let flow = self.flow(scopes)?;

        let server = LocalCallbackServer::bind(&self.config.redirect_uri)
            .await
            .map_err(|e| AuthError::Provider(format!("{e:#}")))?;

        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url(prompt, login_hint);

        info!("Opening browser for authentication");
        (self.open_browser)(&auth_url)
            .map_err(|e| AuthError::Provider(format!("Failed to open browser: {e}")))?;

        let callback = tokio::time::timeout(INTERACTIVE_TIMEOUT, server.wait())
            .await
            .map_err(|_| AuthError::Cancelled("timed out waiting for sign-in".to_string()))??;

        if callback.state != *csrf_token.secret() {
            return Err(AuthError::Provider(
                "OAuth state mismatch in callback".to_string(),
            ));
        }

        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;

        let account = GraphClient::with_token(tokens.access_token.clone())
            .with_base_url(self.graph_base_url.clone())
            .get_me()
            .await
            .map_err(|e| AuthError::Provider(format!("Failed to fetch user profile: {e}")))?;

        self.tokens
            .store(&account.username, &tokens)
            .map_err(|e| AuthError::Provider(format!("{e:#}")))?;
        self.remember_account(&account);

        info!(username = %account.username, "OAuth2 PKCE login completed successfully");
        Ok(result(tokens, account))
    }
}

fn result(tokens: StoredTokens, account: Account) -> AuthenticationResult {
    AuthenticationResult {
        access_token: tokens.access_token,
        account,
        expires_on: Some(tokens.expires_at),
    }
}

#[async_trait::async_trait]
impl IIdentityProvider for OAuthIdentityProvider {
    fn active_account(&self) -> Option<Account> {
        let id = self.active_id()?;
        self.load_accounts()
            .into_iter()
            .find(|a| a.home_account_id == id)
    }

    fn all_accounts(&self) -> Vec<Account> {
        self.load_accounts()
    }

    fn set_active_account(&self, account: Option<&Account>) {
        let result = match account {
            Some(account) => self.store.set_item(ACTIVE_KEY, &account.home_account_id),
            None => self.store.remove_item(ACTIVE_KEY),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist active account");
        }
    }

    async fn login_popup(
        &self,
        request: &LoginRequest,
    ) -> Result<AuthenticationResult, AuthError> {
        self.interactive(&request.scopes, request.prompt, None).await
    }

    async fn acquire_token_silent(
        &self,
        request: &TokenRequest,
    ) -> Result<AuthenticationResult, AuthError> {
        let username = &request.account.username;
        let stored = self
            .tokens
            .load(username)
            .map_err(|e| AuthError::Provider(format!("{e:#}")))?
            .ok_or_else(|| AuthError::InteractionRequired("no cached tokens".to_string()))?;

        if stored.is_valid_for(Duration::minutes(EXPIRY_MARGIN_MINUTES)) {
            debug!(username = %username, "Using cached access token");
            return Ok(result(stored, request.account.clone()));
        }

        let refresh_token = stored
            .refresh_token
            .ok_or_else(|| AuthError::InteractionRequired("no refresh token".to_string()))?;

        let fresh = self.flow(&request.scopes)?.refresh_token(&refresh_token).await?;
        if let Err(e) = self.tokens.store(username, &fresh) {
            warn!(error = %e, "Failed to store refreshed tokens");
        }

        Ok(result(fresh, request.account.clone()))
    }

    async fn acquire_token_popup(
        &self,
        request: &TokenRequest,
    ) -> Result<AuthenticationResult, AuthError> {
        self.interactive(&request.scopes, None, Some(&request.account.username))
            .await
    }

    async fn logout_popup(&self, account: Option<&Account>) -> Result<(), AuthError> {
        let account = account.cloned().or_else(|| self.active_account());

        let mut logout_url = self.config.logout_url();
        if let Some(account) = &account {
            logout_url = format!(
                "{}?{}",
                logout_url,
                url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("logout_hint", &account.username)
                    .finish()
            );
        }
        if let Err(e) = (self.open_browser)(&logout_url) {
            warn!(error = %e, "Failed to open browser for sign-out");
        }

        if let Some(account) = account {
            if let Err(e) = self.tokens.clear(&account.username) {
                warn!(error = %e, "Failed to clear stored tokens");
            }
            self.forget_account(&account);
            info!(username = %account.username, "Signed out");
        }
        Ok(())
    }
}
