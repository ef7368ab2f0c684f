//! OAuth2 PKCE authentication flow for Microsoft Graph API
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for
//! authenticating native desktop applications with Microsoft identity platform.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client ID, tenant authority, redirect URI, scopes
//! - [`StoredTokens`] - Token set persisted per user
//! - [`TokenStorage`] - Where token sets live ([`KeyringTokenStorage`],
//!   [`MemoryTokenStorage`])
//! - [`PKCEFlow`] - OAuth2 PKCE challenge/exchange/refresh logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::{
    basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType},
    AuthUrl, AuthorizationCode, ClientId, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use parkslots_core::ports::{AuthError, Prompt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Microsoft identity platform host
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "parkslots";

/// Scope that makes the token endpoint issue refresh tokens
const OFFLINE_ACCESS: &str = "offline_access";

/// Token lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE authentication flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Application (client) ID from Azure AD app registration
    pub client_id: String,
    /// Directory (tenant) ID, or `common` / `organizations`
    pub tenant: String,
    /// Redirect URI for receiving the authorization code
    pub redirect_uri: String,
    /// Identity platform host; overridden in tests
    pub authority_host: String,
}

impl OAuth2Config {
    pub fn new(
        client_id: impl Into<String>,
        tenant: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            tenant: tenant.into(),
            redirect_uri: redirect_uri.into(),
            authority_host: AUTHORITY_HOST.to_string(),
        }
    }

    /// Points the flow at a different identity platform host
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// `{host}/{tenant}`
    pub fn authority(&self) -> String {
        format!("{}/{}", self.authority_host, self.tenant)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority())
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority())
    }

    pub fn logout_url(&self) -> String {
        format!("{}/oauth2/v2.0/logout", self.authority())
    }
}

// ============================================================================
// Token storage
// ============================================================================

/// Tokens issued for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredTokens {
    /// True if the access token stays valid for at least `margin`
    pub fn is_valid_for(&self, margin: Duration) -> bool {
        self.expires_at - Utc::now() > margin
    }
}

/// Persistence for [`StoredTokens`], keyed by username
pub trait TokenStorage: Send + Sync {
    fn store(&self, username: &str, tokens: &StoredTokens) -> Result<()>;

    /// `None` if nothing is stored for `username`
    fn load(&self, username: &str) -> Result<Option<StoredTokens>>;

    /// Clearing a missing entry is not an error
    fn clear(&self, username: &str) -> Result<()>;
}

/// Stores and retrieves OAuth tokens from the system keyring
///
/// Uses the `keyring` crate to store tokens securely in the OS credential
/// store (e.g., GNOME Keyring, KDE Wallet, macOS Keychain).
/// Tokens are serialized as JSON with the service name "parkslots" and the
/// user's sign-in name as the username.
pub struct KeyringTokenStorage;

impl TokenStorage for KeyringTokenStorage {
    fn store(&self, username: &str, tokens: &StoredTokens) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;

        entry
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;

        debug!("Stored tokens in keyring for user: {}", username);
        Ok(())
    }

    fn load(&self, username: &str) -> Result<Option<StoredTokens>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let tokens: StoredTokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!("Loaded tokens from keyring for user: {}", username);
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No tokens found in keyring for user: {}", username);
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn clear(&self, username: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!("Cleared tokens from keyring for user: {}", username);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No tokens to clear for user: {}", username);
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

/// Process-local token storage, for tests and headless runs
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    tokens: Mutex<HashMap<String, StoredTokens>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn store(&self, username: &str, tokens: &StoredTokens) -> Result<()> {
        self.tokens
            .lock()
            .map_err(|_| anyhow::anyhow!("token storage lock poisoned"))?
            .insert(username.to_string(), tokens.clone());
        Ok(())
    }

    fn load(&self, username: &str) -> Result<Option<StoredTokens>> {
        Ok(self
            .tokens
            .lock()
            .map_err(|_| anyhow::anyhow!("token storage lock poisoned"))?
            .get(username)
            .cloned())
    }

    fn clear(&self, username: &str) -> Result<()> {
        self.tokens
            .lock()
            .map_err(|_| anyhow::anyhow!("token storage lock poisoned"))?
            .remove(username);
        Ok(())
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
/// `offline_access` is always requested alongside the given scopes.
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: reqwest::Client,
    scopes: Vec<String>,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow requesting `scopes`
    pub fn new(config: &OAuth2Config, scopes: &[String]) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.authorize_url()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            );

        // The token endpoint must not be followed through redirects
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        let mut scopes: Vec<String> = scopes.to_vec();
        if !scopes.iter().any(|s| s == OFFLINE_ACCESS) {
            scopes.push(OFFLINE_ACCESS.to_string());
        }

        Ok(Self {
            client,
            http,
            scopes,
        })
    }

    /// Scopes sent with every request, `offline_access` included
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(
        &self,
        prompt: Option<Prompt>,
        login_hint: Option<&str>,
    ) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }
        if let Some(prompt) = prompt {
            auth_request = auth_request.add_extra_param("prompt", prompt.as_str());
        }
        if let Some(hint) = login_hint {
            auth_request = auth_request.add_extra_param("login_hint", hint.to_string());
        }

        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<StoredTokens, AuthError> {
        info!("Exchanging authorization code for tokens");

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .map_err(|e| classify_token_error(&e))?;

        let tokens = StoredTokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at: expiry(token_result.expires_in()),
        };

        info!("Successfully obtained OAuth tokens");
        Ok(tokens)
    }

    /// Refreshes an access token using a refresh token
    ///
    /// The old refresh token is kept if the server does not rotate it.
    ///
    /// # Errors
    ///
    /// [`AuthError::InteractionRequired`] if the server rejects the refresh
    /// token (`invalid_grant`, `interaction_required`, ...).
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<StoredTokens, AuthError> {
        info!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .request_async(&self.http)
            .await
            .map_err(|e| classify_token_error(&e))?;

        let tokens = StoredTokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expiry(token_result.expires_in()),
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

fn expiry(expires_in: Option<std::time::Duration>) -> DateTime<Utc> {
    let secs = expires_in
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    Utc::now() + Duration::seconds(secs)
}

/// Error codes meaning only the user can recover
const INTERACTION_CODES: &[&str] = &["interaction_required", "login_required", "consent_required"];

/// Maps a token endpoint failure onto [`AuthError`]
fn classify_token_error<RE>(err: &RequestTokenError<RE, BasicErrorResponse>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => {
            let description = response
                .error_description()
                .cloned()
                .unwrap_or_else(|| response.error().to_string());
            match response.error() {
                BasicErrorResponseType::InvalidGrant => AuthError::InteractionRequired(description),
                BasicErrorResponseType::Extension(code)
                    if INTERACTION_CODES.contains(&code.as_str()) =>
                {
                    AuthError::InteractionRequired(description)
                }
                other => AuthError::Provider(format!("{other}: {description}")),
            }
        }
        other => AuthError::Provider(other.to_string()),
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Parameters extracted from the OAuth2 callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

/// What the identity platform sent to the redirect URI
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallbackOutcome {
    Code(CallbackParams),
    Denied { error: String, description: String },
}

/// Minimal HTTP server that listens on the redirect URI for the OAuth2 callback.
///
/// The listener is bound before the browser is opened, so the redirect can
/// never arrive before the server is ready. Requests to other paths (the
/// browser's favicon probe, for instance) get a 404 and the server keeps
/// waiting.
pub struct LocalCallbackServer {
    listener: TcpListener,
    path: String,
}

impl LocalCallbackServer {
    /// Binds to the host and port of `redirect_uri`
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = url::Url::parse(redirect_uri).context("Invalid redirect URI")?;
        let host = url.host_str().unwrap_or("127.0.0.1");
        let host = if host == "localhost" { "127.0.0.1" } else { host };
        let port = url.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}");

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {addr}"))?;

        info!("Local OAuth callback server listening on {}", addr);
        Ok(Self {
            listener,
            path: url.path().to_string(),
        })
    }

    /// The bound address; differs from the redirect URI when it used port 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Callback server has no local address")
    }

    /// Waits for the OAuth redirect
    ///
    /// # Errors
    ///
    /// - [`AuthError::Cancelled`] if the user denied consent or closed the flow
    /// - [`AuthError::Provider`] if the listener fails
    pub async fn wait(self) -> Result<CallbackParams, AuthError> {
        let (tx, mut rx) = mpsc::channel::<CallbackOutcome>(1);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, _addr) = accepted
                        .map_err(|e| AuthError::Provider(format!("Callback server accept failed: {e}")))?;
                    tokio::spawn(serve_callback(stream, self.path.clone(), tx.clone()));
                }
                Some(outcome) = rx.recv() => {
                    return match outcome {
                        CallbackOutcome::Code(params) => {
                            info!("Received OAuth callback with authorization code");
                            Ok(params)
                        }
                        CallbackOutcome::Denied { error, description } => {
                            warn!(error = %error, "Authorization was not granted");
                            Err(AuthError::Cancelled(format!("{error}: {description}")))
                        }
                    };
                }
            }
        }
    }
}

async fn serve_callback(stream: TcpStream, path: String, tx: mpsc::Sender<CallbackOutcome>) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
        let tx = tx.clone();
        let path = path.clone();
        async move {
            let uri = req.uri().to_string();
            debug!("Callback server received request: {}", uri);

            if req.uri().path() != path {
                return Ok::<_, hyper::Error>(html_response(
                    StatusCode::NOT_FOUND,
                    error_html("Unexpected callback path"),
                ));
            }

            let response = match parse_callback_params(&uri) {
                Some(CallbackOutcome::Code(params)) => {
                    let _ = tx.try_send(CallbackOutcome::Code(params));
                    html_response(StatusCode::OK, success_html())
                }
                Some(denied) => {
                    let _ = tx.try_send(denied);
                    html_response(
                        StatusCode::OK,
                        error_html("Sign-in was cancelled or denied"),
                    )
                }
                None => html_response(
                    StatusCode::BAD_REQUEST,
                    error_html("Missing authorization code in callback"),
                ),
            };
            Ok(response)
        }
    });

    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
        warn!("Callback server connection error: {}", e);
    }
}

fn html_response(status: StatusCode, html: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(html)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Parses the callback query; `None` if it carries neither a code nor an error
fn parse_callback_params(uri: &str) -> Option<CallbackOutcome> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            "error_description" => description = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(CallbackOutcome::Denied {
            error,
            description: description.unwrap_or_default(),
        });
    }

    Some(CallbackOutcome::Code(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    }))
}

/// Returns the HTML for a successful authentication page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>ParkSlots - Authentication Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Successful</h1>
    <p>You are signed in to ParkSlots.</p>
    <p>You can close this window and return to the terminal.</p>
    <script>setTimeout(function() { window.close(); }, 3000);</script>
</body>
</html>"#
        .to_string()
}

/// Returns the HTML for an authentication error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>ParkSlots - Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}
