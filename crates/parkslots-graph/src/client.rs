//! Microsoft Graph API client
//!
//! Implements the [`IGraphTransport`] port over `reqwest`. Every request
//! carries a bearer token fetched from an [`IAccessTokenSource`] at send
//! time, so token refreshes are picked up without rebuilding the client.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use parkslots_graph::client::GraphClient;
//! use parkslots_core::ports::IGraphTransport;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GraphClient::with_token("access-token-here");
//! let site = client.get("/sites/contoso.sharepoint.com:/sites/Operations:").await?;
//! println!("Site id: {}", site["id"]);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use parkslots_core::{
    domain::Account,
    ports::{IAccessTokenSource, IGraphTransport, StaticToken, TransportError},
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Base URL for Microsoft Graph API v1.0
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

// ============================================================================
// Graph API response types
// ============================================================================

/// Response from the /me endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    /// User ID
    id: Option<String>,
    /// User's display name
    display_name: Option<String>,
    /// User's email (mail field)
    mail: Option<String>,
    /// User's principal name (typically email)
    user_principal_name: Option<String>,
}

/// Graph's error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

// ============================================================================
// GraphClient
// ============================================================================

/// HTTP client for Microsoft Graph API calls
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
    /// Source of bearer tokens, consulted per request
    token_source: Arc<dyn IAccessTokenSource>,
}

impl GraphClient {
    /// Creates a client that asks `token_source` for a token on every request
    pub fn new(token_source: Arc<dyn IAccessTokenSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: GRAPH_BASE_URL.to_string(),
            token_source,
        }
    }

    /// Creates a client with a fixed access token
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticToken::new(access_token)))
    }

    /// Overrides the base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL, query string included
    pub async fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, TransportError> {
        let token = self.token_source.access_token().await?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    /// Retrieves the signed-in user as an identity [`Account`]
    ///
    /// The username is the user principal name, falling back to `mail`.
    pub async fn get_me(&self) -> Result<Account, TransportError> {
        debug!("Fetching user info from /me");

        let value = self.send(Method::GET, "/me", None).await?;
        let me: MeResponse = serde_json::from_value(value)
            .map_err(|e| TransportError::InvalidResponse(format!("/me: {e}")))?;

        let id = me
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TransportError::InvalidResponse("/me: missing id".to_string()))?;
        let username = me
            .user_principal_name
            .or(me.mail)
            .unwrap_or_else(|| id.clone());

        let account = Account::new(id, username);
        Ok(match me.display_name {
            Some(name) => account.with_name(name),
            None => account,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        debug!(method = %method, path, "Graph request");

        let mut request = self.request(method.clone(), path).await?;
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let result = read_response(response).await;
        if let Err(ref e) = result {
            warn!(method = %method, path, error = %e, "Graph request failed");
        }
        result
    }
}

/// Turns a response into JSON, or into [`TransportError::Http`] on non-2xx
///
/// `204 No Content` and empty bodies yield `Value::Null`.
async fn read_response(response: Response) -> Result<Value, TransportError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(parse_error(status, &text));
    }

    if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse(e.to_string()))
}

/// Builds an HTTP error from Graph's error envelope
///
/// Without an envelope the code falls back to the status reason phrase and
/// the message to the raw body.
fn parse_error(status: StatusCode, body: &str) -> TransportError {
    let reason = status
        .canonical_reason()
        .unwrap_or_else(|| status.as_str())
        .to_string();

    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, None),
    };

    TransportError::Http {
        status: status.as_u16(),
        code: code.filter(|c| !c.is_empty()).unwrap_or(reason.clone()),
        message: message
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or(reason),
    }
}

#[async_trait::async_trait]
impl IGraphTransport for GraphClient {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.send(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }
}
