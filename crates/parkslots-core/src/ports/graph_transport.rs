//! Graph transport port (driven/secondary port)
//!
//! The List Resource Client speaks to Microsoft Graph only through this
//! trait: four JSON verbs against paths relative to the Graph base URL.
//! The adapter attaches credentials and maps HTTP failures into
//! [`TransportError`], which always exposes the provider's error code.

use serde_json::Value;
use thiserror::Error;

use super::identity_provider::AuthError;

/// Graph error code for a missing resource
pub const ITEM_NOT_FOUND: &str = "itemNotFound";

/// Failure reported by the Graph transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Non-success HTTP response with Graph's error envelope
    #[error("Graph API error {status} ({code}): {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// No access token could be obtained for the request
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The response body was not the JSON the caller expected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Graph error code (`itemNotFound`, `accessDenied`, ...), if any
    pub fn code(&self) -> Option<&str> {
        match self {
            TransportError::Http { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// HTTP status, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_item_not_found(&self) -> bool {
        self.code() == Some(ITEM_NOT_FOUND)
    }
}

/// Port trait for JSON requests against Microsoft Graph
///
/// Paths are relative to the Graph base URL and may carry a query string,
/// e.g. `/sites/{id}/lists?$filter=...`.
#[async_trait::async_trait]
pub trait IGraphTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, TransportError>;

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError>;

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, TransportError>;

    async fn delete(&self, path: &str) -> Result<(), TransportError>;
}
