//! ParkSlots Graph - Microsoft Graph and identity platform adapters
//!
//! Provides:
//! - A Graph transport that sends JSON requests with a per-request bearer token
//! - OAuth2 authentication (Authorization Code with PKCE) against
//!   Microsoft identity platform
//! - An identity provider with an account cache, silent token refresh, and
//!   browser-based interactive flows
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE authentication flow components
//! - [`client`] - Microsoft Graph API HTTP client
//! - [`provider`] - `IIdentityProvider` implementation

pub mod auth;
pub mod client;
pub mod provider;

pub use auth::{KeyringTokenStorage, MemoryTokenStorage, OAuth2Config, StoredTokens, TokenStorage};
pub use client::GraphClient;
pub use provider::OAuthIdentityProvider;
