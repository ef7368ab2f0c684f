//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IGraphTransport`] - JSON requests against Microsoft Graph
//! - [`IKeyValueStore`] - Persistent best-effort string storage
//! - [`IIdentityProvider`] - Account cache, silent and interactive auth flows
//! - [`IAccessTokenSource`] - Bearer tokens for the transport

pub mod graph_transport;
pub mod identity_provider;
pub mod key_value_store;

pub use graph_transport::{IGraphTransport, TransportError, ITEM_NOT_FOUND};
pub use identity_provider::{
    AuthError, AuthenticationResult, IAccessTokenSource, IIdentityProvider, LoginRequest, Prompt,
    StaticToken, TokenRequest,
};
pub use key_value_store::{IKeyValueStore, StoreError};
