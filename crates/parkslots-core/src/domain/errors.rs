//! Domain error types
//!
//! This module defines error types for domain validation, such as
//! malformed list locations or empty item identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// SharePoint hostname is empty or contains a path
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// Site path is empty or malformed
    #[error("Invalid site path: {0}")]
    InvalidSitePath(String),

    /// List display name is empty
    #[error("Invalid list name: {0}")]
    InvalidListName(String),

    /// List item identifier is empty
    #[error("Invalid item ID: {0}")]
    InvalidItemId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
