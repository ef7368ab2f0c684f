//! Account domain entity
//!
//! An [`Account`] is the identity-provider record for a signed-in user.
//! Token acquisition always targets one account, the active one.

use serde::{Deserialize, Serialize};

/// A signed-in identity-provider account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier assigned by the identity provider
    pub home_account_id: String,
    /// Sign-in name, typically the user principal name
    pub username: String,
    /// Display name, if the provider returned one
    #[serde(default)]
    pub name: Option<String>,
}

impl Account {
    pub fn new(home_account_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            username: username.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name to show the user: display name, falling back to username
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}
