//! Application session state
//!
//! Tracks whether startup authentication has finished and which account is
//! signed in. Startup login is best effort: the session becomes ready even
//! when it fails, so the user can still sign in explicitly.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use super::authenticate::IdentityAdapter;
use crate::{domain::Account, ports::AuthError};

#[derive(Debug, Default)]
struct SessionState {
    ready: bool,
    account: Option<Account>,
}

/// Signed-in state shared by the application
pub struct AuthSession {
    adapter: Arc<IdentityAdapter>,
    state: RwLock<SessionState>,
}

impl AuthSession {
    pub fn new(adapter: Arc<IdentityAdapter>) -> Self {
        Self {
            adapter,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Attempts automatic login, then marks the session ready
    ///
    /// Login failures are logged and swallowed.
    pub async fn start(&self) {
        let account = match self.adapter.ensure_login().await {
            Ok(account) => Some(account),
            Err(e) => {
                error!(error = %e, "Automatic login failed");
                None
            }
        };

        let mut state = self.state.write().await;
        if account.is_some() {
            state.account = account;
        }
        state.ready = true;
    }

    /// True once [`AuthSession::start`] has finished
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    pub async fn account(&self) -> Option<Account> {
        self.state.read().await.account.clone()
    }

    /// Explicit sign-in; errors propagate
    pub async fn sign_in(&self) -> Result<Account, AuthError> {
        let account = self.adapter.ensure_login().await?;
        self.state.write().await.account = Some(account.clone());
        Ok(account)
    }

    /// Explicit sign-out; the account is cleared only if logout succeeds
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.adapter.logout().await?;
        self.state.write().await.account = None;
        info!("Session cleared");
        Ok(())
    }

    pub async fn get_token(&self) -> Result<String, AuthError> {
        self.adapter.get_access_token().await
    }
}
