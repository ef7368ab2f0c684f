//! Wiring of configuration, local storage, identity, and Graph access
//!
//! Commands receive an [`AppContext`] and build only the pieces they need,
//! so `config show` never touches the keyring and `cache show` never opens
//! a browser.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use parkslots_cache::FileKeyValueStore;
use parkslots_core::{
    config::Config,
    usecases::{AuthSession, IdentityAdapter, ParkingSlotsService},
};
use parkslots_graph::{GraphClient, KeyringTokenStorage, OAuth2Config, OAuthIdentityProvider};
use tracing::debug;

pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    /// True if `--config` named the file explicitly
    pub explicit_config: bool,
}

impl AppContext {
    /// Loads the configuration
    ///
    /// An explicit `--config` file must exist and parse; the default
    /// location falls back to built-in defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                let config = Config::load(&path)?;
                Ok(Self {
                    config,
                    config_path: path,
                    explicit_config: true,
                })
            }
            None => {
                let path = Config::default_path();
                Ok(Self {
                    config: Config::load_or_default(&path),
                    config_path: path,
                    explicit_config: false,
                })
            }
        }
    }

    /// Opens the key-value store, starting over if the file is unreadable
    pub fn open_store(&self) -> Result<Arc<FileKeyValueStore>> {
        let path = &self.config.storage.path;
        debug!(path = %path.display(), "Opening local storage");
        let store = FileKeyValueStore::open_or_reset(path)
            .with_context(|| format!("Failed to open local storage at {}", path.display()))?;
        Ok(Arc::new(store))
    }

    /// Identity adapter over the OAuth provider, tokens in the system keyring
    pub fn identity(&self, store: Arc<FileKeyValueStore>) -> Arc<IdentityAdapter> {
        let auth = &self.config.auth;
        let oauth = OAuth2Config::new(&auth.client_id, &auth.tenant, &auth.redirect_uri);
        let provider = OAuthIdentityProvider::new(oauth, store, Arc::new(KeyringTokenStorage))
            .with_graph_base_url(&self.config.graph.base_url);

        Arc::new(IdentityAdapter::new(Arc::new(provider)).with_scopes(auth.scopes.clone()))
    }

    pub fn session(&self, store: Arc<FileKeyValueStore>) -> AuthSession {
        AuthSession::new(self.identity(store))
    }

    /// List client whose Graph requests authenticate through `identity`
    pub fn slots_service(
        &self,
        store: Arc<FileKeyValueStore>,
        identity: Arc<IdentityAdapter>,
    ) -> Result<ParkingSlotsService> {
        let location = self
            .config
            .location()
            .context("Invalid site configuration")?;
        let client = GraphClient::new(identity).with_base_url(&self.config.graph.base_url);
        Ok(ParkingSlotsService::new(Arc::new(client), store, location))
    }
}
