//! Configuration module for ParkSlots.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{
    location::{DEFAULT_HOSTNAME, DEFAULT_LIST_NAME, DEFAULT_SITE_PATH},
    DomainError, ListLocation,
};

/// Default Microsoft Graph endpoint.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Application (client) ID registered for ParkSlots.
pub const DEFAULT_CLIENT_ID: &str = "60d9a880-0f6c-4e14-b17a-1cc06ea9ba8a";

/// Directory (tenant) ID that owns the parking slots site.
pub const DEFAULT_TENANT: &str = "cd48ecd9-7e15-4f4b-97d9-ec813ee42b2c";

/// Loopback redirect URI served by the CLI during interactive login.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8400/callback";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ParkSlots.
///
/// Every section is optional in the file; missing sections take their
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub site: SiteConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Microsoft Graph endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
}

/// Location of the parking slots list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// SharePoint host, e.g. `contoso.sharepoint.com`.
    pub hostname: String,
    /// Server-relative site path, e.g. `/sites/Operations`.
    pub site_path: String,
    /// Display name of the list.
    pub list_name: String,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Azure AD Application (client) ID.
    pub client_id: String,
    /// Directory (tenant) ID or one of `common`, `organizations`.
    pub tenant: String,
    /// Loopback URI the authorization code is delivered to.
    pub redirect_uri: String,
    /// Delegated scopes requested for Graph.
    pub scopes: Vec<String>,
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding cached list IDs and the account cache.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/parkslots/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("parkslots")
            .join("config.yaml")
    }

    /// The list location described by the `site` section.
    pub fn location(&self) -> Result<ListLocation, DomainError> {
        ListLocation::new(
            &self.site.hostname,
            &self.site.site_path,
            &self.site.list_name,
        )
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            site_path: DEFAULT_SITE_PATH.to_string(),
            list_name: DEFAULT_LIST_NAME.to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: crate::usecases::DEFAULT_SCOPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("parkslots");
        Self {
            path: data_dir.join("storage.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"auth.redirect_uri"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- graph ---
        match url::Url::parse(&self.graph.base_url) {
            Ok(url) if url.scheme() == "https" || url.scheme() == "http" => {}
            Ok(url) => errors.push(ValidationError::new(
                "graph.base_url",
                format!("unsupported scheme: {}", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "graph.base_url",
                format!("invalid URL: {e}"),
            )),
        }

        // --- site ---
        if let Err(e) = self.location() {
            let field = match e {
                DomainError::InvalidHostname(_) => "site.hostname",
                DomainError::InvalidSitePath(_) => "site.site_path",
                _ => "site.list_name",
            };
            errors.push(ValidationError::new(field, e.to_string()));
        }

        // --- auth ---
        if self.auth.client_id.trim().is_empty() {
            errors.push(ValidationError::new("auth.client_id", "must not be empty"));
        }
        if self.auth.tenant.trim().is_empty() {
            errors.push(ValidationError::new("auth.tenant", "must not be empty"));
        }
        match url::Url::parse(&self.auth.redirect_uri) {
            Ok(url) if url.scheme() != "http" => errors.push(ValidationError::new(
                "auth.redirect_uri",
                "must be an http loopback URI",
            )),
            Ok(url) if url.port().is_none() => errors.push(ValidationError::new(
                "auth.redirect_uri",
                "must include an explicit port",
            )),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::new(
                "auth.redirect_uri",
                format!("invalid URL: {e}"),
            )),
        }
        if self.auth.scopes.iter().any(|s| s.trim().is_empty()) {
            errors.push(ValidationError::new(
                "auth.scopes",
                "must not contain empty scopes",
            ));
        }

        // --- storage ---
        if self.storage.path.as_os_str().is_empty() {
            errors.push(ValidationError::new("storage.path", "must not be empty"));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid log level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError::new(
                "logging.format",
                format!(
                    "invalid log format '{}', expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use parkslots_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .site_hostname("contoso.sharepoint.com")
///     .site_path("/sites/Operations")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- graph ---

    pub fn graph_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.graph.base_url = url.into();
        self
    }

    // --- site ---

    pub fn site_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.site.hostname = hostname.into();
        self
    }

    pub fn site_path(mut self, site_path: impl Into<String>) -> Self {
        self.config.site.site_path = site_path.into();
        self
    }

    pub fn site_list_name(mut self, list_name: impl Into<String>) -> Self {
        self.config.site.list_name = list_name.into();
        self
    }

    // --- auth ---

    pub fn auth_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = client_id.into();
        self
    }

    pub fn auth_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.config.auth.tenant = tenant.into();
        self
    }

    pub fn auth_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.auth.redirect_uri = uri.into();
        self
    }

    pub fn auth_scopes(mut self, scopes: Vec<String>) -> Self {
        self.config.auth.scopes = scopes;
        self
    }

    // --- storage ---

    pub fn storage_path(mut self, path: PathBuf) -> Self {
        self.config.storage.path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
