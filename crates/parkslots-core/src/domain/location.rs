//! SharePoint list location and resolved identifiers
//!
//! A [`ListLocation`] is the human-readable triple (hostname, site path,
//! list display name) that the Graph API resolves into opaque site and list
//! identifiers, held in [`ResolvedIds`].

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Default SharePoint tenant hostname
pub const DEFAULT_HOSTNAME: &str = "estudiodemoda.sharepoint.com";

/// Default server-relative site path
pub const DEFAULT_SITE_PATH: &str = "/sites/TransformacionDigital/IN/SA";

/// Default list display name
pub const DEFAULT_LIST_NAME: &str = "ParkingSlots";

/// Human-readable address of a SharePoint list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListLocation {
    hostname: String,
    site_path: String,
    list_name: String,
}

impl ListLocation {
    /// Creates a validated location.
    ///
    /// The site path is normalized to start with `/`.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if any component is empty, or if the
    /// hostname contains a scheme or path separator.
    pub fn new(
        hostname: impl Into<String>,
        site_path: impl Into<String>,
        list_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let hostname = hostname.into().trim().to_string();
        if hostname.is_empty() || hostname.contains('/') || hostname.contains(':') {
            return Err(DomainError::InvalidHostname(hostname));
        }

        let site_path = site_path.into().trim().to_string();
        if site_path.is_empty() || site_path == "/" || site_path.contains(':') {
            return Err(DomainError::InvalidSitePath(site_path));
        }
        let site_path = if site_path.starts_with('/') {
            site_path
        } else {
            format!("/{site_path}")
        };

        let list_name = list_name.into();
        if list_name.trim().is_empty() {
            return Err(DomainError::InvalidListName(list_name));
        }

        Ok(Self {
            hostname,
            site_path,
            list_name,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn site_path(&self) -> &str {
        &self.site_path
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    /// Key under which the resolved identifiers are cached
    pub fn cache_key(&self) -> String {
        format!("sp:{}{}:{}", self.hostname, self.site_path, self.list_name)
    }
}

impl Default for ListLocation {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            site_path: DEFAULT_SITE_PATH.to_string(),
            list_name: DEFAULT_LIST_NAME.to_string(),
        }
    }
}

impl Display for ListLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} [{}]", self.hostname, self.site_path, self.list_name)
    }
}

/// Opaque identifiers resolved from a [`ListLocation`]
///
/// Serialized with the same camelCase keys the cache has always used, so an
/// entry written by one process is readable by another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
}

impl ResolvedIds {
    /// Returns both identifiers when fully resolved
    pub fn both(&self) -> Option<(&str, &str)> {
        match (self.site_id.as_deref(), self.list_id.as_deref()) {
            (Some(site), Some(list)) => Some((site, list)),
            _ => None,
        }
    }

    /// Fills unset identifiers from `other`, never overwriting set ones
    pub fn merge_missing(&mut self, other: ResolvedIds) {
        if self.site_id.is_none() {
            self.site_id = other.site_id.filter(|s| !s.is_empty());
        }
        if self.list_id.is_none() {
            self.list_id = other.list_id.filter(|s| !s.is_empty());
        }
    }
}
