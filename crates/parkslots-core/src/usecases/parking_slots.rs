//! Parking slots use case
//!
//! CRUD and query operations against one SharePoint list through the Graph
//! transport port. The service hides two chores from callers:
//!
//! 1. **Identifier resolution** - the list's site and list IDs are resolved
//!    lazily from its [`ListLocation`], consulting the key-value cache first
//!    and writing back whatever the network resolved.
//! 2. **OData construction** - friendly column names in `$filter` and
//!    `$orderby` are rewritten to Graph paths and literals are escaped.
//!
//! ## Design Notes
//!
//! - Resolved IDs live in the service behind an async mutex that is held
//!   across the lookups, so concurrent first calls resolve only once.
//! - The cache entry never expires. [`ParkingSlotsService::invalidate_ids`]
//!   is the only way to drop it.
//! - Transport errors are returned unmodified, apart from one diagnostic
//!   retry in [`ParkingSlotsService::get_all`].

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        DomainError, ListLocation, NewParkingSlot, ParkingSlot, ParkingSlotPatch, ResolvedIds,
    },
    odata::{encode_path_segment, BinaryOp, Expr, Filter, ODataError, ODataQuery, OrderBy},
    ports::{IGraphTransport, IKeyValueStore, TransportError},
};

/// Default page size for [`ParkingSlotsService::find_by_codigo`]
pub const DEFAULT_FIND_TOP: u32 = 1;

/// Default page size for [`ParkingSlotsService::get_disponibles`]
pub const DEFAULT_DISPONIBLES_TOP: u32 = 100;

/// Errors returned by [`ParkingSlotsService`]
#[derive(Debug, Error)]
pub enum ListError {
    /// The site lookup returned no identifier
    #[error("Could not resolve site ID for {hostname}{site_path}")]
    SiteNotResolvable { hostname: String, site_path: String },

    /// No list with the configured display name exists on the site
    #[error("List not found: {0}")]
    ListNotFound(String),

    /// A `$filter` or `$orderby` clause could not be parsed
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] ODataError),

    /// Invalid input, such as an empty item ID
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Failure reported by the Graph transport, unmodified
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ListError {
    /// Graph error code of an underlying transport failure
    pub fn code(&self) -> Option<&str> {
        match self {
            ListError::Transport(err) => err.code(),
            _ => None,
        }
    }
}

/// Options for [`ParkingSlotsService::get_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetAllOptions {
    /// OData boolean expression using friendly column names
    pub filter: Option<String>,
    /// Column name plus optional `asc`/`desc`, comma separated
    pub orderby: Option<String>,
    /// Page size
    pub top: Option<u32>,
}

impl GetAllOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn orderby(mut self, orderby: impl Into<String>) -> Self {
        self.orderby = Some(orderby.into());
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }
}

/// Client for the parking slots SharePoint list
pub struct ParkingSlotsService {
    transport: Arc<dyn IGraphTransport>,
    store: Arc<dyn IKeyValueStore>,
    location: ListLocation,
    ids: Mutex<ResolvedIds>,
}

impl ParkingSlotsService {
    /// Creates a service for the list at `location`
    ///
    /// # Arguments
    ///
    /// * `transport` - Graph transport used for every request
    /// * `store` - Cache for resolved site/list IDs
    /// * `location` - Hostname, site path and list display name
    pub fn new(
        transport: Arc<dyn IGraphTransport>,
        store: Arc<dyn IKeyValueStore>,
        location: ListLocation,
    ) -> Self {
        Self {
            transport,
            store,
            location,
            ids: Mutex::new(ResolvedIds::default()),
        }
    }

    /// Creates a service with IDs already known, skipping resolution
    pub fn with_ids(self, site_id: impl Into<String>, list_id: impl Into<String>) -> Self {
        Self {
            ids: Mutex::new(ResolvedIds {
                site_id: Some(site_id.into()),
                list_id: Some(list_id.into()),
            }),
            ..self
        }
    }

    pub fn location(&self) -> &ListLocation {
        &self.location
    }

    /// Snapshot of the identifiers resolved so far
    pub async fn resolved_ids(&self) -> ResolvedIds {
        self.ids.lock().await.clone()
    }

    // ------------------------------------------------------------------
    // Identifier resolution
    // ------------------------------------------------------------------

    /// Resolves the site and list IDs, returning `(site_id, list_id)`.
    ///
    /// Order of resolution:
    /// 1. IDs already held in memory
    /// 2. The key-value cache entry for this location
    /// 3. `GET /sites/{hostname}:{site_path}:` for the site ID
    /// 4. `GET /sites/{site}/lists?$filter=displayName eq '...'` for the list ID
    ///
    /// # Errors
    ///
    /// - [`ListError::SiteNotResolvable`] if the site response carries no `id`
    /// - [`ListError::ListNotFound`] if no list matches the display name
    /// - [`ListError::Transport`] for any request failure
    pub async fn ensure_ids(&self) -> Result<(String, String), ListError> {
        let mut ids = self.ids.lock().await;
        if let Some((site, list)) = ids.both() {
            return Ok((site.to_string(), list.to_string()));
        }

        self.load_cache(&mut ids);

        if ids.site_id.is_none() {
            let path = format!(
                "/sites/{}:{}:",
                self.location.hostname(),
                self.location.site_path()
            );
            debug!(path = %path, "Resolving site ID");

            let site = self.transport.get(&path).await?;
            let site_id = site
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ListError::SiteNotResolvable {
                    hostname: self.location.hostname().to_string(),
                    site_path: self.location.site_path().to_string(),
                })?;

            info!(site_id, "Resolved site ID");
            ids.site_id = Some(site_id.to_string());
            self.save_cache(&ids);
        }

        if ids.list_id.is_none() {
            let site_id = ids.site_id.clone().unwrap_or_default();
            let filter = Filter::from_expr(Expr::compare(
                BinaryOp::Eq,
                Expr::path("displayName"),
                Expr::string(self.location.list_name()),
            ));
            let mut query = ODataQuery::new();
            query.set("$filter", filter.to_string());
            let path = format!(
                "/sites/{}/lists?{}",
                encode_path_segment(&site_id),
                query.to_query_string()
            );
            debug!(path = %path, "Resolving list ID");

            let lists = self.transport.get(&path).await?;
            let list_id = lists
                .get("value")
                .and_then(|v| v.get(0))
                .and_then(|list| list.get("id"))
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ListError::ListNotFound(self.location.list_name().to_string()))?;

            info!(list_id, list_name = self.location.list_name(), "Resolved list ID");
            ids.list_id = Some(list_id.to_string());
            self.save_cache(&ids);
        }

        let site = ids.site_id.clone().unwrap_or_default();
        let list = ids.list_id.clone().unwrap_or_default();
        Ok((site, list))
    }

    /// Forgets the resolved IDs, in memory and in the cache
    ///
    /// The next operation resolves them again over the network.
    pub async fn invalidate_ids(&self) {
        let mut ids = self.ids.lock().await;
        *ids = ResolvedIds::default();
        if let Err(e) = self.store.remove_item(&self.location.cache_key()) {
            warn!(error = %e, "Failed to remove cached list IDs");
        }
        info!(location = %self.location, "Invalidated cached list IDs");
    }

    fn load_cache(&self, ids: &mut ResolvedIds) {
        let key = self.location.cache_key();
        match self.store.get_item(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<ResolvedIds>(&raw) {
                Ok(cached) => {
                    debug!(key = %key, "Loaded list IDs from cache");
                    ids.merge_missing(cached);
                }
                Err(e) => debug!(key = %key, error = %e, "Ignoring unreadable cache entry"),
            },
            Ok(None) => {}
            Err(e) => debug!(key = %key, error = %e, "Cache read failed"),
        }
    }

    fn save_cache(&self, ids: &ResolvedIds) {
        let key = self.location.cache_key();
        let result = serde_json::to_string(ids)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.store.set_item(&key, &raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to cache list IDs");
        }
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Creates a list item and returns it with its server-assigned ID
    pub async fn create(&self, record: &NewParkingSlot) -> Result<ParkingSlot, ListError> {
        let (site, list) = self.ensure_ids().await?;
        let body = json!({ "fields": record });

        debug!("Creating parking slot");
        let created = self
            .transport
            .post(&items_path(&site, &list), &body)
            .await?;

        let slot = ParkingSlot::from_graph_item(&created);
        info!(id = %slot.id, "Created parking slot");
        Ok(slot)
    }

    /// Fetches one item by ID
    ///
    /// A missing item surfaces as the transport's `itemNotFound` error.
    pub async fn get(&self, id: &str) -> Result<ParkingSlot, ListError> {
        let id = validate_item_id(id)?;
        let (site, list) = self.ensure_ids().await?;
        self.fetch_item(&site, &list, id).await
    }

    /// Patches the given fields, then returns the item as the server now
    /// stores it.
    ///
    /// The second request means computed columns and other server-side
    /// effects are visible in the result.
    pub async fn update(
        &self,
        id: &str,
        changes: &ParkingSlotPatch,
    ) -> Result<ParkingSlot, ListError> {
        let id = validate_item_id(id)?;
        let (site, list) = self.ensure_ids().await?;

        let body = serde_json::to_value(changes)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let path = format!("{}/{}/fields", items_path(&site, &list), encode_path_segment(id));

        debug!(id, "Updating parking slot");
        self.transport.patch(&path, &body).await?;

        self.fetch_item(&site, &list, id).await
    }

    /// Deletes one item
    pub async fn delete(&self, id: &str) -> Result<(), ListError> {
        let id = validate_item_id(id)?;
        let (site, list) = self.ensure_ids().await?;

        let path = format!("{}/{}", items_path(&site, &list), encode_path_segment(id));
        self.transport.delete(&path).await?;

        info!(id, "Deleted parking slot");
        Ok(())
    }

    async fn fetch_item(&self, site: &str, list: &str, id: &str) -> Result<ParkingSlot, ListError> {
        let path = format!(
            "{}/{}?$expand=fields",
            items_path(site, list),
            encode_path_segment(id)
        );
        let item = self.transport.get(&path).await?;
        Ok(ParkingSlot::from_graph_item(&item))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Lists items matching `opts`.
    ///
    /// The query always expands `fields` and selects `id,webUrl`. Friendly
    /// names in `filter` and `orderby` are rewritten (`ID` to `id`, bare
    /// `Title` to `fields/Title`).
    ///
    /// If Graph answers `itemNotFound` while a filter is present, the
    /// request is retried once without the filter, which tells a broken
    /// filter apart from a missing list.
    ///
    /// # Returns
    ///
    /// The mapped items; an empty vector when nothing matches.
    pub async fn get_all(&self, opts: &GetAllOptions) -> Result<Vec<ParkingSlot>, ListError> {
        let (site, list) = self.ensure_ids().await?;

        let mut query = ODataQuery::new();
        query.set("$expand", "fields");
        query.set("$select", "id,webUrl");
        // blank clauses are treated as absent
        if let Some(orderby) = opts.orderby.as_deref().filter(|o| !o.trim().is_empty()) {
            let orderby = OrderBy::parse(orderby)?.normalize_field_tokens();
            query.set("$orderby", orderby.to_string());
        }
        if let Some(top) = opts.top {
            query.set("$top", top.to_string());
        }
        if let Some(filter) = opts.filter.as_deref().filter(|f| !f.trim().is_empty()) {
            let filter = Filter::parse(filter)?.normalize_field_tokens();
            query.set("$filter", filter.to_string());
        }

        let base = items_path(&site, &list);
        let path = format!("{}?{}", base, query.to_query_string());
        debug!(path = %path, "Listing parking slots");

        match self.transport.get(&path).await {
            Ok(response) => Ok(map_items(&response)),
            Err(err) if err.is_item_not_found() && query.contains("$filter") => {
                warn!(
                    filter = query.get("$filter").unwrap_or_default(),
                    "Filtered query returned itemNotFound, retrying without filter"
                );
                query.remove("$filter");
                let retry_path = format!("{}?{}", base, query.to_query_string());
                let response = self.transport.get(&retry_path).await?;
                Ok(map_items(&response))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Finds items whose `Codigo` column equals `codigo` exactly
    pub async fn find_by_codigo(
        &self,
        codigo: &str,
        top: u32,
    ) -> Result<Vec<ParkingSlot>, ListError> {
        let (site, list) = self.ensure_ids().await?;

        let filter = Filter::from_expr(Expr::compare(
            BinaryOp::Eq,
            Expr::path("fields/Codigo"),
            Expr::string(codigo),
        ));
        let mut query = ODataQuery::new();
        query.set("$expand", "fields");
        query.set("$filter", filter.to_string());
        query.set("$top", top.to_string());

        let path = format!("{}?{}", items_path(&site, &list), query.to_query_string());
        debug!(codigo, "Finding parking slot by code");

        let response = self.transport.get(&path).await?;
        Ok(map_items(&response))
    }

    /// Lists available slots ordered by code
    pub async fn get_disponibles(&self, top: u32) -> Result<Vec<ParkingSlot>, ListError> {
        self.get_all(&disponibles_options(top)).await
    }
}

/// The query [`ParkingSlotsService::get_disponibles`] runs
pub fn disponibles_options(top: u32) -> GetAllOptions {
    GetAllOptions::new()
        .filter("fields/Disponible eq true")
        .orderby("fields/Codigo asc")
        .top(top)
}

fn items_path(site: &str, list: &str) -> String {
    format!(
        "/sites/{}/lists/{}/items",
        encode_path_segment(site),
        encode_path_segment(list)
    )
}

fn validate_item_id(id: &str) -> Result<&str, DomainError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(DomainError::InvalidItemId(id.to_string()));
    }
    Ok(id)
}

fn map_items(response: &Value) -> Vec<ParkingSlot> {
    response
        .get("value")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(ParkingSlot::from_graph_item).collect())
        .unwrap_or_default()
}
