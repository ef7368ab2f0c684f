//! Shared test helpers for Graph API integration tests
//!
//! Provides wiremock-based mock server setup for Microsoft Graph API endpoints.
//! Each helper mounts the necessary mock endpoints and returns a configured
//! client pointing at the mock server.

use std::sync::Arc;

use parkslots_cache::MemoryKeyValueStore;
use parkslots_core::{domain::ListLocation, usecases::ParkingSlotsService};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parkslots_graph::client::GraphClient;

pub const HOSTNAME: &str = "contoso.sharepoint.com";
pub const SITE_PATH: &str = "/sites/Operations";
pub const LIST_NAME: &str = "ParkingSlots";

pub const SITE_ID: &str = "contoso.sharepoint.com,site-guid,web-guid";
pub const LIST_ID: &str = "list-guid";

/// `SITE_ID` as it appears in request paths
pub const SITE_SEGMENT: &str = "contoso.sharepoint.com%2Csite-guid%2Cweb-guid";

/// Sets up a mock server and returns a (MockServer, GraphClient) tuple.
///
/// Pre-configured endpoints:
/// - GET /me → user profile
pub async fn setup_graph_mock() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "displayName": "Test User",
            "mail": "test@example.com",
            "userPrincipalName": "test.user@contoso.com",
            "id": "user-test-001"
        })))
        .mount(&server)
        .await;

    let client = GraphClient::with_token("test-access-token").with_base_url(server.uri());

    (server, client)
}

/// Mounts the site and list lookups for the default location
pub async fn mount_resolution(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/sites/{HOSTNAME}:{SITE_PATH}:")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": SITE_ID,
            "displayName": "Operations"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sites/{SITE_SEGMENT}/lists")))
        .and(query_param("$filter", format!("displayName eq '{LIST_NAME}'")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{ "id": LIST_ID, "displayName": LIST_NAME }]
        })))
        .mount(server)
        .await;
}

/// Path of the list's items collection
pub fn items_path() -> String {
    format!("/sites/{SITE_SEGMENT}/lists/{LIST_ID}/items")
}

/// A service over `client` with an in-memory ID cache
pub fn service(client: GraphClient) -> (ParkingSlotsService, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let location = ListLocation::new(HOSTNAME, SITE_PATH, LIST_NAME).expect("valid location");
    (
        ParkingSlotsService::new(Arc::new(client), store.clone(), location),
        store,
    )
}

/// A Graph list item as returned with `$expand=fields`
pub fn item(id: &str, title: &str, activa: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "webUrl": format!("https://{HOSTNAME}{SITE_PATH}/Lists/{LIST_NAME}/{id}_.000"),
        "fields": {
            "Title": title,
            "TipoCelda": "Carro",
            "Activa": activa
        }
    })
}
