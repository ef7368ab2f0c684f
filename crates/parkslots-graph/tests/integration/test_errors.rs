//! Error mapping of GraphClient responses

use parkslots_core::ports::{IGraphTransport, TransportError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_error_envelope_is_parsed() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "itemNotFound",
                "message": "Item not found",
                "innerError": { "request-id": "abc" }
            }
        })))
        .mount(&server)
        .await;

    let err = client.get("/sites/missing").await.unwrap_err();
    assert!(err.is_item_not_found());
    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.to_string(),
        "Graph API error 404 (itemNotFound): Item not found"
    );
}

#[tokio::test]
async fn test_non_json_error_falls_back_to_status() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/sites/s/lists/l/items/1/fields"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let err = client
        .patch("/sites/s/lists/l/items/1/fields", &json!({ "Title": "x" }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::Http {
            status: 503,
            code: "Service Unavailable".to_string(),
            message: "try later".to_string(),
        }
    );
}

#[tokio::test]
async fn test_empty_bodies_are_null() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("POST"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let value = client.post("/empty", &json!({})).await.unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_invalid_json_body() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client.get("/garbled").await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = parkslots_graph::GraphClient::with_token("t").with_base_url("http://127.0.0.1:9");

    let err = client.get("/me").await.unwrap_err();
    assert!(matches!(err, TransportError::Network(_)));
}

#[tokio::test]
async fn test_get_me_builds_account() {
    let (_server, client) = common::setup_graph_mock().await;

    let account = client.get_me().await.expect("get_me failed");
    assert_eq!(account.home_account_id, "user-test-001");
    assert_eq!(account.username, "test.user@contoso.com");
    assert_eq!(account.display_name(), "Test User");
}
