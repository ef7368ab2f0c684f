//! Parking slots service running over GraphClient against a mock Graph

use parkslots_core::{
    domain::{NewParkingSlot, ParkingSlotPatch},
    ports::IKeyValueStore,
    usecases::{GetAllOptions, ListError, DEFAULT_FIND_TOP},
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, items_path, item};

#[tokio::test]
async fn test_resolution_is_cached_in_store() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_resolution(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/1", items_path())))
        .and(query_param("$expand", "fields"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item("1", "P-001", true)))
        .mount(&server)
        .await;

    let (service, store) = common::service(client);
    let slot = service.get("1").await.expect("get failed");

    assert_eq!(slot.id, "1");
    assert_eq!(slot.title.as_deref(), Some("P-001"));
    assert_eq!(slot.activa, Some(true));

    let cached = store
        .get_item("sp:contoso.sharepoint.com/sites/Operations:ParkingSlots")
        .unwrap()
        .expect("ids cached");
    let cached: serde_json::Value = serde_json::from_str(&cached).unwrap();
    assert_eq!(
        cached,
        json!({ "siteId": common::SITE_ID, "listId": common::LIST_ID })
    );
}

#[tokio::test]
async fn test_create_update_delete_cycle() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_resolution(&server).await;

    Mock::given(method("POST"))
        .and(path(items_path()))
        .and(body_json(json!({
            "fields": { "Title": "P-010", "TipoCelda": "Moto", "Activa": true }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "10",
            "fields": { "Title": "P-010", "TipoCelda": "Moto", "Activa": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/10/fields", items_path())))
        .and(body_json(json!({ "Activa": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Activa": false })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/10", items_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "10",
            "fields": { "Title": "P-010", "TipoCelda": "Moto", "Activa": "No" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/10", items_path())))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _) = common::service(client);

    let created = service
        .create(
            &NewParkingSlot::new("P-010")
                .with_tipo_celda("Moto")
                .with_activa(true),
        )
        .await
        .expect("create failed");
    assert_eq!(created.id, "10");

    let patch = ParkingSlotPatch {
        activa: Some(false),
        ..Default::default()
    };
    let updated = service.update("10", &patch).await.expect("update failed");
    assert_eq!(updated.activa, Some(false));
    assert_eq!(updated.title.as_deref(), Some("P-010"));
    assert_eq!(updated.tipo_celda.as_deref(), Some("Moto"));

    service.delete("10").await.expect("delete failed");
}

#[tokio::test]
async fn test_get_all_sends_normalized_query() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_resolution(&server).await;

    Mock::given(method("GET"))
        .and(path(items_path()))
        .and(query_param("$expand", "fields"))
        .and(query_param("$select", "id,webUrl"))
        .and(query_param("$filter", "fields/Title eq 'O''Brien' and id eq '3'"))
        .and(query_param("$orderby", "fields/Title desc"))
        .and(query_param("$top", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item("3", "O'Brien", true)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _) = common::service(client);
    let slots = service
        .get_all(
            &GetAllOptions::new()
                .filter("Title eq 'O''Brien' and ID eq '3'")
                .orderby("Title desc")
                .top(20),
        )
        .await
        .expect("get_all failed");

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].title.as_deref(), Some("O'Brien"));
}

#[tokio::test]
async fn test_get_all_retries_without_filter() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_resolution(&server).await;

    Mock::given(method("GET"))
        .and(path(items_path()))
        .and(query_param("$filter", "fields/Zona eq 'Norte'"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "itemNotFound", "message": "The provided filter is invalid." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(items_path()))
        .and(query_param_is_missing("$filter"))
        .and(query_param("$top", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item("1", "P-001", true), item("2", "P-002", false)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _) = common::service(client);
    let slots = service
        .get_all(&GetAllOptions::new().filter("fields/Zona eq 'Norte'").top(5))
        .await
        .expect("retry should succeed");

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1].activa, Some(false));
}

#[tokio::test]
async fn test_find_by_codigo_and_disponibles() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_resolution(&server).await;

    Mock::given(method("GET"))
        .and(path(items_path()))
        .and(query_param("$filter", "fields/Codigo eq 'A-7'"))
        .and(query_param("$top", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item("7", "P-007", true)]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(items_path()))
        .and(query_param("$filter", "fields/Disponible eq true"))
        .and(query_param("$orderby", "fields/Codigo asc"))
        .and(query_param("$top", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let (service, _) = common::service(client);

    let found = service
        .find_by_codigo("A-7", DEFAULT_FIND_TOP)
        .await
        .expect("find failed");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "7");

    let available = service.get_disponibles(100).await.expect("disponibles failed");
    assert!(available.is_empty());
}

#[tokio::test]
async fn test_unresolvable_site_makes_no_list_requests() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/sites/{}:{}:", common::HOSTNAME, common::SITE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _) = common::service(client);
    let err = service.get_all(&GetAllOptions::new()).await.unwrap_err();
    assert!(matches!(err, ListError::SiteNotResolvable { .. }));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().contains("/lists")));
}

#[tokio::test]
async fn test_missing_list() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/sites/{}:{}:", common::HOSTNAME, common::SITE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": common::SITE_ID })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sites/{}/lists", common::SITE_SEGMENT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let (service, _) = common::service(client);
    let err = service.get("1").await.unwrap_err();
    assert_eq!(err.to_string(), "List not found: ParkingSlots");
}
