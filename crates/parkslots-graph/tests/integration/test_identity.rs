//! OAuthIdentityProvider against a mock identity platform and Graph

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use parkslots_cache::MemoryKeyValueStore;
use parkslots_core::{
    domain::Account,
    ports::{AuthError, IIdentityProvider, IKeyValueStore, TokenRequest},
    usecases::IdentityAdapter,
};
use parkslots_graph::{
    provider::{ACCOUNTS_KEY, ACTIVE_KEY},
    MemoryTokenStorage, OAuth2Config, OAuthIdentityProvider, StoredTokens, TokenStorage,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

const TENANT: &str = "tenant-test";
const CLIENT_ID: &str = "client-test";

fn token_path() -> String {
    format!("/{TENANT}/oauth2/v2.0/token")
}

fn test_user() -> Account {
    Account::new("user-test-001", "test.user@contoso.com").with_name("Test User")
}

/// A loopback redirect URI on a port that was free a moment ago
fn free_redirect_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let port = listener.local_addr().expect("probe addr").port();
    format!("http://127.0.0.1:{port}/callback")
}

fn provider(
    server: &MockServer,
    redirect_uri: &str,
) -> (
    OAuthIdentityProvider,
    Arc<MemoryKeyValueStore>,
    Arc<MemoryTokenStorage>,
) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let tokens = Arc::new(MemoryTokenStorage::new());
    let config =
        OAuth2Config::new(CLIENT_ID, TENANT, redirect_uri).with_authority_host(server.uri());
    let provider = OAuthIdentityProvider::new(config, store.clone(), tokens.clone())
        .with_graph_base_url(server.uri());
    (provider, store, tokens)
}

#[tokio::test]
async fn test_silent_refreshes_expired_token() {
    let (server, _client) = common::setup_graph_mock().await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "refreshed-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (provider, _store, tokens) = provider(&server, "http://127.0.0.1:8400/callback");
    let user = test_user();
    tokens
        .store(
            &user.username,
            &StoredTokens {
                access_token: "stale".to_string(),
                refresh_token: Some("rt-1".to_string()),
                expires_at: Utc::now() - Duration::minutes(1),
            },
        )
        .unwrap();

    let result = provider
        .acquire_token_silent(&TokenRequest {
            scopes: vec!["User.Read".to_string()],
            account: user.clone(),
        })
        .await
        .expect("refresh should succeed");

    assert_eq!(result.access_token, "refreshed-token");
    let stored = tokens.load(&user.username).unwrap().unwrap();
    assert_eq!(stored.access_token, "refreshed-token");
    assert_eq!(stored.refresh_token.as_deref(), Some("rt-1"));
}

#[tokio::test]
async fn test_rejected_refresh_requires_interaction() {
    let (server, _client) = common::setup_graph_mock().await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70043: The refresh token has expired."
        })))
        .mount(&server)
        .await;

    let (provider, _store, tokens) = provider(&server, "http://127.0.0.1:8400/callback");
    let user = test_user();
    tokens
        .store(
            &user.username,
            &StoredTokens {
                access_token: "stale".to_string(),
                refresh_token: Some("rt-old".to_string()),
                expires_at: Utc::now() - Duration::hours(2),
            },
        )
        .unwrap();

    let err = provider
        .acquire_token_silent(&TokenRequest {
            scopes: vec!["User.Read".to_string()],
            account: user,
        })
        .await
        .unwrap_err();

    match err {
        AuthError::InteractionRequired(reason) => assert!(reason.contains("AADSTS70043")),
        other => panic!("expected InteractionRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn test_interactive_login_end_to_end() {
    let (server, _client) = common::setup_graph_mock().await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-123"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "interactive-token",
            "refresh_token": "rt-new",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let redirect_uri = free_redirect_uri();
    let (provider, store, tokens) = provider(&server, &redirect_uri);

    let opened = Arc::new(Mutex::new(Vec::new()));
    let log = opened.clone();
    let provider = provider.with_browser(Arc::new(move |auth_url: &str| {
        log.lock().unwrap().push(auth_url.to_string());

        let parsed = url::Url::parse(auth_url).expect("auth url");
        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default()
        };
        let callback = format!(
            "{}?code=auth-code-123&state={}",
            param("redirect_uri"),
            param("state")
        );
        tokio::spawn(async move {
            let _ = reqwest::get(callback).await;
        });
        Ok(())
    }));

    let adapter = IdentityAdapter::new(Arc::new(provider));
    let account = adapter.ensure_login().await.expect("login should succeed");

    assert_eq!(account, test_user());
    assert_eq!(
        store.get_item(ACTIVE_KEY).unwrap().as_deref(),
        Some("user-test-001")
    );
    assert!(store.get_item(ACCOUNTS_KEY).unwrap().is_some());

    let stored = tokens.load("test.user@contoso.com").unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("rt-new"));

    let auth_url = opened.lock().unwrap()[0].clone();
    assert!(auth_url.starts_with(&format!("{}/{TENANT}/oauth2/v2.0/authorize?", server.uri())));
    assert!(auth_url.contains("prompt=select_account"));
    assert!(auth_url.contains("code_challenge_method=S256"));
    assert!(auth_url.contains("offline_access"));

    // Cached token is served without another round trip
    let token = adapter.get_access_token().await.unwrap();
    assert_eq!(token, "interactive-token");
    assert_eq!(opened.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_logout_opens_logout_url_and_forgets_account() {
    let (server, _client) = common::setup_graph_mock().await;
    let (provider, store, tokens) = provider(&server, "http://127.0.0.1:8400/callback");

    let opened = Arc::new(Mutex::new(Vec::new()));
    let log = opened.clone();
    let provider = provider.with_browser(Arc::new(move |url: &str| {
        log.lock().unwrap().push(url.to_string());
        Ok(())
    }));

    let user = test_user();
    store
        .set_item(ACCOUNTS_KEY, &serde_json::to_string(&vec![user.clone()]).unwrap())
        .unwrap();
    provider.set_active_account(Some(&user));
    tokens
        .store(
            &user.username,
            &StoredTokens {
                access_token: "a".to_string(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            },
        )
        .unwrap();

    let adapter = IdentityAdapter::new(Arc::new(provider));
    adapter.logout().await.unwrap();

    assert_eq!(
        opened.lock().unwrap().as_slice(),
        [format!(
            "{}/{TENANT}/oauth2/v2.0/logout?logout_hint=test.user%40contoso.com",
            server.uri()
        )]
    );
    assert!(adapter.current_account().is_none());
    assert!(tokens.load(&user.username).unwrap().is_none());
    assert!(store.get_item(ACTIVE_KEY).unwrap().is_none());
}
