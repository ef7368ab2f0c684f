//! In-memory port implementations shared by use-case tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;

use crate::{
    domain::Account,
    ports::{
        AuthError, AuthenticationResult, IGraphTransport, IIdentityProvider, IKeyValueStore,
        LoginRequest, StoreError, TokenRequest, TransportError,
    },
};

/// A request seen by [`FakeTransport`]
#[derive(Debug, Clone)]
pub struct Request {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

type Handler = dyn Fn(&Request) -> Result<Value, TransportError> + Send + Sync;

/// Records every request and answers through a handler closure
pub struct FakeTransport {
    requests: Mutex<Vec<Request>>,
    handler: Box<Handler>,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&Request) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn call(
        &self,
        method: &'static str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let request = Request {
            method,
            path: path.to_string(),
            body: body.cloned(),
        };
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

#[async_trait::async_trait]
impl IGraphTransport for FakeTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.call("GET", path, None)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        self.call("POST", path, Some(body))
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        self.call("PATCH", path, Some(body))
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.call("DELETE", path, None).map(|_| ())
    }
}

/// Decoded query parameters of a request path
pub fn query_pairs(path: &str) -> HashMap<String, String> {
    let query = path.split_once('?').map(|(_, q)| q).unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// HashMap-backed store that can be told to reject writes
#[derive(Default)]
pub struct FakeStore {
    items: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_writes() -> Arc<Self> {
        Arc::new(Self {
            fail_writes: true,
            ..Self::default()
        })
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.items
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap().get(key).cloned()
    }
}

impl IKeyValueStore for FakeStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Io("read-only".to_string()));
        }
        self.insert(key, value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Scriptable identity provider
///
/// Each flow succeeds with a token named after it (`silent-token`,
/// `popup-token`, `login-token`) unless an error was scripted for it.
#[derive(Default)]
pub struct FakeIdentityProvider {
    accounts: Mutex<Vec<Account>>,
    active: Mutex<Option<Account>>,
    login_account: Mutex<Option<Account>>,
    login_error: Mutex<Option<AuthError>>,
    silent_error: Mutex<Option<AuthError>>,
    popup_error: Mutex<Option<AuthError>>,
    logout_error: Mutex<Option<AuthError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Arc<Self> {
        let provider = Self::default();
        *provider.accounts.lock().unwrap() = accounts;
        Arc::new(provider)
    }

    /// Account that `login_popup` adds to the cache
    pub fn on_login(&self, account: Account) {
        *self.login_account.lock().unwrap() = Some(account);
    }

    pub fn fail_login(&self, err: AuthError) {
        *self.login_error.lock().unwrap() = Some(err);
    }

    pub fn fail_silent(&self, err: AuthError) {
        *self.silent_error.lock().unwrap() = Some(err);
    }

    pub fn fail_popup(&self, err: AuthError) {
        *self.popup_error.lock().unwrap() = Some(err);
    }

    pub fn fail_logout(&self, err: AuthError) {
        *self.logout_error.lock().unwrap() = Some(err);
    }

    /// Names of the flows invoked so far, with the account or scopes used
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn result(token: &str, account: Account) -> AuthenticationResult {
        AuthenticationResult {
            access_token: token.to_string(),
            account,
            expires_on: Some(Utc::now()),
        }
    }
}

#[async_trait::async_trait]
impl IIdentityProvider for FakeIdentityProvider {
    fn active_account(&self) -> Option<Account> {
        self.active.lock().unwrap().clone()
    }

    fn all_accounts(&self) -> Vec<Account> {
        self.accounts.lock().unwrap().clone()
    }

    fn set_active_account(&self, account: Option<&Account>) {
        *self.active.lock().unwrap() = account.cloned();
    }

    async fn login_popup(
        &self,
        request: &LoginRequest,
    ) -> Result<AuthenticationResult, AuthError> {
        self.record(format!("login:{}", request.scopes.join(" ")));
        if let Some(err) = self.login_error.lock().unwrap().clone() {
            return Err(err);
        }
        let account = self
            .login_account
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Account::new("new-id", "new@contoso.com"));
        self.accounts.lock().unwrap().push(account.clone());
        Ok(Self::result("login-token", account))
    }

    async fn acquire_token_silent(
        &self,
        request: &TokenRequest,
    ) -> Result<AuthenticationResult, AuthError> {
        self.record(format!("silent:{}", request.account.username));
        if let Some(err) = self.silent_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Self::result("silent-token", request.account.clone()))
    }

    async fn acquire_token_popup(
        &self,
        request: &TokenRequest,
    ) -> Result<AuthenticationResult, AuthError> {
        self.record(format!("popup:{}", request.scopes.join(" ")));
        if let Some(err) = self.popup_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Self::result("popup-token", request.account.clone()))
    }

    async fn logout_popup(&self, account: Option<&Account>) -> Result<(), AuthError> {
        let username = account.map(|a| a.username.clone()).unwrap_or_default();
        self.record(format!("logout:{username}"));
        if let Some(err) = self.logout_error.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(account) = account {
            self.accounts
                .lock()
                .unwrap()
                .retain(|a| a.home_account_id != account.home_account_id);
        }
        *self.active.lock().unwrap() = None;
        Ok(())
    }
}
