//! Shared helpers for gateway and session integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use blogspace_core::models::{TokenPair, User};
use blogspace_core::{ApiGateway, Config, SessionManager, SessionStore};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::{Match, MockServer, Request};

/// Matches requests that carry no `Authorization` header.
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// A gateway wired to a mock server with its store in a temp dir.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<SessionStore>,
    pub gateway: Arc<ApiGateway>,
    _home: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Like [`Harness::start`], with a chance to adjust the gateway config.
    pub async fn start_with(adjust: impl FnOnce(&mut Config)) -> Self {
        let server = MockServer::start().await;
        let home = TempDir::new().expect("create temp home");
        let store = Arc::new(SessionStore::at(home.path().join("session.json")));
        let mut config = config_for(&server.uri());
        adjust(&mut config);
        let gateway = Arc::new(ApiGateway::new(&config, Arc::clone(&store)).expect("gateway"));
        Self {
            server,
            store,
            gateway,
            _home: home,
        }
    }

    pub fn manager(&self) -> SessionManager {
        SessionManager::new(Arc::clone(&self.gateway))
    }

    /// Persists a signed-in session as if a previous run had logged in.
    pub fn sign_in(&self, access: &str, refresh: &str) {
        let tokens = TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        };
        self.store.save_session(&tokens, &user()).expect("seed session");
    }
}

pub fn config_for(server_uri: &str) -> Config {
    Config {
        api_base_url: format!("{server_uri}/api"),
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..Config::default()
    }
}

pub fn user() -> User {
    serde_json::from_value(user_json()).expect("user fixture")
}

pub fn user_json() -> Value {
    json!({
        "id": 7,
        "username": "ada",
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "bio": ""
    })
}

pub fn auth_body(access: &str, refresh: &str) -> Value {
    json!({ "access": access, "refresh": refresh, "user": user_json() })
}

pub fn post_json(id: i64, title: &str, content: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "content": content,
        "author": 7,
        "author_name": "Ada Lovelace",
        "created_at": "2025-03-01T10:00:00Z"
    })
}
