//! HTTP gateway to the blog backend.
//!
//! Every request goes through [`ApiGateway::execute`], which attaches the
//! stored access token, and on a 401 performs one refresh and one replay.
//! When renewal is impossible the stored session is cleared and
//! [`GatewayEvent::SessionExpired`] is broadcast.
//!
//! Concurrent requests refresh independently: each failing request performs
//! its own single refresh. There is no shared in-flight refresh.

use std::sync::Arc;

use anyhow::Context;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::models::RefreshResponse;
use crate::store::SessionStore;

mod auth;
pub mod error;
mod posts;

pub use error::{ApiError, ApiErrorKind, ApiResult};

const REFRESH_PATH: &str = "auth/token/refresh/";
const EVENT_CAPACITY: usize = 16;

/// Session-level signals raised by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A new access token was stored after a 401.
    TokenRefreshed,
    /// Renewal failed; the stored session has been cleared and the user must
    /// log in again.
    SessionExpired,
}

/// Which try of a request this is. Only the first may trigger a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Replayed,
}

impl Attempt {
    fn label(self) -> &'static str {
        match self {
            Attempt::Initial => "initial",
            Attempt::Replayed => "replayed",
        }
    }
}

/// Whether a request carries the bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    /// Login and registration: they precede authentication.
    Anonymous,
}

#[derive(Debug, Clone)]
struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    auth: Auth,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth: Auth::Bearer,
        }
    }

    fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    fn json(mut self, body: &impl serde::Serialize) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::decode(format!("cannot encode request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }
}

/// Single HTTP client wrapper shared by every caller.
#[derive(Debug)]
pub struct ApiGateway {
    client: reqwest::Client,
    base_url: Url,
    store: Arc<SessionStore>,
    events: broadcast::Sender<GatewayEvent>,
}

impl ApiGateway {
    /// Builds the gateway from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &Config, store: Arc<SessionStore>) -> anyhow::Result<Self> {
        let base_url = config.api_base()?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("blogspace/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().context("build HTTP client")?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url,
            store,
            events,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Subscribes to session-level events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::new(ApiErrorKind::Rejected, format!("bad path '{path}': {e}")))
    }

    /// Sends one HTTP exchange, attaching the current access token when the
    /// request is authenticated and one is stored.
    async fn dispatch(&self, request: &ApiRequest, attempt: Attempt) -> ApiResult<Response> {
        let url = self.url(&request.path)?;
        let mut builder = self.client.request(request.method.clone(), url);

        if request.auth == Auth::Bearer
            && let Some(token) = self.store.access_token()
        {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        debug!(
            method = %request.method,
            path = %request.path,
            attempt = attempt.label(),
            status = response.status().as_u16(),
            "api exchange"
        );
        Ok(response)
    }

    /// Runs a request through the refresh-and-retry protocol and returns the
    /// successful response. Non-success statuses become [`ApiError`]s.
    async fn execute(&self, request: &ApiRequest) -> ApiResult<Response> {
        let mut attempt = Attempt::Initial;
        loop {
            let response = self.dispatch(request, attempt).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status != StatusCode::UNAUTHORIZED || request.auth == Auth::Anonymous {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::from_response(
                    status.as_u16(),
                    &body,
                    request.auth == Auth::Anonymous,
                ));
            }

            match attempt {
                Attempt::Initial => {
                    attempt = Attempt::Replayed;
                    if let Err(err) = self.refresh_access_token().await {
                        warn!(path = %request.path, error = %err, "token refresh failed");
                        self.expire_session();
                        return Err(ApiError::authorization_expired());
                    }
                }
                Attempt::Replayed => {
                    warn!(path = %request.path, "request rejected again after refresh");
                    self.expire_session();
                    return Err(ApiError::authorization_expired());
                }
            }
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResult<T> {
        let response = self.execute(request).await?;
        response.json::<T>().await.map_err(ApiError::decode)
    }

    async fn fetch_empty(&self, request: &ApiRequest) -> ApiResult<()> {
        self.execute(request).await.map(drop)
    }

    /// Exchanges the stored refresh token for a new access token and persists
    /// it.
    async fn refresh_access_token(&self) -> ApiResult<()> {
        let Some(refresh) = self.store.refresh_token() else {
            info!("no refresh token stored; cannot renew session");
            return Err(ApiError::authorization_expired());
        };

        info!("refreshing access token");
        let response = self
            .client
            .post(self.url(REFRESH_PATH)?)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status.as_u16(), &body, false));
        }

        let tokens: RefreshResponse = response.json().await.map_err(ApiError::decode)?;
        let stored = self
            .store
            .update_tokens(&tokens.access, tokens.refresh.as_deref())
            .map_err(|e| ApiError::storage(&e))?;
        if !stored {
            // Logged out while the refresh was in flight.
            return Err(ApiError::authorization_expired());
        }

        let _ = self.events.send(GatewayEvent::TokenRefreshed);
        Ok(())
    }

    /// Clears every persisted session entry and tells subscribers to send the
    /// user back to login.
    fn expire_session(&self) {
        match self.store.clear() {
            Ok(_) => info!("stored session cleared after failed renewal"),
            Err(err) => warn!(error = %format!("{err:#}"), "failed to clear stored session"),
        }
        let _ = self.events.send(GatewayEvent::SessionExpired);
    }
}
