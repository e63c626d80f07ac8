// SmartCocoon HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction, the rotating
// token triple, the one-shot re-authentication protocol, and error body
// decoding. Login and the hierarchy refresh are implemented as inherent
// methods in `login.rs` and `update.rs` to keep this module focused on
// transport mechanics.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{LoginOutcome, Session, TokenSet};
use crate::error::Error;
use crate::model::System;
use crate::persist::ResponseStore;
use crate::transport::TransportConfig;

/// Production API root.
pub const API_ENDPOINT: &str = "https://app.mysmartcocoon.com/api";

/// Everything needed to construct a [`SmartCocoonClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; request paths are appended after a `/`.
    pub base_url: Url,
    /// Token triple persisted from an earlier session, if any.
    pub tokens: Option<TokenSet>,
    /// Directory that receives a copy of every successful response.
    pub save_location: Option<PathBuf>,
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(API_ENDPOINT).expect("API_ENDPOINT is a valid URL"),
            tokens: None,
            save_location: None,
            transport: TransportConfig::default(),
        }
    }
}

/// A single request against the API, relative to the configured root.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Extra request headers. Token headers are layered on top at send time.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// JSON request body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn is_supported(&self) -> bool {
        matches!(self.method, Method::GET | Method::POST | Method::PUT)
    }
}

/// Error envelope: `{"error": {"statusCode", "name", "message"}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: Option<u16>,
    name: Option<String>,
    message: Option<String>,
}

/// A fully buffered HTTP response, so the body can be inspected for the
/// token-expiry signal and still be parsed afterwards.
#[derive(Debug)]
pub(crate) struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl RawResponse {
    /// Decode a non-success body into an [`Error`].
    ///
    /// A body that is not JSON or has no `error` object becomes
    /// [`Error::UnexpectedResponse`] instead of a structured error.
    fn error(&self) -> Error {
        match serde_json::from_str::<ErrorEnvelope>(&self.body) {
            Ok(ErrorEnvelope { error }) => Error::Api {
                status_code: error.status_code.unwrap_or(self.status.as_u16()),
                name: error.name.unwrap_or_default(),
                message: error.message.unwrap_or_default(),
            },
            Err(_) => Error::UnexpectedResponse {
                status: self.status.as_u16(),
                body: self.body.clone(),
            },
        }
    }

    fn is_invalid_token(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED && self.error().is_invalid_token()
    }
}

/// Async client for the SmartCocoon cloud API.
///
/// Cheaply cloneable; clones share one session. Every [`call`](Self::call),
/// [`login`](Self::login) and [`update`](Self::update) holds the session
/// lock for its whole duration, so calls on one client never interleave
/// and a token refresh cannot race another call's retry.
#[derive(Clone)]
pub struct SmartCocoonClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    store: Option<ResponseStore>,
    session: Mutex<Session>,
    /// Raw system fragments from the last successful update.
    systems: RwLock<Vec<Map<String, Value>>>,
}

impl std::fmt::Debug for SmartCocoonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartCocoonClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SmartCocoonClient {
    /// Create a client from a [`ClientConfig`]. Does not touch the network.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        Ok(Self::with_client(http, config))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        let session = Session {
            tokens: config.tokens,
            ..Session::default()
        };
        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.base_url,
                store: config.save_location.map(ResponseStore::new),
                session: Mutex::new(session),
                systems: RwLock::new(Vec::new()),
            }),
        }
    }

    /// The API root.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Current token triple, for persisting across restarts.
    pub async fn tokens(&self) -> Option<TokenSet> {
        self.inner.session.lock().await.tokens.clone()
    }

    /// User id resolved by the last successful login.
    pub async fn user_id(&self) -> Option<i64> {
        self.inner.session.lock().await.user_id
    }

    /// Systems from the last successful [`update`](Self::update).
    pub fn systems(&self) -> Vec<System> {
        self.cached_fragments()
            .into_iter()
            .map(|data| System::new(self.clone(), data))
            .collect()
    }

    // ── Request dispatch ─────────────────────────────────────────────

    /// Issue a request and return the decoded JSON body.
    ///
    /// Only GET, POST and PUT are supported. Any other method is a no-op:
    /// nothing is sent and `Ok(None)` is returned.
    ///
    /// An expired access token is recovered from once, transparently, by
    /// logging in again with the retained credentials and re-sending the
    /// request. Every successful response rotates the stored token triple
    /// and, when persistence is configured, is written to disk.
    pub async fn call(&self, request: ApiRequest) -> Result<Option<Value>, Error> {
        let mut session = self.session_lock().lock().await;
        self.call_with(&mut session, &request).await
    }

    pub(crate) async fn call_with(
        &self,
        session: &mut Session,
        request: &ApiRequest,
    ) -> Result<Option<Value>, Error> {
        if !request.is_supported() {
            debug!(method = %request.method, path = %request.path, "unsupported method, skipping");
            return Ok(None);
        }

        let response = self.send_with_refresh(session, request).await?;
        self.finish(session, request, response).map(Some)
    }

    /// Send once; on an invalid-token rejection, log in again and re-send
    /// exactly once more.
    async fn send_with_refresh(
        &self,
        session: &mut Session,
        request: &ApiRequest,
    ) -> Result<RawResponse, Error> {
        let response = self.send(session, request).await?;
        if !response.is_invalid_token() {
            return Ok(response);
        }

        let Some(credentials) = session.credentials.clone() else {
            debug!(path = %request.path, "access token rejected and no credentials retained");
            return Ok(response);
        };

        debug!(path = %request.path, "access token rejected, logging in again");
        match self.sign_in(session, &credentials).await {
            Ok(LoginOutcome::Success) => self.send(session, request).await,
            Ok(outcome) => {
                warn!(%outcome, "silent re-authentication failed");
                Ok(response)
            }
            Err(error) => {
                warn!(%error, "silent re-authentication failed");
                Ok(response)
            }
        }
    }

    /// Put a request on the wire and buffer the response.
    pub(crate) async fn send(
        &self,
        session: &Session,
        request: &ApiRequest,
    ) -> Result<RawResponse, Error> {
        let url = self.api_url(&request.path)?;
        debug!("{} {}", request.method, url);

        let mut headers = request.headers.clone();
        headers.extend(session.request_headers());

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .headers(headers);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await.map_err(Error::Transport)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Parse a buffered response and persist the body.
    pub(crate) fn finish(
        &self,
        session: &mut Session,
        request: &ApiRequest,
        response: RawResponse,
    ) -> Result<Value, Error> {
        let body = parse_response(session, response)?;
        if let Some(ref store) = self.inner.store {
            store.save(&request.path, &body)?;
        }
        Ok(body)
    }

    // ── Helpers ─────────────────────────────────────────────────────

    pub(crate) fn session_lock(&self) -> &Mutex<Session> {
        &self.inner.session
    }

    /// Build `{base}/{path}`, keeping any path prefix on the base URL.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&full).map_err(Error::InvalidUrl)
    }

    pub(crate) fn cached_fragments(&self) -> Vec<Map<String, Value>> {
        self.inner
            .systems
            .read()
            .expect("systems lock poisoned")
            .clone()
    }

    pub(crate) fn replace_cache(&self, fragments: Vec<Map<String, Value>>) {
        *self.inner.systems.write().expect("systems lock poisoned") = fragments;
    }
}

/// Success: decode the body and rotate the token triple from the headers.
/// Anything else: the decoded error.
fn parse_response(session: &mut Session, response: RawResponse) -> Result<Value, Error> {
    if !response.status.is_success() {
        return Err(response.error());
    }

    session.rotate_tokens(&response.headers);

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: response.body,
    })
}
