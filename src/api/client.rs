//! `TaskApi` trait and the `AlignmentClient` REST implementation.
//!
//! `AlignmentClient` speaks to the provider's `/tasks` endpoints with the
//! stored API key in an `x-api-key` header. Requests are never retried.
//! Artifact downloads ([`TaskApi::fetch_alignment`]) go to arbitrary URLs
//! and carry no credentials.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

use crate::api::credentials::{SecretStore, StoreError, API_KEY_NAME};
use crate::api::types::{CreateTaskRequest, TargetRequest, Task, TaskQuery};
use crate::config::ApiConfig;

const API_KEY_HEADER: &str = "x-api-key";

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors returned by [`TaskApi`] operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No API key is set; raised before any I/O.
    #[error("API key not set. Please authorize first.")]
    Auth,

    /// An empty key was passed to [`AlignmentClient::set_api_key`].
    #[error("API key must not be empty")]
    EmptyKey,

    /// Transport failure: DNS, connect, TLS, timeout, broken body.
    #[error("Network error. Please check your connection. ({0})")]
    Network(String),

    /// The provider answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A successful response did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Downloading a result artifact failed.
    #[error("{0}")]
    Fetch(String),

    /// The secret store rejected a key change.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Network("request timed out".into())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// KeyEvent
// ---------------------------------------------------------------------------

/// API-key notifications, delivered through [`AlignmentClient::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// A key was found in the secret store at startup.
    Loaded,
    /// A new key was saved.
    Updated,
    /// The key was removed.
    Cleared,
}

impl KeyEvent {
    /// Debug-log wording for the event.
    pub fn message(self) -> &'static str {
        match self {
            KeyEvent::Loaded => "API key loaded from storage",
            KeyEvent::Updated => "API key saved",
            KeyEvent::Cleared => "API key cleared",
        }
    }
}

// ---------------------------------------------------------------------------
// TaskApi trait
// ---------------------------------------------------------------------------

/// Async seam over the provider's task endpoints.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn TaskApi>` between the pipeline and the front end.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `POST /tasks` with `{url, targets, callbackUrl?}`.
    async fn create_task(
        &self,
        url: &str,
        targets: Vec<TargetRequest>,
        callback_url: Option<&str>,
    ) -> Result<Task, ApiError>;

    /// `GET /tasks/{id}`.
    async fn get_task(&self, task_id: &str) -> Result<Task, ApiError>;

    /// `GET /tasks?skip=&take=…`.
    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError>;

    /// Unauthenticated GET of a result artifact. Every failure is
    /// reported as [`ApiError::Fetch`].
    async fn fetch_alignment(&self, url: &str) -> Result<Value, ApiError>;

    /// Create a task with a single `alignment` target.
    async fn create_alignment_task(
        &self,
        url: &str,
        formats: &[String],
        language: &str,
    ) -> Result<Task, ApiError> {
        self.create_task(
            url,
            vec![TargetRequest::alignment(formats.to_vec(), language)],
            None,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Response interpretation
// ---------------------------------------------------------------------------

/// Turn a raw HTTP response into the parsed body or an [`ApiError`].
///
/// JSON bodies (by `content-type`) are parsed; anything else is wrapped as
/// `{message: <text>, status: <code>}`. A 2xx response returns the parsed
/// body unchanged. A non-2xx response fails with the body's `message`, else
/// its `error`, else `API Error: <status>`.
pub fn interpret_response(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<Value, ApiError> {
    let ok = (200..300).contains(&status);
    let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));

    let data = if is_json {
        match serde_json::from_str::<Value>(body) {
            Ok(v) => v,
            Err(e) if ok => return Err(ApiError::Decode(e.to_string())),
            Err(_) => Value::Null,
        }
    } else {
        json!({ "message": body, "status": status })
    };

    if ok {
        return Ok(data);
    }

    let message = truthy_message(data.get("message"))
        .or_else(|| truthy_message(data.get("error")))
        .unwrap_or_else(|| format!("API Error: {status}"));

    Err(ApiError::Api { status, message })
}

fn truthy_message(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// AlignmentClient
// ---------------------------------------------------------------------------

/// REST client for the alignment provider.
///
/// Holds the API key in memory and mirrors every change into a
/// [`SecretStore`]. Key changes are broadcast as [`KeyEvent`]s.
pub struct AlignmentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: RwLock<Option<String>>,
    store: Arc<dyn SecretStore>,
    events: broadcast::Sender<KeyEvent>,
}

impl AlignmentClient {
    /// Build a client from config. No key is loaded until
    /// [`load_stored_key`](Self::load_stored_key) or
    /// [`set_api_key`](Self::set_api_key) is called.
    pub fn from_config(config: &ApiConfig, store: Arc<dyn SecretStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let (events, _) = broadcast::channel(16);

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: RwLock::new(None),
            store,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Key management
    // -----------------------------------------------------------------------

    /// Receive future [`KeyEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<KeyEvent> {
        self.events.subscribe()
    }

    /// Read the key persisted by a previous session.
    ///
    /// Store failures are logged and leave the client without a key.
    /// Returns `true` when a key was loaded.
    pub async fn load_stored_key(&self) -> bool {
        match self.store.get(API_KEY_NAME) {
            Ok(Some(key)) if !key.is_empty() => {
                *self.api_key.write().await = Some(key);
                let _ = self.events.send(KeyEvent::Loaded);
                log::debug!("api: stored key loaded");
                true
            }
            Ok(_) => false,
            Err(e) => {
                log::error!("api: error loading stored key: {e}");
                false
            }
        }
    }

    /// Persist `key` and start using it.
    pub async fn set_api_key(&self, key: &str) -> Result<(), ApiError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::EmptyKey);
        }
        self.store.put(API_KEY_NAME, key)?;
        *self.api_key.write().await = Some(key.to_string());
        let _ = self.events.send(KeyEvent::Updated);
        Ok(())
    }

    /// Forget the key in memory and in the store.
    pub async fn clear_api_key(&self) -> Result<(), ApiError> {
        *self.api_key.write().await = None;
        self.store.delete(API_KEY_NAME)?;
        let _ = self.events.send(KeyEvent::Cleared);
        Ok(())
    }

    pub async fn api_key(&self) -> Option<String> {
        self.api_key.read().await.clone()
    }

    pub async fn has_api_key(&self) -> bool {
        self.api_key.read().await.is_some()
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    async fn authorized(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        let key = self.api_key().await.ok_or(ApiError::Auth)?;
        let url = format!("{}{}", self.base_url, endpoint);
        Ok(self.http.request(method, url).header(API_KEY_HEADER, key))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        log::debug!("api: response {status} ({} bytes)", body.len());
        interpret_response(status, content_type.as_deref(), &body)
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `GET /tasks/statistics?name=` (usage figures by default).
    pub async fn task_statistics(&self, name: &str) -> Result<Value, ApiError> {
        let request = self
            .authorized(Method::GET, "/tasks/statistics")
            .await?
            .query(&[("name", name)]);
        self.execute(request).await
    }

    /// `true` when the provider accepts the current key.
    pub async fn validate_key(&self) -> bool {
        let query = TaskQuery {
            limit: Some(1),
            ..TaskQuery::default()
        };
        match self.list_tasks(&query).await {
            Ok(_) => true,
            Err(e) => {
                log::debug!("api: key validation failed: {e}");
                false
            }
        }
    }

    /// Unauthenticated GET of any JSON document (asset manifests).
    pub async fn fetch_json(&self, url: &str) -> Result<Value, ApiError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: format!("API Error: {}", status.as_u16()),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn download_artifact(&self, url: &str) -> Result<Value, String> {
        let response = self.http.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("Failed to fetch alignment: {}", status.as_u16()));
        }
        response.json::<Value>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl TaskApi for AlignmentClient {
    async fn create_task(
        &self,
        url: &str,
        targets: Vec<TargetRequest>,
        callback_url: Option<&str>,
    ) -> Result<Task, ApiError> {
        let payload = CreateTaskRequest {
            url: url.to_string(),
            targets,
            callback_url: callback_url.map(str::to_string),
        };
        log::info!("api: creating task for {url}");
        let request = self.authorized(Method::POST, "/tasks").await?.json(&payload);
        Self::decode(self.execute(request).await?)
    }

    async fn get_task(&self, task_id: &str) -> Result<Task, ApiError> {
        let request = self
            .authorized(Method::GET, &format!("/tasks/{task_id}"))
            .await?;
        Self::decode(self.execute(request).await?)
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError> {
        let mut request = self.authorized(Method::GET, "/tasks").await?;
        if !query.is_empty() {
            request = request.query(query);
        }
        match self.execute(request).await? {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match Self::decode::<Task>(item) {
                    Ok(task) => Some(task),
                    Err(e) => {
                        log::warn!("api: skipping undecodable task in listing: {e}");
                        None
                    }
                })
                .collect()),
            other => {
                log::warn!(
                    "api: task listing is not an array ({}); treating as empty",
                    value_kind(&other)
                );
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_alignment(&self, url: &str) -> Result<Value, ApiError> {
        self.download_artifact(url)
            .await
            .map_err(|e| ApiError::Fetch(format!("Error fetching alignment data: {e}")))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
