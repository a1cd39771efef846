//! # Authenticated HTTP client
//!
//! One [`ApiClient`] per backend (WMS REST API, chatbot API). Both share a
//! [`TokenStore`] and a [`SessionEvents`] channel.
//!
//! Every request reads the bearer token fresh from storage. A 401 clears the
//! token and publishes [`AuthEvent::SessionExpired`]; the client itself never
//! navigates anywhere. No retries, no backoff: failures go straight back to
//! the caller.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::api::error::ApiError;
use crate::api::types::ErrorBody;
use crate::core::session::TokenStore;

/// Process-wide authentication events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A backend rejected the stored token. It has already been cleared.
    SessionExpired,
}

/// Broadcast hub for [`AuthEvent`]s. Cloning shares the same channel.
#[derive(Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine (headless use).
        if self.sender.send(event).is_err() {
            debug!("No subscribers for {:?}", event);
        }
    }
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: TokenStore,
    events: SessionEvents,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore, events: SessionEvents) -> Self {
        Self::with_timeout(base_url, tokens, events, None)
    }

    /// Like [`ApiClient::new`], with an optional whole-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        tokens: TokenStore,
        events: SessionEvents,
        timeout: Option<Duration>,
    ) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        });
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            tokens,
            events,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.tokens.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Issue `method path` with an optional JSON body and query string.
    ///
    /// Resolves with the parsed body on 2xx (an empty body parses as JSON
    /// `null`, so `()` and `Option<T>` work for 204 responses).
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let mut builder = self.http.request(method.clone(), self.url(path));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        debug!("{} {}", method, path);
        self.execute(builder).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, query).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = to_json(body)?;
        self.request(Method::POST, path, Some(&body), &[]).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = to_json(body)?;
        self.request(Method::PUT, path, Some(&body), &[]).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self.request(Method::DELETE, path, None, &[]).await?;
        Ok(())
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form<F: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        form: &F,
    ) -> Result<T, ApiError> {
        debug!("POST {} (form)", path);
        let builder = self.http.post(self.url(path)).form(form);
        self.execute(builder).await
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .authorized(builder)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &text);
            if status == StatusCode::UNAUTHORIZED {
                info!("Session expired; clearing stored token");
                self.tokens.clear();
                self.events.emit(AuthEvent::SessionExpired);
            } else {
                warn!("API error: {} - {}", status.as_u16(), message);
            }
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Percent-encodes `id` for use as one path segment. Empty and dot segments
/// are refused, since URL parsing collapses them even when encoded.
pub fn path_segment(id: &str) -> Result<String, ApiError> {
    let id = id.trim();
    if id.is_empty() || id == "." || id == ".." {
        return Err(ApiError::InvalidRequest(format!("Invalid id `{id}`")));
    }
    Ok(urlencoding::encode(id).into_owned())
}

fn to_json<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Extracts a human-readable message from an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    };

    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() || trimmed.starts_with('<') {
            fallback()
        } else {
            trimmed.to_string()
        };
    };

    match parsed.detail {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() { fallback() } else { msgs.join("; ") }
        }
        _ => fallback(),
    }
}
