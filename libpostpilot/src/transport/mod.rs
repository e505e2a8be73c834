//! JSON-over-HTTP transport shared by every remote client
//!
//! The Graph API publishers, the Notion source and the LINE notifier all
//! speak "send a request, get a JSON object back". They do it through the
//! [`JsonTransport`] trait so integration tests can swap the network for a
//! [`mock::ScriptedTransport`].
//!
//! Non-2xx responses become [`PlatformError::Api`]; connection failures
//! become [`PlatformError::Network`]. Tokens are carried as
//! [`SecretString`] and never appear in `Debug` output or error text.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::{PlatformError, Result};
use crate::secret::SecretString;

pub mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Patch => write!(f, "PATCH"),
        }
    }
}

/// A single API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// Sent as the `access_token` query parameter (Graph API style).
    pub access_token: Option<SecretString>,
    /// Sent as `Authorization: Bearer ...`.
    pub bearer: Option<SecretString>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            access_token: None,
            bearer: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn access_token(mut self, token: &SecretString) -> Self {
        self.access_token = Some(token.clone());
        self
    }

    pub fn bearer(mut self, token: &SecretString) -> Self {
        self.bearer = Some(token.clone());
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait JsonTransport: Send + Sync {
    /// Perform the request and return the decoded JSON body
    /// (`Value::Null` for an empty 2xx body).
    ///
    /// # Errors
    ///
    /// - `PlatformError::Api` for a non-2xx status
    /// - `PlatformError::Network` when the request could not be sent
    /// - `PlatformError::InvalidResponse` when a 2xx body is not JSON
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("postpilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl JsonTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
        };

        let mut query: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(token) = &request.access_token {
            query.push(("access_token", token.expose()));
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!("{} {}", request.method, request.url);

        // without_url keeps the access_token query parameter out of the message
        let response = builder
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PlatformError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(PlatformError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            PlatformError::InvalidResponse(format!("{} returned non-JSON body: {}", request.url, e))
                .into()
        })
    }
}

/// Pull the `id` field out of a creation response.
pub fn extract_id(response: &Value) -> Result<String> {
    match response.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(PlatformError::InvalidResponse(format!("response has no id: {}", response)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let token = SecretString::new("tok");
        let request = ApiRequest::post("https://graph.example/1/feed")
            .query("message", "hello")
            .access_token(&token);
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.query_value("message"), Some("hello"));
        assert_eq!(request.query_value("access_token"), None);
        assert!(request.access_token.is_some());
    }

    #[test]
    fn test_request_debug_redacts_tokens() {
        let token = SecretString::new("EAAG-super-secret");
        let request = ApiRequest::get("https://graph.example/me")
            .access_token(&token)
            .bearer(&token);
        let debug = format!("{:?}", request);
        assert!(!debug.contains("EAAG-super-secret"));
    }

    #[test]
    fn test_extract_id() {
        assert_eq!(extract_id(&json!({"id": "178"})).unwrap(), "178");
        assert_eq!(extract_id(&json!({"id": 42})).unwrap(), "42");
        assert!(extract_id(&json!({"id": ""})).is_err());
        assert!(extract_id(&json!({"success": true})).is_err());
    }
}
