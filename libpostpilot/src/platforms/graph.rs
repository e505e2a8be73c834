//! Graph-style API account shared by the Meta publishers
//!
//! Facebook, Instagram and Threads all address endpoints as
//! `{base}/{node}/{edge}`, pass parameters and the access token in the query
//! string, and answer with a JSON object carrying an `id`.

use serde_json::Value;
use std::sync::Arc;

use crate::config::PlatformAccountConfig;
use crate::error::{PlatformError, Result};
use crate::secret::SecretString;
use crate::transport::{extract_id, ApiRequest, JsonTransport};

use super::container::ContainerState;

pub const FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com/v23.0";
pub const THREADS_GRAPH_URL: &str = "https://graph.threads.net/v1.0";

#[derive(Clone)]
pub struct GraphAccount {
    transport: Arc<dyn JsonTransport>,
    base_url: String,
    account_id: String,
    token: SecretString,
}

impl GraphAccount {
    pub fn new(
        account: &PlatformAccountConfig,
        default_base_url: &str,
        transport: Arc<dyn JsonTransport>,
    ) -> Self {
        let base_url = account
            .base_url
            .as_deref()
            .unwrap_or(default_base_url)
            .trim_end_matches('/')
            .to_string();
        Self {
            transport,
            base_url,
            account_id: account.account_id.clone(),
            token: SecretString::new(account.access_token.clone()),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// `POST {base}/{account}/{edge}` with query parameters; returns the
    /// created object's id.
    pub async fn create(&self, edge: &str, params: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}/{}/{}", self.base_url, self.account_id, edge);
        let mut request = ApiRequest::post(url).access_token(&self.token);
        for (key, value) in params {
            request = request.query(*key, *value);
        }
        let response = self.transport.send(request).await?;
        extract_id(&response)
    }

    /// `GET {base}/{node}?fields=...`
    pub async fn fetch(&self, node: &str, fields: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, node);
        let request = ApiRequest::get(url)
            .query("fields", fields)
            .access_token(&self.token);
        self.transport.send(request).await
    }

    /// Processing state of a container, read from `field`.
    pub async fn container_state(&self, container_id: &str, field: &str) -> Result<ContainerState> {
        let response = self.fetch(container_id, field).await?;
        if !response.is_object() {
            return Err(PlatformError::InvalidResponse(format!(
                "container {} status is not an object: {}",
                container_id, response
            ))
            .into());
        }
        Ok(ContainerState::from_remote(
            response.get(field).and_then(Value::as_str),
        ))
    }

    /// Publish a processed container through `edge` (`media_publish` or
    /// `threads_publish`).
    pub async fn publish_container(&self, edge: &str, container_id: &str) -> Result<String> {
        self.create(edge, &[("creation_id", container_id)]).await
    }
}

/// Profile returned by an account probe.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub profile: Value,
}

impl AccountInfo {
    pub fn from_profile(profile: Value) -> Self {
        let text = |key: &str| profile.get(key).and_then(Value::as_str).map(str::to_string);
        let id = text("id");
        let name = text("username").or_else(|| text("name"));
        Self { id, name, profile }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::HttpMethod;
    use serde_json::json;

    fn account(transport: &ScriptedTransport, base_url: Option<&str>) -> GraphAccount {
        let config = PlatformAccountConfig {
            access_token: "tok".to_string(),
            account_id: "1784".to_string(),
            base_url: base_url.map(str::to_string),
        };
        GraphAccount::new(&config, FACEBOOK_GRAPH_URL, Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn test_create_sends_params_and_token() {
        let transport = ScriptedTransport::new();
        transport.respond(HttpMethod::Post, "/1784/media", json!({"id": "c1"}));

        let id = account(&transport, None)
            .create("media", &[("image_url", "https://cdn/x.jpg"), ("caption", "hi")])
            .await
            .unwrap();

        assert_eq!(id, "c1");
        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://graph.facebook.com/v23.0/1784/media");
        assert_eq!(request.query_value("caption"), Some("hi"));
        assert!(request.had_access_token);
        assert!(!request.had_bearer);
    }

    #[tokio::test]
    async fn test_base_url_override() {
        let transport = ScriptedTransport::new();
        transport.respond(HttpMethod::Get, "/1784", json!({"id": "1784", "username": "shop"}));

        let profile = account(&transport, Some("http://graph.local/"))
            .fetch("1784", "username")
            .await
            .unwrap();
        let info = AccountInfo::from_profile(profile);

        assert_eq!(transport.requests()[0].url, "http://graph.local/1784");
        assert_eq!(info.name.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn test_container_state_reads_named_field() {
        let transport = ScriptedTransport::new();
        transport.respond(HttpMethod::Get, "/c9", json!({"status_code": "FINISHED", "id": "c9"}));

        let state = account(&transport, None)
            .container_state("c9", "status_code")
            .await
            .unwrap();
        assert_eq!(state, ContainerState::Finished);
        assert_eq!(transport.requests()[0].query_value("fields"), Some("status_code"));
    }
}
