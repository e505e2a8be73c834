//! Instagram business account publishing
//!
//! Media is published through containers: `/{user}/media` creates one,
//! `/{user}/media_publish` publishes it. Reels are polled on `status_code`
//! until processing finishes. Text-only posts do not exist on Instagram.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PlatformAccountConfig;
use crate::error::{PlatformError, Result};
use crate::transport::JsonTransport;
use crate::types::PlatformKind;

use super::container::{wait_for_container, ContainerState, PollPolicy};
use super::graph::{AccountInfo, GraphAccount, FACEBOOK_GRAPH_URL};
use super::Publisher;

pub struct InstagramPublisher {
    graph: GraphAccount,
    policy: PollPolicy,
}

impl InstagramPublisher {
    pub fn new(account: &PlatformAccountConfig, transport: Arc<dyn JsonTransport>) -> Self {
        Self {
            graph: GraphAccount::new(account, FACEBOOK_GRAPH_URL, transport),
            policy: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn publish(&self, container_id: &str) -> Result<String> {
        let id = self.graph.publish_container("media_publish", container_id).await?;
        info!("Published Instagram media {}", id);
        Ok(id)
    }
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Instagram
    }

    fn supports_text(&self) -> bool {
        false
    }

    async fn publish_text(&self, _text: &str) -> Result<String> {
        Err(PlatformError::Unsupported("Instagram does not support text-only posts".to_string()).into())
    }

    async fn publish_image(&self, image_url: &str, caption: &str) -> Result<String> {
        let container = self
            .graph
            .create("media", &[("image_url", image_url), ("caption", caption)])
            .await?;
        debug!("Instagram image container {} is {:?}", container, ContainerState::Created);
        self.publish(&container).await
    }

    async fn publish_video(&self, video_url: &str, caption: &str) -> Result<String> {
        let container = self
            .graph
            .create(
                "media",
                &[("media_type", "REELS"), ("video_url", video_url), ("caption", caption)],
            )
            .await?;
        debug!("Instagram reel container {} is {:?}", container, ContainerState::Created);

        wait_for_container(&container, self.policy, || {
            self.graph.container_state(&container, "status_code")
        })
        .await?;

        self.publish(&container).await
    }

    async fn verify(&self) -> Result<AccountInfo> {
        let profile = self
            .graph
            .fetch(self.graph.account_id(), "account_type,username,media_count")
            .await?;
        Ok(AccountInfo::from_profile(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::HttpMethod;
    use serde_json::json;

    fn publisher(transport: &ScriptedTransport) -> InstagramPublisher {
        let account = PlatformAccountConfig {
            access_token: "ig-token".to_string(),
            account_id: "17841".to_string(),
            base_url: None,
        };
        InstagramPublisher::new(&account, Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn test_text_is_declined_without_network() {
        let transport = ScriptedTransport::new();
        let instagram = publisher(&transport);
        assert!(!instagram.supports_text());

        let err = instagram.publish_text("hello").await.unwrap_err();
        assert!(err.to_string().contains("does not support text"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_image_creates_then_publishes() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Post, "/17841/media", json!({"id": "c1"}))
            .respond(HttpMethod::Post, "/17841/media_publish", json!({"id": "m1"}));

        let id = publisher(&transport)
            .publish_image("https://cdn/a.jpg", "caption")
            .await
            .unwrap();

        assert_eq!(id, "m1");
        let create = &transport.requests_to(HttpMethod::Post, "/media")[0];
        assert_eq!(create.query_value("image_url"), Some("https://cdn/a.jpg"));
        let publish = &transport.requests_to(HttpMethod::Post, "/media_publish")[0];
        assert_eq!(publish.query_value("creation_id"), Some("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reel_polls_until_finished() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Post, "/17841/media", json!({"id": "c2"}))
            .respond(HttpMethod::Get, "/c2", json!({"status_code": "IN_PROGRESS"}))
            .respond(HttpMethod::Get, "/c2", json!({"status_code": "FINISHED"}))
            .respond(HttpMethod::Post, "/17841/media_publish", json!({"id": "m2"}));

        let id = publisher(&transport)
            .publish_video("https://cdn/a.mp4", "reel")
            .await
            .unwrap();

        assert_eq!(id, "m2");
        let create = &transport.requests_to(HttpMethod::Post, "/media")[0];
        assert_eq!(create.query_value("media_type"), Some("REELS"));
        assert_eq!(transport.requests_to(HttpMethod::Get, "/c2").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reel_processing_error_skips_publish() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Post, "/17841/media", json!({"id": "c3"}))
            .respond(HttpMethod::Get, "/c3", json!({"status_code": "ERROR"}));

        let result = publisher(&transport).publish_video("https://cdn/a.mp4", "").await;

        assert!(result.is_err());
        assert!(transport.requests_to(HttpMethod::Post, "/media_publish").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reel_never_finishing_times_out() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Post, "/17841/media", json!({"id": "c4"}))
            .respond(HttpMethod::Get, "/c4", json!({"status_code": "IN_PROGRESS"}));

        let err = publisher(&transport)
            .publish_video("https://cdn/a.mp4", "")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert!(transport.requests_to(HttpMethod::Post, "/media_publish").is_empty());
    }
}
