//! Threads publishing
//!
//! Every Threads post is a container: `/{user}/threads` creates it with a
//! `media_type` of TEXT, IMAGE or VIDEO and `/{user}/threads_publish`
//! publishes it. Video containers are polled on `status` first.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PlatformAccountConfig;
use crate::error::Result;
use crate::transport::JsonTransport;
use crate::types::PlatformKind;

use super::container::{wait_for_container, ContainerState, PollPolicy};
use super::graph::{AccountInfo, GraphAccount, THREADS_GRAPH_URL};
use super::Publisher;

pub struct ThreadsPublisher {
    graph: GraphAccount,
    policy: PollPolicy,
}

impl ThreadsPublisher {
    pub fn new(account: &PlatformAccountConfig, transport: Arc<dyn JsonTransport>) -> Self {
        Self {
            graph: GraphAccount::new(account, THREADS_GRAPH_URL, transport),
            policy: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn create(&self, params: &[(&str, &str)]) -> Result<String> {
        let container = self.graph.create("threads", params).await?;
        debug!("Threads container {} is {:?}", container, ContainerState::Created);
        Ok(container)
    }

    async fn publish(&self, container_id: &str) -> Result<String> {
        let id = self.graph.publish_container("threads_publish", container_id).await?;
        info!("Published Threads post {}", id);
        Ok(id)
    }
}

#[async_trait]
impl Publisher for ThreadsPublisher {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Threads
    }

    async fn publish_text(&self, text: &str) -> Result<String> {
        let container = self.create(&[("media_type", "TEXT"), ("text", text)]).await?;
        self.publish(&container).await
    }

    async fn publish_image(&self, image_url: &str, caption: &str) -> Result<String> {
        let container = self
            .create(&[("media_type", "IMAGE"), ("image_url", image_url), ("text", caption)])
            .await?;
        self.publish(&container).await
    }

    async fn publish_video(&self, video_url: &str, caption: &str) -> Result<String> {
        let container = self
            .create(&[("media_type", "VIDEO"), ("video_url", video_url), ("text", caption)])
            .await?;

        wait_for_container(&container, self.policy, || {
            self.graph.container_state(&container, "status")
        })
        .await?;

        self.publish(&container).await
    }

    async fn verify(&self) -> Result<AccountInfo> {
        let profile = self
            .graph
            .fetch(
                self.graph.account_id(),
                "id,username,threads_profile_picture_url,threads_biography",
            )
            .await?;
        Ok(AccountInfo::from_profile(profile))
    }
}
