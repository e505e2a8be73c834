//! Facebook page publishing
//!
//! Posts go straight to the page: one Graph API call per post, no
//! container or polling.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::PlatformAccountConfig;
use crate::error::Result;
use crate::transport::JsonTransport;
use crate::types::PlatformKind;

use super::graph::{AccountInfo, GraphAccount, FACEBOOK_GRAPH_URL};
use super::Publisher;

pub struct FacebookPublisher {
    graph: GraphAccount,
}

impl FacebookPublisher {
    pub fn new(account: &PlatformAccountConfig, transport: Arc<dyn JsonTransport>) -> Self {
        Self {
            graph: GraphAccount::new(account, FACEBOOK_GRAPH_URL, transport),
        }
    }

    /// Share a link on the page feed.
    ///
    /// Standalone helper for callers holding a publisher directly. Scheduled
    /// runs never call it, since a post carries no link field.
    pub async fn publish_link(&self, link: &str, message: &str) -> Result<String> {
        let id = self
            .graph
            .create("feed", &[("link", link), ("message", message)])
            .await?;
        info!("Published Facebook link post {}", id);
        Ok(id)
    }
}

#[async_trait]
impl Publisher for FacebookPublisher {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Facebook
    }

    async fn publish_text(&self, text: &str) -> Result<String> {
        let id = self.graph.create("feed", &[("message", text)]).await?;
        info!("Published Facebook text post {}", id);
        Ok(id)
    }

    async fn publish_image(&self, image_url: &str, caption: &str) -> Result<String> {
        let id = self
            .graph
            .create("photos", &[("url", image_url), ("caption", caption)])
            .await?;
        info!("Published Facebook photo {}", id);
        Ok(id)
    }

    async fn publish_video(&self, video_url: &str, caption: &str) -> Result<String> {
        let id = self
            .graph
            .create("videos", &[("file_url", video_url), ("description", caption)])
            .await?;
        info!("Published Facebook video {}", id);
        Ok(id)
    }

    async fn verify(&self) -> Result<AccountInfo> {
        let profile = self
            .graph
            .fetch(
                self.graph.account_id(),
                "name,category,fan_count,talking_about_count",
            )
            .await?;
        Ok(AccountInfo::from_profile(profile))
    }
}
