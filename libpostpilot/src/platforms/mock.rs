//! Mock publisher for testing
//!
//! A configurable [`Publisher`] that can succeed, fail, decline text or
//! panic, and records every call. Intended for orchestrator tests that
//! should not touch a Graph API at all.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::{AccountInfo, Publisher};
use crate::types::PlatformKind;

/// One recorded publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishCall {
    Text(String),
    Image { url: String, caption: String },
    Video { url: String, caption: String },
}

/// Configuration for mock publisher behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub kind: PlatformKind,

    /// Whether publishing should succeed
    pub publish_succeeds: bool,

    /// Error to return on failure
    pub publish_error: Option<String>,

    /// Whether text-only posts are accepted
    pub supports_text: bool,

    /// Panic inside publish calls
    pub panics: bool,

    /// Delay before completing operations
    pub delay: Duration,

    /// Every publish call, in order
    pub calls: Arc<Mutex<Vec<PublishCall>>>,
}

impl MockConfig {
    pub fn new(kind: PlatformKind) -> Self {
        Self {
            kind,
            publish_succeeds: true,
            publish_error: None,
            supports_text: true,
            panics: false,
            delay: Duration::from_millis(0),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub struct MockPublisher {
    config: MockConfig,
}

impl MockPublisher {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A publisher that accepts everything
    pub fn success(kind: PlatformKind) -> Self {
        Self::new(MockConfig::new(kind))
    }

    /// A publisher whose every call fails with an API error
    pub fn failure(kind: PlatformKind, error: &str) -> Self {
        Self::new(MockConfig {
            publish_succeeds: false,
            publish_error: Some(error.to_string()),
            ..MockConfig::new(kind)
        })
    }

    /// A publisher that declines text-only posts, like Instagram
    pub fn media_only(kind: PlatformKind) -> Self {
        Self::new(MockConfig {
            supports_text: false,
            ..MockConfig::new(kind)
        })
    }

    /// A publisher that panics mid-call
    pub fn panicking(kind: PlatformKind) -> Self {
        Self::new(MockConfig {
            panics: true,
            ..MockConfig::new(kind)
        })
    }

    /// Shared handle to the call log; stays valid after the publisher is
    /// moved into a registry.
    pub fn call_log(&self) -> Arc<Mutex<Vec<PublishCall>>> {
        self.config.calls.clone()
    }

    pub fn calls(&self) -> Vec<PublishCall> {
        self.config.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: PublishCall) -> Result<String> {
        let index = {
            let mut calls = self.config.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        };

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.panics {
            panic!("mock {} publisher panicked", self.config.kind);
        }

        if self.config.publish_succeeds {
            Ok(format!("{}-{}", self.config.kind.as_str().to_lowercase(), index))
        } else {
            Err(PlatformError::Api {
                status: 400,
                body: self
                    .config
                    .publish_error
                    .clone()
                    .unwrap_or_else(|| "mock publish failed".to_string()),
            }
            .into())
        }
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn kind(&self) -> PlatformKind {
        self.config.kind
    }

    fn supports_text(&self) -> bool {
        self.config.supports_text
    }

    async fn publish_text(&self, text: &str) -> Result<String> {
        if !self.config.supports_text {
            return Err(PlatformError::Unsupported(format!(
                "{} does not support text-only posts",
                self.config.kind
            ))
            .into());
        }
        self.record(PublishCall::Text(text.to_string())).await
    }

    async fn publish_image(&self, image_url: &str, caption: &str) -> Result<String> {
        self.record(PublishCall::Image {
            url: image_url.to_string(),
            caption: caption.to_string(),
        })
        .await
    }

    async fn publish_video(&self, video_url: &str, caption: &str) -> Result<String> {
        self.record(PublishCall::Video {
            url: video_url.to_string(),
            caption: caption.to_string(),
        })
        .await
    }

    async fn verify(&self) -> Result<AccountInfo> {
        Ok(AccountInfo::from_profile(json!({
            "id": format!("mock-{}", self.config.kind.as_str().to_lowercase()),
            "name": format!("Mock {}", self.config.kind),
        })))
    }
}
