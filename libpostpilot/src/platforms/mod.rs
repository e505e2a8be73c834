//! Platform publishers
//!
//! Every target platform implements [`Publisher`]. Facebook posts directly
//! to the page feed; Instagram and Threads go through the two-phase
//! container flow in [`container`]. The [`PlatformRegistry`] maps the
//! closed set of [`PlatformKind`]s to the publishers that have credentials.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use libpostpilot::config::Config;
//! use libpostpilot::platforms::PlatformRegistry;
//! use libpostpilot::transport::ReqwestTransport;
//! use libpostpilot::types::PlatformKind;
//!
//! # async fn example() -> libpostpilot::error::Result<()> {
//! let config = Config::load()?;
//! let transport = Arc::new(ReqwestTransport::new(config.publishing.request_timeout())?);
//! let registry = PlatformRegistry::from_config(&config, transport);
//!
//! if let Some(facebook) = registry.get(PlatformKind::Facebook) {
//!     let id = facebook.publish_text("Hello from the page").await?;
//!     println!("Posted: {}", id);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{PlatformError, Result};
use crate::transport::JsonTransport;
use crate::types::PlatformKind;

pub mod container;
pub mod facebook;
pub mod graph;
pub mod instagram;
pub mod threads;

// Available in all builds so integration tests can use it
pub mod mock;

pub use container::{ContainerState, PollPolicy};
pub use graph::AccountInfo;

/// A publishing target.
///
/// Each method returns the platform's id for the created post. Failures are
/// returned as errors; callers turn them into per-platform outcomes, so an
/// implementation never needs to panic or retry.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Whether the platform accepts posts without media.
    fn supports_text(&self) -> bool {
        true
    }

    /// Publish a text-only post.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Unsupported` when the platform has no
    /// text-only posts, and API or network errors otherwise.
    async fn publish_text(&self, text: &str) -> Result<String>;

    /// Publish an image fetched by the platform from `image_url`.
    async fn publish_image(&self, image_url: &str, caption: &str) -> Result<String>;

    /// Publish a video fetched by the platform from `video_url`.
    ///
    /// For container platforms this waits for processing, bounded by the
    /// publisher's [`PollPolicy`].
    async fn publish_video(&self, video_url: &str, caption: &str) -> Result<String>;

    /// Fetch the account profile, confirming the credentials work.
    async fn verify(&self) -> Result<AccountInfo>;
}

/// Lookup table from platform kind to configured publisher.
#[derive(Default, Clone)]
pub struct PlatformRegistry {
    publishers: HashMap<PlatformKind, Arc<dyn Publisher>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the publishers whose credentials are present in `config`.
    pub fn from_config(config: &Config, transport: Arc<dyn JsonTransport>) -> Self {
        let policy = PollPolicy::from_config(&config.publishing);
        let mut registry = Self::new();

        for kind in PlatformKind::ALL {
            let Some(account) = config.platform_account(kind) else {
                tracing::debug!("{} has no credentials, not registering", kind);
                continue;
            };
            let publisher: Arc<dyn Publisher> = match kind {
                PlatformKind::Facebook => {
                    Arc::new(facebook::FacebookPublisher::new(account, transport.clone()))
                }
                PlatformKind::Instagram => Arc::new(
                    instagram::InstagramPublisher::new(account, transport.clone())
                        .with_poll_policy(policy),
                ),
                PlatformKind::Threads => Arc::new(
                    threads::ThreadsPublisher::new(account, transport.clone())
                        .with_poll_policy(policy),
                ),
            };
            registry.register(publisher);
        }

        registry
    }

    /// Add or replace the publisher for its kind.
    pub fn register(&mut self, publisher: Arc<dyn Publisher>) {
        self.publishers.insert(publisher.kind(), publisher);
    }

    pub fn get(&self, kind: PlatformKind) -> Option<Arc<dyn Publisher>> {
        self.publishers.get(&kind).cloned()
    }

    /// Resolve a platform name as written in the source.
    ///
    /// # Errors
    ///
    /// - `PlatformError::Unsupported` for a name outside the known set
    /// - `PlatformError::NotConfigured` for a known platform without credentials
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Publisher>> {
        let kind = PlatformKind::from_name(name)
            .ok_or_else(|| PlatformError::Unsupported(format!("unsupported platform: {}", name)))?;
        self.get(kind)
            .ok_or_else(|| PlatformError::NotConfigured(kind.to_string()).into())
    }

    /// Registered kinds in their canonical order.
    pub fn kinds(&self) -> Vec<PlatformKind> {
        PlatformKind::ALL
            .into_iter()
            .filter(|k| self.publishers.contains_key(k))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformAccountConfig;
    use crate::transport::mock::ScriptedTransport;
    use mock::MockPublisher;

    #[test]
    fn test_registry_from_config_registers_configured_only() {
        let mut config = Config::default();
        config.facebook = Some(PlatformAccountConfig {
            access_token: "fb".to_string(),
            account_id: "1".to_string(),
            base_url: None,
        });
        config.threads = Some(PlatformAccountConfig {
            access_token: "".to_string(),
            account_id: "2".to_string(),
            base_url: None,
        });

        let registry = PlatformRegistry::from_config(&config, Arc::new(ScriptedTransport::new()));
        assert_eq!(registry.kinds(), vec![PlatformKind::Facebook]);
    }

    #[test]
    fn test_resolve_distinguishes_unknown_and_unconfigured() {
        let mut registry = PlatformRegistry::new();
        registry.register(Arc::new(MockPublisher::success(PlatformKind::Facebook)));

        assert!(registry.resolve("facebook").is_ok());

        let unknown = registry.resolve("Twitter").err().unwrap().to_string();
        assert!(unknown.contains("unsupported platform"), "{unknown}");

        let missing = registry.resolve("Threads").err().unwrap().to_string();
        assert!(missing.contains("not configured"), "{missing}");
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mut registry = PlatformRegistry::new();
        registry.register(Arc::new(MockPublisher::success(PlatformKind::Threads)));
        registry.register(Arc::new(MockPublisher::failure(PlatformKind::Threads, "down")));
        assert_eq!(registry.kinds().len(), 1);
    }
}
