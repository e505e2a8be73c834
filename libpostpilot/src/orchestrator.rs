//! Publishing run orchestration
//!
//! A run fetches the pending posts, prepares each post's content, fans it
//! out to the requested platforms one after another, writes the aggregated
//! status back to the source and notifies the operator. Posts are isolated
//! from each other: an error or panic while handling one post is recorded
//! for that post and the run moves on.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::lock::RunLock;
use crate::media::{MediaAsset, MediaFetcher};
use crate::notify::{LineNotifier, Notifier};
use crate::platforms::PlatformRegistry;
use crate::source::{ContentSource, NotionSource};
use crate::transport::ReqwestTransport;
use crate::types::{
    MediaKind, NotificationStatus, PlatformKind, Post, PostOutcome, PostReport, PostStatus,
    RunReport,
};

/// Text and media ready to hand to publishers.
struct PreparedContent {
    text: String,
    asset: Option<MediaAsset>,
}

pub struct Orchestrator {
    source: Arc<dyn ContentSource>,
    registry: PlatformRegistry,
    notifier: Arc<dyn Notifier>,
    media: Arc<MediaFetcher>,
    lock_file: Option<PathBuf>,
}

impl Orchestrator {
    /// Assemble an orchestrator from explicit components. No run lock is
    /// taken unless [`Orchestrator::with_run_lock`] is called.
    pub fn new(
        source: Arc<dyn ContentSource>,
        registry: PlatformRegistry,
        notifier: Arc<dyn Notifier>,
        media: Arc<MediaFetcher>,
    ) -> Self {
        Self {
            source,
            registry,
            notifier,
            media,
            lock_file: None,
        }
    }

    /// Build the production components from configuration.
    ///
    /// # Errors
    ///
    /// Fails with `ConfigError::MissingFields` before anything touches the
    /// network when the source or notifier credentials are missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let transport = Arc::new(ReqwestTransport::new(config.publishing.request_timeout())?);
        let source = Arc::new(NotionSource::new(&config.source, transport.clone()));
        let registry = PlatformRegistry::from_config(config, transport.clone());
        let notifier = Arc::new(LineNotifier::new(&config.notifier, transport.clone()));
        let media = Arc::new(MediaFetcher::from_config(
            &config.media,
            transport.client().clone(),
        )?);

        if registry.is_empty() {
            warn!("No platform has credentials; every post will fail");
        }

        let mut orchestrator = Self::new(source, registry, notifier, media);
        if config.run.lock {
            orchestrator = orchestrator.with_run_lock(config.run.resolve_lock_file());
        }
        Ok(orchestrator)
    }

    /// Hold an exclusive lock on `path` for the duration of each run.
    pub fn with_run_lock(mut self, path: PathBuf) -> Self {
        self.lock_file = Some(path);
        self
    }

    /// Execute one run.
    ///
    /// Per-post failures are reported in the returned [`RunReport`]. A lock
    /// file that cannot be opened is logged and the run goes ahead unlocked.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: String) -> Result<RunReport> {
        let mut report = RunReport {
            run_id,
            skipped: false,
            posts: Vec::new(),
        };

        let _lock = match &self.lock_file {
            Some(path) => match RunLock::try_acquire(path) {
                Ok(Some(lock)) => Some(lock),
                Ok(None) => {
                    warn!("Another run holds {}, skipping this run", path.display());
                    report.skipped = true;
                    return Ok(report);
                }
                Err(e) => {
                    warn!("{}; continuing without a run lock", e);
                    None
                }
            },
            None => None,
        };

        info!("Starting publishing run");
        let posts = self.source.get_pending_posts().await;
        if posts.is_empty() {
            info!("No pending posts");
            return Ok(report);
        }

        for post in &posts {
            let span = info_span!("post", post_id = %post.id);
            let post_report = self.process_isolated(post).instrument(span).await;
            report.posts.push(post_report);
        }

        self.media.cleanup().await;

        info!(
            "Run finished: {} published, {} partially published, {} failed",
            report.count(PostStatus::Published),
            report.count(PostStatus::PartiallyPublished),
            report.count(PostStatus::PublishFailed)
        );
        Ok(report)
    }

    /// Process one post, turning a panic into a failed post.
    async fn process_isolated(&self, post: &Post) -> PostReport {
        let status_written = AtomicBool::new(false);
        let result = AssertUnwindSafe(self.process_post(post, &status_written))
            .catch_unwind()
            .await;

        match result {
            Ok(report) => report,
            Err(panic) => {
                let message = format!("internal error: {}", panic_message(&*panic));
                error!(panic = %message, "Post processing panicked");
                let outcome = PostOutcome::content_failure(message.clone());
                if !status_written.load(Ordering::SeqCst) {
                    self.source
                        .update_post_status(&post.id, PostStatus::PublishFailed, &message)
                        .await;
                    self.notifier.notify_failure(&post.title, &[], &message).await;
                }
                PostReport {
                    post_id: post.id.clone(),
                    title: post.title.clone(),
                    status: PostStatus::PublishFailed,
                    outcome,
                }
            }
        }
    }

    async fn process_post(&self, post: &Post, status_written: &AtomicBool) -> PostReport {
        info!("Processing post '{}'", post.title);

        let outcome = match self.prepare(post).await {
            Ok(content) => self.publish_all(post, &content).await,
            Err(e) => {
                error!("Content preparation failed: {}", e);
                PostOutcome::content_failure(format!("content preparation failed: {}", e))
            }
        };
        let status = outcome.status();
        let error_text = outcome.error.clone().unwrap_or_default();

        status_written.store(true, Ordering::SeqCst);
        self.source
            .update_post_status(&post.id, status, &error_text)
            .await;

        if outcome.succeeded.is_empty() {
            self.notifier
                .notify_failure(&post.title, &[], &error_text)
                .await;
        } else {
            let sent = self.notifier.notify_success(post, &outcome.succeeded).await;
            let notification = if sent {
                NotificationStatus::Sent
            } else {
                NotificationStatus::Failed
            };
            self.source
                .update_notification_status(&post.id, notification)
                .await;
        }

        PostReport {
            post_id: post.id.clone(),
            title: post.title.clone(),
            status,
            outcome,
        }
    }

    async fn prepare(&self, post: &Post) -> Result<PreparedContent> {
        let text = post.text_content();
        let asset = if post.media_kind.has_media() {
            Some(self.media.prepare(post.media_kind, &post.media_url).await?)
        } else {
            None
        };
        Ok(PreparedContent { text, asset })
    }

    /// Publish to every requested platform in order and aggregate.
    async fn publish_all(&self, post: &Post, content: &PreparedContent) -> PostOutcome {
        let mut outcome = PostOutcome::default();
        let mut failures: Vec<String> = Vec::new();

        for name in &post.target_platforms {
            let label = PlatformKind::from_name(name)
                .map(|k| k.to_string())
                .unwrap_or_else(|| name.clone());

            let result = AssertUnwindSafe(self.publish_one(name, content))
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(remote_id)) => {
                    info!("Published to {} as {}", label, remote_id);
                    outcome.succeeded.push(label);
                }
                Ok(Err(e)) => {
                    warn!("Publishing to {} failed: {}", label, e);
                    failures.push(format!("{} ({})", label, e));
                    outcome.failed.push(label);
                }
                Err(panic) => {
                    let message = panic_message(&*panic);
                    error!("Publisher for {} panicked: {}", label, message);
                    failures.push(format!("{} (publisher panicked: {})", label, message));
                    outcome.failed.push(label);
                }
            }
        }

        if outcome.requested() == 0 {
            outcome.error = Some("no target platforms".to_string());
        } else if !failures.is_empty() {
            outcome.error = Some(format!("failed platforms: {}", failures.join("; ")));
        }
        outcome
    }

    async fn publish_one(&self, name: &str, content: &PreparedContent) -> Result<String> {
        let publisher = self.registry.resolve(name)?;

        let Some(asset) = &content.asset else {
            return publisher.publish_text(&content.text).await;
        };

        let path = asset.path_for(publisher.kind());
        let url = self.media.publish_url_for(path).await?;
        match asset.kind {
            MediaKind::Image => publisher.publish_image(&url, &content.text).await,
            MediaKind::Video => publisher.publish_video(&url, &content.text).await,
            MediaKind::None => publisher.publish_text(&content.text).await,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
