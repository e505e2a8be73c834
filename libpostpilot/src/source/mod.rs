//! Content source abstraction
//!
//! The source store owns the posts. A run reads pending posts from it and
//! writes back exactly one status per post plus the notification status.
//! The trait methods fail soft: errors are logged and turned into empty
//! lists or `false`, so a source outage never aborts a run.

use async_trait::async_trait;

use crate::types::{NotificationStatus, Post, PostStatus};

pub mod mock;
pub mod notion;

pub use notion::NotionSource;

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Posts whose status is pending and whose scheduled time has passed.
    ///
    /// Returns an empty list when the store cannot be queried.
    async fn get_pending_posts(&self) -> Vec<Post>;

    /// Record the publication status. The error detail is only written
    /// when `error_message` is non-empty.
    async fn update_post_status(&self, post_id: &str, status: PostStatus, error_message: &str)
        -> bool;

    /// Record whether the notification for a post went out.
    async fn update_notification_status(&self, post_id: &str, status: NotificationStatus) -> bool;
}
