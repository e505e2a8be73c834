//! Run notifications
//!
//! After each post the operator gets a message: a card listing the
//! platforms that took the post, or a plain text failure report. Delivery
//! problems are logged and reported as `false`; they never fail a run.

use async_trait::async_trait;

use crate::types::Post;

pub mod line;
pub mod mock;

pub use line::LineNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report a post that reached at least one platform. `platforms` lists
    /// only the platforms that succeeded.
    async fn notify_success(&self, post: &Post, platforms: &[String]) -> bool;

    /// Report a post that reached no platform.
    async fn notify_failure(&self, title: &str, platforms: &[String], error: &str) -> bool;
}
