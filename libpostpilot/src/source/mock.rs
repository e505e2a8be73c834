//! In-memory content source for testing
//!
//! Holds a fixed list of pending posts and records every status write so
//! tests can assert on what a run stored.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::ContentSource;
use crate::types::{NotificationStatus, Post, PostStatus};

/// One recorded `update_post_status` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusWrite {
    pub post_id: String,
    pub status: PostStatus,
    pub error_message: String,
}

#[derive(Debug, Clone, Default)]
struct StoredState {
    status: Option<PostStatus>,
    error_message: Option<String>,
    notification: Option<NotificationStatus>,
}

#[derive(Clone, Default)]
pub struct MockSource {
    pending: Arc<Mutex<Vec<Post>>>,
    writes: Arc<Mutex<Vec<StatusWrite>>>,
    notification_writes: Arc<Mutex<Vec<(String, NotificationStatus)>>>,
    state: Arc<Mutex<HashMap<String, StoredState>>>,
    fail_writes: bool,
}

impl MockSource {
    pub fn new(pending: Vec<Post>) -> Self {
        Self {
            pending: Arc::new(Mutex::new(pending)),
            ..Default::default()
        }
    }

    /// A source whose status writes always fail.
    pub fn failing_writes(pending: Vec<Post>) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(pending)
        }
    }

    pub fn status_writes(&self) -> Vec<StatusWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn notification_writes(&self) -> Vec<(String, NotificationStatus)> {
        self.notification_writes.lock().unwrap().clone()
    }

    /// Stored status of a post after all writes so far.
    pub fn stored_status(&self, post_id: &str) -> Option<PostStatus> {
        self.state.lock().unwrap().get(post_id).and_then(|s| s.status)
    }

    /// Stored error detail; `None` if it was never written.
    pub fn stored_error(&self, post_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .get(post_id)
            .and_then(|s| s.error_message.clone())
    }

    pub fn stored_notification(&self, post_id: &str) -> Option<NotificationStatus> {
        self.state.lock().unwrap().get(post_id).and_then(|s| s.notification)
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn get_pending_posts(&self) -> Vec<Post> {
        self.pending.lock().unwrap().clone()
    }

    async fn update_post_status(
        &self,
        post_id: &str,
        status: PostStatus,
        error_message: &str,
    ) -> bool {
        self.writes.lock().unwrap().push(StatusWrite {
            post_id: post_id.to_string(),
            status,
            error_message: error_message.to_string(),
        });
        if self.fail_writes {
            return false;
        }

        let mut state = self.state.lock().unwrap();
        let entry = state.entry(post_id.to_string()).or_default();
        entry.status = Some(status);
        if !error_message.is_empty() {
            entry.error_message = Some(error_message.to_string());
        }
        true
    }

    async fn update_notification_status(&self, post_id: &str, status: NotificationStatus) -> bool {
        self.notification_writes
            .lock()
            .unwrap()
            .push((post_id.to_string(), status));
        if self.fail_writes {
            return false;
        }
        self.state
            .lock()
            .unwrap()
            .entry(post_id.to_string())
            .or_default()
            .notification = Some(status);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_writes_and_state() {
        let source = MockSource::new(vec![Post::new("p1", "Hello")]);
        assert_eq!(source.get_pending_posts().await.len(), 1);

        assert!(source.update_post_status("p1", PostStatus::PartiallyPublished, "failed platforms: Threads").await);
        assert_eq!(source.stored_status("p1"), Some(PostStatus::PartiallyPublished));
        assert_eq!(source.stored_error("p1").as_deref(), Some("failed platforms: Threads"));
        assert_eq!(source.status_writes().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_error_keeps_previous_detail() {
        let source = MockSource::new(vec![]);
        source.update_post_status("p1", PostStatus::PublishFailed, "boom").await;
        source.update_post_status("p1", PostStatus::Published, "").await;
        assert_eq!(source.stored_status("p1"), Some(PostStatus::Published));
        assert_eq!(source.stored_error("p1").as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_failing_writes_are_recorded_but_not_stored() {
        let source = MockSource::failing_writes(vec![]);
        assert!(!source.update_post_status("p1", PostStatus::Published, "").await);
        assert!(!source.update_notification_status("p1", NotificationStatus::Sent).await);
        assert_eq!(source.status_writes().len(), 1);
        assert!(source.stored_status("p1").is_none());
    }
}
