//! Recording notifier for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::Notifier;
use crate::types::Post;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Success {
        post_id: String,
        platforms: Vec<String>,
    },
    Failure {
        title: String,
        platforms: Vec<String>,
        error: String,
    },
}

/// Keeps every notification; delivery succeeds unless built with
/// [`RecordingNotifier::failing`].
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fails: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_success(&self, post: &Post, platforms: &[String]) -> bool {
        self.sent.lock().unwrap().push(Notification::Success {
            post_id: post.id.clone(),
            platforms: platforms.to_vec(),
        });
        !self.fails
    }

    async fn notify_failure(&self, title: &str, platforms: &[String], error: &str) -> bool {
        self.sent.lock().unwrap().push(Notification::Failure {
            title: title.to_string(),
            platforms: platforms.to_vec(),
            error: error.to_string(),
        });
        !self.fails
    }
}
