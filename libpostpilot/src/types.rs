//! Core types for Postpilot

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A content record read from the source store.
///
/// Posts are authored externally; this crate only ever writes back their
/// status fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub media_kind: MediaKind,
    pub media_url: String,
    pub target_platforms: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: String::new(),
            media_kind: MediaKind::None,
            media_url: String::new(),
            target_platforms: Vec::new(),
            scheduled_at: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_media(mut self, kind: MediaKind, url: impl Into<String>) -> Self {
        self.media_kind = kind;
        self.media_url = url.into();
        self
    }

    /// Set the target platforms. Duplicates are dropped, first occurrence wins.
    pub fn with_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_platforms = dedupe_platforms(platforms.into_iter().map(Into::into));
        self
    }

    pub fn with_schedule(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Title and body joined by a blank line, trimmed.
    pub fn text_content(&self) -> String {
        format!("{}\n\n{}", self.title, self.body).trim().to_string()
    }
}

/// Collapse repeated platform names, keeping first-seen order.
///
/// Known names compare by the platform they resolve to, so an alias and
/// the canonical name count once. Unknown names compare case-insensitively.
pub fn dedupe_platforms(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut keys: Vec<String> = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = match PlatformKind::from_name(trimmed) {
            Some(kind) => kind.as_str().to_lowercase(),
            None => trimmed.to_lowercase(),
        };
        if !keys.contains(&key) {
            keys.push(key);
            seen.push(trimmed.to_string());
        }
    }
    seen
}

/// Parse a source date: RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_schedule(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    None,
    Image,
    Video,
}

impl MediaKind {
    pub fn has_media(&self) -> bool {
        !matches!(self, MediaKind::None)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::None => write!(f, "none"),
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// The closed set of publishing targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Direct feed publishing, one call per post.
    Facebook,
    /// Container based, no text-only posts.
    Instagram,
    /// Container based.
    Threads,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 3] = [
        PlatformKind::Facebook,
        PlatformKind::Instagram,
        PlatformKind::Threads,
    ];

    /// Case-insensitive lookup of a platform name as written in the source.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "facebook" | "fb" => Some(Self::Facebook),
            "instagram" | "ig" => Some(Self::Instagram),
            "threads" => Some(Self::Threads),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::Instagram => "Instagram",
            Self::Threads => "Threads",
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publication status as tracked in the source store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Published,
    PartiallyPublished,
    PublishFailed,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Published => write!(f, "published"),
            Self::PartiallyPublished => write!(f, "partially published"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}

/// Whether the downstream notification for a post went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

/// Per-post aggregation of platform results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub error: Option<String>,
}

impl PostOutcome {
    /// An outcome for a post that never reached the platforms.
    pub fn content_failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn requested(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Classify the outcome. Zero successes, including zero requested
    /// platforms, is a failure.
    pub fn status(&self) -> PostStatus {
        if self.succeeded.is_empty() {
            PostStatus::PublishFailed
        } else if self.failed.is_empty() {
            PostStatus::Published
        } else {
            PostStatus::PartiallyPublished
        }
    }
}

/// What happened to one post during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostReport {
    pub post_id: String,
    pub title: String,
    pub status: PostStatus,
    pub outcome: PostOutcome,
}

/// Summary returned by a single orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// Set when another run held the lock and this one did nothing.
    pub skipped: bool,
    pub posts: Vec<PostReport>,
}

impl RunReport {
    pub fn count(&self, status: PostStatus) -> usize {
        self.posts.iter().filter(|p| p.status == status).count()
    }
}
