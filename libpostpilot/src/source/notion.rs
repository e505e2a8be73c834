//! Notion database as the content source
//!
//! Pending posts are found with a database query filtered on the status
//! select and the scheduled date. Status writes are page property patches.
//! Property names and select labels come from [`SourceSchema`].

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::ContentSource;
use crate::config::{SourceConfig, SourceSchema};
use crate::error::{Result, SourceError};
use crate::secret::SecretString;
use crate::transport::{ApiRequest, JsonTransport};
use crate::types::{parse_schedule, MediaKind, NotificationStatus, Post, PostStatus};

const PAGE_SIZE: u64 = 100;

/// Notion caps a single rich text item at 2000 characters.
const RICH_TEXT_LIMIT: usize = 2000;

pub struct NotionSource {
    transport: Arc<dyn JsonTransport>,
    api_key: SecretString,
    database_id: String,
    base_url: String,
    api_version: String,
    schema: SourceSchema,
}

impl NotionSource {
    pub fn new(config: &SourceConfig, transport: Arc<dyn JsonTransport>) -> Self {
        Self {
            transport,
            api_key: SecretString::new(config.api_key.clone()),
            database_id: config.database_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            schema: config.schema.clone(),
        }
    }

    fn authorized(&self, request: ApiRequest) -> ApiRequest {
        request
            .bearer(&self.api_key)
            .header("Notion-Version", self.api_version.as_str())
    }

    /// Query filter: status is pending and the scheduled date is not in the future.
    pub fn pending_filter(&self, now: DateTime<Utc>) -> Value {
        json!({
            "and": [
                {
                    "property": self.schema.status_property,
                    "select": { "equals": self.schema.status_pending }
                },
                {
                    "property": self.schema.scheduled_property,
                    "date": { "on_or_before": now.to_rfc3339_opts(SecondsFormat::Secs, true) }
                }
            ]
        })
    }

    /// Fetch every pending page, following the pagination cursor.
    pub async fn query_pending(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        let filter = self.pending_filter(now);
        let mut posts = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "filter": filter, "page_size": PAGE_SIZE });
            if let Some(c) = &cursor {
                body["start_cursor"] = Value::String(c.clone());
            }

            let response = self
                .transport
                .send(self.authorized(ApiRequest::post(&url).json(body)))
                .await
                .map_err(|e| SourceError::Query(e.to_string()))?;

            let results = response
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| SourceError::Query("response has no results array".to_string()))?;

            posts.extend(results.iter().filter_map(|page| self.parse_page(page)));

            let has_more = response
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            cursor = response
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);

            if !has_more || cursor.is_none() {
                break;
            }
            debug!("Fetching next page of pending posts");
        }

        Ok(posts)
    }

    /// Turn a page object into a post. Pages without an id are skipped;
    /// every other missing or mistyped property becomes an empty value.
    pub fn parse_page(&self, page: &Value) -> Option<Post> {
        let id = page.get("id").and_then(Value::as_str)?;
        let props = page.get("properties").cloned().unwrap_or(Value::Null);
        let prop = |name: &str| props.get(name).cloned().unwrap_or(Value::Null);

        let title = plain_text(&prop(self.schema.title_property.as_str()), "title");
        let body = plain_text(&prop(self.schema.body_property.as_str()), "rich_text");

        let media_kind = prop(self.schema.media_kind_property.as_str())
            .pointer("/select/name")
            .and_then(Value::as_str)
            .map(|name| self.parse_media_kind(name))
            .unwrap_or_default();

        let media_url = prop(self.schema.media_url_property.as_str())
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let platforms: Vec<String> = prop(self.schema.platforms_property.as_str())
            .get("multi_select")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let scheduled_at = prop(self.schema.scheduled_property.as_str())
            .pointer("/date/start")
            .and_then(Value::as_str)
            .and_then(parse_schedule);

        let mut post = Post::new(id, title)
            .with_body(body)
            .with_media(media_kind, media_url)
            .with_platforms(platforms);
        post.scheduled_at = scheduled_at;
        Some(post)
    }

    fn parse_media_kind(&self, name: &str) -> MediaKind {
        let name = name.trim();
        if name == self.schema.media_image || name.eq_ignore_ascii_case("image") {
            MediaKind::Image
        } else if name == self.schema.media_video || name.eq_ignore_ascii_case("video") {
            MediaKind::Video
        } else {
            if !name.is_empty() {
                warn!("Unknown media kind '{}', treating as text only", name);
            }
            MediaKind::None
        }
    }

    pub fn status_label(&self, status: PostStatus) -> &str {
        match status {
            PostStatus::Pending => &self.schema.status_pending,
            PostStatus::Published => &self.schema.status_published,
            PostStatus::PartiallyPublished => &self.schema.status_partial,
            PostStatus::PublishFailed => &self.schema.status_failed,
        }
    }

    /// Page patch for a status write.
    pub fn status_payload(&self, status: PostStatus, error_message: &str) -> Value {
        let mut properties = Map::new();
        properties.insert(
            self.schema.status_property.clone(),
            json!({ "select": { "name": self.status_label(status) } }),
        );
        if !error_message.is_empty() {
            let content: String = error_message.chars().take(RICH_TEXT_LIMIT).collect();
            properties.insert(
                self.schema.error_property.clone(),
                json!({ "rich_text": [ { "text": { "content": content } } ] }),
            );
        }
        json!({ "properties": properties })
    }

    pub fn notification_payload(&self, status: NotificationStatus) -> Value {
        let label = match status {
            NotificationStatus::Sent => &self.schema.notification_sent,
            NotificationStatus::Failed => &self.schema.notification_failed,
        };
        let mut properties = Map::new();
        properties.insert(
            self.schema.notification_property.clone(),
            json!({ "select": { "name": label } }),
        );
        json!({ "properties": properties })
    }

    async fn write_properties(&self, post_id: &str, payload: Value) -> Result<()> {
        let url = format!("{}/pages/{}", self.base_url, post_id);
        self.transport
            .send(self.authorized(ApiRequest::patch(url).json(payload)))
            .await
            .map_err(|e| SourceError::Update {
                post_id: post_id.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Count of pending posts, for reachability checks.
    pub async fn probe(&self) -> Result<usize> {
        Ok(self.query_pending(Utc::now()).await?.len())
    }
}

/// Concatenate the plain text of a title or rich text property.
fn plain_text(property: &Value, kind: &str) -> String {
    property
        .get(kind)
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| {
                    part.get("plain_text")
                        .or_else(|| part.pointer("/text/content"))
                        .and_then(Value::as_str)
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ContentSource for NotionSource {
    async fn get_pending_posts(&self) -> Vec<Post> {
        match self.query_pending(Utc::now()).await {
            Ok(posts) => {
                info!("Found {} pending post(s)", posts.len());
                posts
            }
            Err(e) => {
                error!("Failed to fetch pending posts: {}", e);
                Vec::new()
            }
        }
    }

    async fn update_post_status(
        &self,
        post_id: &str,
        status: PostStatus,
        error_message: &str,
    ) -> bool {
        let payload = self.status_payload(status, error_message);
        match self.write_properties(post_id, payload).await {
            Ok(()) => {
                info!("Updated status of {} to {}", post_id, status);
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    async fn update_notification_status(&self, post_id: &str, status: NotificationStatus) -> bool {
        let payload = self.notification_payload(status);
        match self.write_properties(post_id, payload).await {
            Ok(()) => {
                debug!("Updated notification status of {} to {:?}", post_id, status);
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }
}
