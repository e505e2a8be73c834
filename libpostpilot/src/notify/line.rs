//! LINE Messaging API push notifications

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use super::Notifier;
use crate::config::NotifierConfig;
use crate::error::{NotifyError, Result};
use crate::secret::SecretString;
use crate::transport::{ApiRequest, JsonTransport};
use crate::types::{MediaKind, Post};

const PLATFORM_SEPARATOR: &str = "、";

pub struct LineNotifier {
    transport: Arc<dyn JsonTransport>,
    token: SecretString,
    recipient_id: String,
    base_url: String,
}

impl LineNotifier {
    pub fn new(config: &NotifierConfig, transport: Arc<dyn JsonTransport>) -> Self {
        Self {
            transport,
            token: SecretString::new(config.channel_access_token.clone()),
            recipient_id: config.recipient_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn push(&self, message: Value) -> Result<()> {
        let body = json!({
            "to": self.recipient_id,
            "messages": [message],
        });
        let request = ApiRequest::post(format!("{}/message/push", self.base_url))
            .bearer(&self.token)
            .json(body);
        self.transport
            .send(request)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }

    /// Push a plain text message to the recipient.
    ///
    /// Runs reach this only through [`Notifier::notify_failure`]; anything
    /// else is an ad-hoc message from a caller holding the notifier.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.push(json!({ "type": "text", "text": text })).await
    }

    /// Push a flex message; `alt_text` is shown where cards are not rendered.
    pub async fn send_flex(&self, alt_text: &str, contents: Value) -> Result<()> {
        self.push(json!({
            "type": "flex",
            "altText": alt_text,
            "contents": contents,
        }))
        .await
    }

    /// Fetch the bot's own profile.
    pub async fn verify(&self) -> Result<Value> {
        let request = ApiRequest::get(format!("{}/info", self.base_url)).bearer(&self.token);
        let info = self
            .transport
            .send(request)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(info)
    }
}

/// Bubble card for a published post.
pub fn success_card(post: &Post, platforms: &[String]) -> Value {
    let title = if post.title.trim().is_empty() {
        "無標題"
    } else {
        post.title.as_str()
    };
    let media = match post.media_kind {
        MediaKind::Image => "圖片",
        MediaKind::Video => "影片",
        MediaKind::None => "文字",
    };
    let when = post
        .scheduled_at
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "現在".to_string());

    json!({
        "type": "bubble",
        "header": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                { "type": "text", "text": "🎉 發布成功", "weight": "bold", "color": "#1DB446", "size": "lg" }
            ],
            "backgroundColor": "#E8F5E8",
            "paddingAll": "md"
        },
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                { "type": "text", "text": title, "weight": "bold", "size": "md", "wrap": true },
                { "type": "separator", "margin": "md" },
                {
                    "type": "box",
                    "layout": "vertical",
                    "margin": "md",
                    "contents": [
                        card_row("平台:", &platforms.join(PLATFORM_SEPARATOR)),
                        card_row("類型:", media),
                        card_row("時間:", &when),
                    ]
                }
            ]
        }
    })
}

fn card_row(label: &str, value: &str) -> Value {
    json!({
        "type": "box",
        "layout": "baseline",
        "margin": "sm",
        "contents": [
            { "type": "text", "text": label, "color": "#666666", "size": "sm", "flex": 1 },
            { "type": "text", "text": value, "wrap": true, "color": "#333333", "size": "sm", "flex": 3 }
        ]
    })
}

/// Plain text report for a post that reached no platform.
pub fn failure_message(title: &str, platforms: &[String], error: &str) -> String {
    format!(
        "❌ 發布失敗通知\n\n📝 標題: {}\n📱 平台: {}\n🚫 錯誤訊息: {}\n\n請檢查設定或聯繫技術支援。",
        title,
        platforms.join(PLATFORM_SEPARATOR),
        error
    )
}

#[async_trait]
impl Notifier for LineNotifier {
    async fn notify_success(&self, post: &Post, platforms: &[String]) -> bool {
        match self.send_flex("發布成功通知", success_card(post, platforms)).await {
            Ok(()) => {
                info!("Sent success notification for {}", post.id);
                true
            }
            Err(e) => {
                error!("Failed to send success notification for {}: {}", post.id, e);
                false
            }
        }
    }

    async fn notify_failure(&self, title: &str, platforms: &[String], error: &str) -> bool {
        match self.send_text(&failure_message(title, platforms, error)).await {
            Ok(()) => {
                info!("Sent failure notification for '{}'", title);
                true
            }
            Err(e) => {
                error!("Failed to send failure notification for '{}': {}", title, e);
                false
            }
        }
    }
}
