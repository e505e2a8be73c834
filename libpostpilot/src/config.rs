//! Configuration management for Postpilot
//!
//! Configuration is read once at process start from a TOML file, then
//! overridden by the environment variables the service has always been
//! deployed with (`NOTION_API_KEY`, `LINE_USER_ID`, ...). The resulting
//! [`Config`] value is passed into every component constructor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::types::PlatformKind;

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub notifier: NotifierConfig,
    pub facebook: Option<PlatformAccountConfig>,
    pub instagram: Option<PlatformAccountConfig>,
    pub threads: Option<PlatformAccountConfig>,
    pub media: MediaConfig,
    pub publishing: PublishingConfig,
    pub logging: LogSettings,
    pub run: RunConfig,
}

/// Notion database holding the posts.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub api_key: String,
    pub database_id: String,
    pub base_url: String,
    pub api_version: String,
    pub schema: SourceSchema,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_id: String::new(),
            base_url: "https://api.notion.com/v1".to_string(),
            api_version: "2022-06-28".to_string(),
            schema: SourceSchema::default(),
        }
    }
}

/// Property names and select labels of the source database.
///
/// The defaults match the production database, whose schema is localized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSchema {
    pub title_property: String,
    pub body_property: String,
    pub media_kind_property: String,
    pub media_url_property: String,
    pub platforms_property: String,
    pub scheduled_property: String,
    pub status_property: String,
    pub error_property: String,
    pub notification_property: String,

    pub status_pending: String,
    pub status_published: String,
    pub status_partial: String,
    pub status_failed: String,

    pub notification_sent: String,
    pub notification_failed: String,

    pub media_image: String,
    pub media_video: String,
}

impl Default for SourceSchema {
    fn default() -> Self {
        Self {
            title_property: "標題".to_string(),
            body_property: "內容".to_string(),
            media_kind_property: "媒體類型".to_string(),
            media_url_property: "媒體URL".to_string(),
            platforms_property: "目標平台".to_string(),
            scheduled_property: "發布日期".to_string(),
            status_property: "發布狀態".to_string(),
            error_property: "錯誤訊息".to_string(),
            notification_property: "Line通知狀態".to_string(),
            status_pending: "待發布".to_string(),
            status_published: "已發布".to_string(),
            status_partial: "部分發布".to_string(),
            status_failed: "發布失敗".to_string(),
            notification_sent: "已發送".to_string(),
            notification_failed: "發送失敗".to_string(),
            media_image: "圖片".to_string(),
            media_video: "影片".to_string(),
        }
    }
}

/// LINE Messaging API push target.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub channel_access_token: String,
    pub recipient_id: String,
    pub base_url: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            channel_access_token: String::new(),
            recipient_id: String::new(),
            base_url: "https://api.line.me/v2/bot".to_string(),
        }
    }
}

/// Credentials for one Graph API account (a Facebook page, an Instagram
/// business user or a Threads user).
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformAccountConfig {
    pub access_token: String,
    #[serde(alias = "page_id", alias = "user_id")]
    pub account_id: String,
    pub base_url: Option<String>,
}

impl PlatformAccountConfig {
    pub fn is_configured(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.account_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub temp_dir: String,
    pub max_image_size_mb: u64,
    pub max_video_size_mb: u64,
    /// Base URL under which `temp_dir` is served by an external static host.
    pub public_base_url: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/media".to_string(),
            max_image_size_mb: 8,
            max_video_size_mb: 300,
            public_base_url: None,
        }
    }
}

impl MediaConfig {
    pub fn expand_temp_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.temp_dir).to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingConfig {
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            max_wait_secs: 300,
            request_timeout_secs: 30,
        }
    }
}

impl PublishingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Take an exclusive advisory lock for the duration of a run.
    pub lock: bool,
    pub lock_file: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lock: true,
            lock_file: None,
        }
    }
}

impl RunConfig {
    /// Lock file location: explicit setting, else the XDG data dir, else
    /// the system temp dir.
    pub fn resolve_lock_file(&self) -> PathBuf {
        if let Some(path) = &self.lock_file {
            return PathBuf::from(shellexpand::tilde(path).to_string());
        }
        dirs::data_dir()
            .map(|d| d.join("postpilot"))
            .unwrap_or_else(std::env::temp_dir)
            .join("run.lock")
    }
}

impl Config {
    /// Load configuration from the default location, then apply
    /// environment overrides. A missing file is not an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults and environment",
                config_path.display()
            );
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific path, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Overlay values from the environment. `lookup` is usually
    /// `std::env::var`; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("NOTION_API_KEY") {
            self.source.api_key = v;
        }
        if let Some(v) = get("NOTION_DATABASE_ID") {
            self.source.database_id = v;
        }
        if let Some(v) = get("LINE_CHANNEL_ACCESS_TOKEN") {
            self.notifier.channel_access_token = v;
        }
        if let Some(v) = get("LINE_USER_ID") {
            self.notifier.recipient_id = v;
        }

        for (slot, token_key, id_key) in [
            (&mut self.facebook, "FACEBOOK_ACCESS_TOKEN", "FACEBOOK_PAGE_ID"),
            (&mut self.instagram, "INSTAGRAM_ACCESS_TOKEN", "INSTAGRAM_USER_ID"),
            (&mut self.threads, "THREADS_ACCESS_TOKEN", "THREADS_USER_ID"),
        ] {
            let token = get(token_key);
            let id = get(id_key);
            if token.is_none() && id.is_none() {
                continue;
            }
            let account = slot.get_or_insert_with(PlatformAccountConfig::default);
            if let Some(token) = token {
                account.access_token = token;
            }
            if let Some(id) = id {
                account.account_id = id;
            }
        }

        if let Some(v) = get("TEMP_MEDIA_DIR") {
            self.media.temp_dir = v;
        }
        if let Some(v) = get("MAX_IMAGE_SIZE_MB") {
            self.media.max_image_size_mb = parse_number("MAX_IMAGE_SIZE_MB", &v)?;
        }
        if let Some(v) = get("MAX_VIDEO_SIZE_MB") {
            self.media.max_video_size_mb = parse_number("MAX_VIDEO_SIZE_MB", &v)?;
        }
        if let Some(v) = get("PUBLIC_MEDIA_BASE_URL") {
            self.media.public_base_url = Some(v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v.to_lowercase();
        }
        if let Some(v) = get("LOG_FILE") {
            self.logging.file = Some(v);
        }

        Ok(())
    }

    /// Check that the settings every run needs are present: the source
    /// store and the messaging channel. Platform credentials are optional.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let mut missing = Vec::new();
        let mut require = |value: &str, name: &str| {
            if value.trim().is_empty() {
                missing.push(name.to_string());
            }
        };

        require(&self.source.api_key, "source.api_key (NOTION_API_KEY)");
        require(&self.source.database_id, "source.database_id (NOTION_DATABASE_ID)");
        require(
            &self.notifier.channel_access_token,
            "notifier.channel_access_token (LINE_CHANNEL_ACCESS_TOKEN)",
        );
        require(&self.notifier.recipient_id, "notifier.recipient_id (LINE_USER_ID)");

        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        if self.publishing.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "publishing.poll_interval_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Account settings for a platform, if its credentials are present.
    pub fn platform_account(&self, kind: PlatformKind) -> Option<&PlatformAccountConfig> {
        let account = match kind {
            PlatformKind::Facebook => self.facebook.as_ref(),
            PlatformKind::Instagram => self.instagram.as_ref(),
            PlatformKind::Threads => self.threads.as_ref(),
        };
        account.filter(|a| a.is_configured())
    }

    /// A view of the configuration that is safe to print.
    pub fn redacted_summary(&self) -> ConfigSummary {
        let database_id = if self.source.database_id.is_empty() {
            None
        } else {
            let prefix: String = self.source.database_id.chars().take(8).collect();
            Some(format!("{}...", prefix))
        };

        ConfigSummary {
            config_valid: self.validate().is_ok(),
            source_configured: !self.source.api_key.is_empty()
                && !self.source.database_id.is_empty(),
            source_database_id: database_id,
            notifier_configured: !self.notifier.channel_access_token.is_empty()
                && !self.notifier.recipient_id.is_empty(),
            facebook_configured: self.platform_account(PlatformKind::Facebook).is_some(),
            instagram_configured: self.platform_account(PlatformKind::Instagram).is_some(),
            threads_configured: self.platform_account(PlatformKind::Threads).is_some(),
            temp_media_dir: self.media.temp_dir.clone(),
            max_image_size_mb: self.media.max_image_size_mb,
            max_video_size_mb: self.media.max_video_size_mb,
            public_base_url: self.media.public_base_url.clone(),
            log_level: self.logging.level.clone(),
        }
    }
}

fn parse_number(key: &str, value: &str) -> std::result::Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: key.to_string(),
        message: format!("expected a whole number, got '{}'", value),
    })
}

/// Printable configuration overview without credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSummary {
    pub config_valid: bool,
    pub source_configured: bool,
    pub source_database_id: Option<String>,
    pub notifier_configured: bool,
    pub facebook_configured: bool,
    pub instagram_configured: bool,
    pub threads_configured: bool,
    pub temp_media_dir: String,
    pub max_image_size_mb: u64,
    pub max_video_size_mb: u64,
    pub public_base_url: Option<String>,
    pub log_level: String,
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "[REDACTED]"
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("source", &self.source)
            .field("notifier", &self.notifier)
            .field("facebook", &self.facebook)
            .field("instagram", &self.instagram)
            .field("threads", &self.threads)
            .field("media", &self.media)
            .field("publishing", &self.publishing)
            .field("logging", &self.logging)
            .field("run", &self.run)
            .finish()
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("api_key", &redact(&self.api_key))
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("channel_access_token", &redact(&self.channel_access_token))
            .field("recipient_id", &self.recipient_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for PlatformAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformAccountConfig")
            .field("access_token", &redact(&self.access_token))
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("POSTPILOT_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("postpilot").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn complete_config() -> Config {
        Config::from_toml_str(
            r#"
[source]
api_key = "secret_notion"
database_id = "0123456789abcdef"

[notifier]
channel_access_token = "line-token"
recipient_id = "U123"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.media.temp_dir, "/tmp/media");
        assert_eq!(config.media.max_image_size_mb, 8);
        assert_eq!(config.media.max_video_size_mb, 300);
        assert_eq!(config.publishing.poll_interval_secs, 10);
        assert_eq!(config.publishing.max_wait_secs, 300);
        assert_eq!(config.logging.level, "info");
        assert!(config.run.lock);
        assert_eq!(config.source.schema.status_pending, "待發布");
    }

    #[test]
    fn test_validate_reports_all_missing_required_fields() {
        let err = Config::default().validate().unwrap_err();
        match err {
            ConfigError::MissingFields(fields) => {
                assert_eq!(fields.len(), 4);
                assert!(fields.iter().any(|f| f.contains("NOTION_API_KEY")));
                assert!(fields.iter().any(|f| f.contains("NOTION_DATABASE_ID")));
                assert!(fields.iter().any(|f| f.contains("LINE_CHANNEL_ACCESS_TOKEN")));
                assert!(fields.iter().any(|f| f.contains("LINE_USER_ID")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_platform_credentials_are_optional() {
        let config = complete_config();
        assert!(config.validate().is_ok());
        assert!(config.platform_account(PlatformKind::Facebook).is_none());
    }

    #[test]
    fn test_platform_sections_accept_native_id_names() {
        let config = Config::from_toml_str(
            r#"
[facebook]
access_token = "fb"
page_id = "1001"

[threads]
access_token = "th"
user_id = "2002"
"#,
        )
        .unwrap();
        assert_eq!(config.platform_account(PlatformKind::Facebook).unwrap().account_id, "1001");
        assert_eq!(config.platform_account(PlatformKind::Threads).unwrap().account_id, "2002");
        assert!(config.platform_account(PlatformKind::Instagram).is_none());
    }

    #[test]
    fn test_half_configured_platform_is_not_registered() {
        let config = Config::from_toml_str(
            r#"
[instagram]
access_token = "ig"
"#,
        )
        .unwrap();
        assert!(config.platform_account(PlatformKind::Instagram).is_none());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = complete_config();
        let env: HashMap<&str, &str> = HashMap::from([
            ("NOTION_API_KEY", "from-env"),
            ("INSTAGRAM_ACCESS_TOKEN", "ig-token"),
            ("INSTAGRAM_USER_ID", "17841"),
            ("MAX_VIDEO_SIZE_MB", "100"),
            ("LOG_LEVEL", "DEBUG"),
            ("TEMP_MEDIA_DIR", ""),
        ]);
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.source.api_key, "from-env");
        assert_eq!(config.media.max_video_size_mb, 100);
        assert_eq!(config.logging.level, "debug");
        // Empty values do not clobber the file
        assert_eq!(config.media.temp_dir, "/tmp/media");
        let ig = config.platform_account(PlatformKind::Instagram).unwrap();
        assert_eq!(ig.account_id, "17841");
    }

    #[test]
    fn test_env_override_rejects_bad_numbers() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|k| {
            (k == "MAX_IMAGE_SIZE_MB").then(|| "eight".to_string())
        });
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("MAX_IMAGE_SIZE_MB"));
    }

    #[test]
    fn test_zero_poll_interval_is_invalid() {
        let mut config = complete_config();
        config.publishing.poll_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_redacted_summary_hides_secrets() {
        let config = complete_config();
        let summary = config.redacted_summary();
        assert!(summary.config_valid);
        assert_eq!(summary.source_database_id.as_deref(), Some("01234567..."));

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("secret_notion"));
        assert!(!json.contains("line-token"));
    }

    #[test]
    fn test_debug_output_redacts_tokens() {
        let config = complete_config();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret_notion"));
        assert!(!debug.contains("line-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_load_from_missing_path_is_read_error() {
        let result = Config::load_from_path(Path::new("/nonexistent/postpilot.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_explicit_lock_file() {
        let run = RunConfig {
            lock: true,
            lock_file: Some("/var/run/postpilot.lock".to_string()),
        };
        assert_eq!(run.resolve_lock_file(), PathBuf::from("/var/run/postpilot.lock"));
    }

    #[test]
    #[serial]
    fn test_load_follows_postpilot_config_and_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[source]\napi_key = \"from_file\"\ndatabase_id = \"db\"\n",
        )
        .unwrap();

        std::env::set_var("POSTPILOT_CONFIG", &path);
        std::env::set_var("NOTION_API_KEY", "from_env");
        let config = Config::load();
        std::env::remove_var("POSTPILOT_CONFIG");
        std::env::remove_var("NOTION_API_KEY");

        let config = config.unwrap();
        assert_eq!(config.source.api_key, "from_env");
        assert_eq!(config.source.database_id, "db");
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        std::env::set_var("POSTPILOT_CONFIG", dir.path().join("absent.toml"));
        std::env::set_var("LINE_USER_ID", "U42");
        let config = Config::load();
        std::env::remove_var("POSTPILOT_CONFIG");
        std::env::remove_var("LINE_USER_ID");

        assert_eq!(config.unwrap().notifier.recipient_id, "U42");
    }
}
