//! Error types for Postpilot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PilotError>;

#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content source error: {0}")]
    Source(#[from] SourceError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Run lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PilotError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PilotError::Config(_) => 2,
            PilotError::InvalidInput(_) => 3,
            PilotError::Source(_)
            | PilotError::Platform(_)
            | PilotError::Media(_)
            | PilotError::Notify(_)
            | PilotError::Lock(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Missing required settings: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Status update failed for {post_id}: {message}")]
    Update { post_id: String, message: String },
}

/// Errors raised while talking to a publishing platform (or any JSON API
/// reached through the shared transport).
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Media processing failed for container {0}")]
    ProcessingFailed(String),

    #[error("Media processing timed out for container {container_id} after {waited_secs}s")]
    ProcessingTimedOut {
        container_id: String,
        waited_secs: u64,
    },
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No public URL available for {0}")]
    Hosting(String),

    #[error("{0}")]
    MissingUrl(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[derive(Error, Debug)]
pub enum LockError {
    #[error("Failed to create lock file {path}: {source}")]
    Create {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to acquire lock {path}: {source}")]
    Acquire {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
