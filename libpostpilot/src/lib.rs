//! Postpilot - scheduled multi-platform publishing
//!
//! This library reads scheduled posts from a Notion database, publishes
//! them to Facebook, Instagram and Threads, writes the outcome back and
//! reports each post over LINE.

pub mod check;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod media;
pub mod notify;
pub mod orchestrator;
pub mod platforms;
pub mod secret;
pub mod source;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{PilotError, Result};
pub use orchestrator::Orchestrator;
pub use types::{MediaKind, PlatformKind, Post, PostOutcome, PostStatus, RunReport};
