//! Public hosting of downloaded media
//!
//! Container platforms fetch media by URL, so a local file must be reachable
//! from the internet before it can be published. Hosting itself happens
//! outside this crate; a [`MediaHost`] only maps a local file to the URL it
//! is served under.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{ConfigError, MediaError, Result};

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Public URL for a local asset.
    async fn public_url(&self, path: &Path) -> Result<String>;

    /// Short label for logs and reports.
    fn describe(&self) -> String;
}

/// Returns `file://` URLs. Platforms cannot fetch these, so every media
/// publish through this host is expected to fail at the platform.
#[derive(Debug, Default, Clone)]
pub struct LocalFileHost;

#[async_trait]
impl MediaHost for LocalFileHost {
    async fn public_url(&self, path: &Path) -> Result<String> {
        warn!(
            "No public media host configured, handing out a local file URL for {}",
            path.display()
        );
        Ok(format!("file://{}", path.display()))
    }

    fn describe(&self) -> String {
        "local file (no public hosting)".to_string()
    }
}

/// Maps files in the media directory onto a static server that already
/// serves that directory.
#[derive(Debug, Clone)]
pub struct StaticBaseUrlHost {
    base_url: url::Url,
    root: PathBuf,
}

impl StaticBaseUrlHost {
    pub fn new(base_url: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let mut base_url = url::Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            field: "media.public_base_url".to_string(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "media.public_base_url".to_string(),
                message: "must be an http(s) URL".to_string(),
            }
            .into());
        }
        // Url::join replaces the last segment unless the path ends in a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            root: root.into(),
        })
    }
}

#[async_trait]
impl MediaHost for StaticBaseUrlHost {
    async fn public_url(&self, path: &Path) -> Result<String> {
        let in_root = path.parent() == Some(self.root.as_path());
        let file_name = path.file_name().and_then(|n| n.to_str());
        match file_name {
            Some(name) if in_root => self
                .base_url
                .join(name)
                .map(|u| u.to_string())
                .map_err(|e| MediaError::Hosting(format!("{}: {}", path.display(), e)).into()),
            _ => Err(MediaError::Hosting(format!(
                "{} is not inside {}",
                path.display(),
                self.root.display()
            ))
            .into()),
        }
    }

    fn describe(&self) -> String {
        format!("static host at {}", self.base_url)
    }
}
