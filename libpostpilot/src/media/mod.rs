//! Media download and per-platform asset preparation
//!
//! A post's media is downloaded once into the temporary directory. Each
//! platform then asks for its own variant of the asset; variants are the
//! original file today, with the configured size caps only checked and
//! logged. Public URLs come from the configured [`MediaHost`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{MediaError, Result};
use crate::types::{MediaKind, PlatformKind};

pub mod host;

pub use host::{LocalFileHost, MediaHost, StaticBaseUrlHost};

const FALLBACK_FILENAME: &str = "downloaded_media";
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Named variant slots of a downloaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaVariant {
    Original,
    Instagram,
    Facebook,
}

impl MediaVariant {
    /// Variant a platform publishes. Threads shares the Instagram variant;
    /// video always goes out as the original file.
    pub fn for_platform(platform: PlatformKind, kind: MediaKind) -> Self {
        match (kind, platform) {
            (MediaKind::Video, _) | (MediaKind::None, _) => MediaVariant::Original,
            (MediaKind::Image, PlatformKind::Facebook) => MediaVariant::Facebook,
            (MediaKind::Image, PlatformKind::Instagram | PlatformKind::Threads) => {
                MediaVariant::Instagram
            }
        }
    }
}

/// A downloaded asset and its platform variants.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub kind: MediaKind,
    pub original: PathBuf,
    pub instagram: PathBuf,
    pub facebook: PathBuf,
}

impl MediaAsset {
    pub fn path(&self, variant: MediaVariant) -> &Path {
        match variant {
            MediaVariant::Original => &self.original,
            MediaVariant::Instagram => &self.instagram,
            MediaVariant::Facebook => &self.facebook,
        }
    }

    pub fn path_for(&self, platform: PlatformKind) -> &Path {
        self.path(MediaVariant::for_platform(platform, self.kind))
    }
}

pub struct MediaFetcher {
    client: reqwest::Client,
    temp_dir: PathBuf,
    max_image_bytes: u64,
    max_video_bytes: u64,
    host: Arc<dyn MediaHost>,
}

impl MediaFetcher {
    /// Create a fetcher, making sure the temporary directory exists.
    pub fn new(config: &MediaConfig, client: reqwest::Client, host: Arc<dyn MediaHost>) -> Result<Self> {
        let temp_dir = config.expand_temp_dir();
        std::fs::create_dir_all(&temp_dir).map_err(MediaError::Io)?;
        Ok(Self {
            client,
            temp_dir,
            max_image_bytes: config.max_image_size_mb.saturating_mul(BYTES_PER_MB),
            max_video_bytes: config.max_video_size_mb.saturating_mul(BYTES_PER_MB),
            host,
        })
    }

    /// Create a fetcher with the host implied by the configuration:
    /// a static base URL if one is set, local file URLs otherwise.
    pub fn from_config(config: &MediaConfig, client: reqwest::Client) -> Result<Self> {
        let host: Arc<dyn MediaHost> = match &config.public_base_url {
            Some(base) => Arc::new(StaticBaseUrlHost::new(base, config.expand_temp_dir())?),
            None => Arc::new(LocalFileHost),
        };
        Self::new(config, client, host)
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn host(&self) -> &dyn MediaHost {
        self.host.as_ref()
    }

    /// Stream `url` into the temporary directory.
    ///
    /// The file name defaults to the last segment of the URL path. A
    /// partially written file is removed when the transfer fails.
    pub async fn download(&self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        let name = match filename {
            Some(name) => sanitize_filename(name),
            None => filename_from_url(url),
        };
        let path = self.temp_dir.join(name);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_error(url, e))?;

        let mut file = tokio::fs::File::create(&path).await.map_err(MediaError::Io)?;
        let written = async {
            let mut total: u64 = 0;
            while let Some(chunk) = response.chunk().await.map_err(|e| download_error(url, e))? {
                file.write_all(&chunk).await.map_err(MediaError::Io)?;
                total += chunk.len() as u64;
            }
            file.flush().await.map_err(MediaError::Io)?;
            Ok::<u64, MediaError>(total)
        }
        .await;

        match written {
            Ok(total) => {
                info!("Downloaded {} ({} bytes) to {}", url, total, path.display());
                Ok(path)
            }
            Err(e) => {
                drop(file);
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    debug!("Could not remove partial download {}: {}", path.display(), remove_err);
                }
                Err(e.into())
            }
        }
    }

    /// Download a post's media and fill in its variants.
    pub async fn prepare(&self, kind: MediaKind, url: &str) -> Result<MediaAsset> {
        if url.trim().is_empty() {
            return Err(MediaError::MissingUrl(format!("{} post has no media URL", kind)).into());
        }
        let original = self.download(url, None).await?;
        Ok(MediaAsset {
            kind,
            instagram: self.variant_for(&original, kind, PlatformKind::Instagram).await,
            facebook: self.variant_for(&original, kind, PlatformKind::Facebook).await,
            original,
        })
    }

    /// Platform-specific copy of an asset. No transformation is done, so
    /// this is the input path; an asset over the size cap for its kind is
    /// logged.
    pub async fn variant_for(&self, path: &Path, kind: MediaKind, platform: PlatformKind) -> PathBuf {
        let cap = match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
            MediaKind::None => return path.to_path_buf(),
        };
        if let Ok(meta) = tokio::fs::metadata(path).await {
            if meta.len() > cap {
                warn!(
                    "{} is {} bytes, over the {} byte {} cap for {}; publishing unchanged",
                    path.display(),
                    meta.len(),
                    cap,
                    kind,
                    platform
                );
            }
        }
        path.to_path_buf()
    }

    /// Public URL for a local asset, via the media host.
    pub async fn publish_url_for(&self, path: &Path) -> Result<String> {
        self.host.public_url(path).await
    }

    /// Remove every regular file directly inside the temporary directory.
    /// Subdirectories are left alone; errors are logged.
    pub async fn cleanup(&self) {
        let mut entries = match tokio::fs::read_dir(&self.temp_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list {}: {}", self.temp_dir.display(), e);
                return;
            }
        };

        let mut removed = 0usize;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not read {}: {}", self.temp_dir.display(), e);
                    break;
                }
            };
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        info!("Cleaned up {} temporary media file(s)", removed);
    }
}

fn download_error(url: &str, e: reqwest::Error) -> MediaError {
    MediaError::Download {
        url: url.to_string(),
        message: e.without_url().to_string(),
    }
}

/// Last path segment of `url`, sanitized, or the fallback name.
pub fn filename_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .map(|segment| sanitize_filename(&segment))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Reduce a name to a single safe path component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn fetcher(dir: &TempDir) -> MediaFetcher {
        let config = MediaConfig {
            temp_dir: dir.path().to_string_lossy().to_string(),
            max_image_size_mb: 1,
            ..MediaConfig::default()
        };
        MediaFetcher::from_config(&config, client()).unwrap()
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(status_line: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://cdn.test/a/b/photo.jpg?x=1"), "photo.jpg");
        assert_eq!(filename_from_url("https://cdn.test/"), "downloaded_media");
        assert_eq!(filename_from_url("https://cdn.test"), "downloaded_media");
        assert_eq!(filename_from_url("not a url"), "downloaded_media");
    }

    #[test]
    fn test_sanitize_filename_stays_in_directory() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename(".."), "downloaded_media");
        assert_eq!(sanitize_filename("my photo.png"), "my_photo.png");
        assert!(!sanitize_filename("a/b\\c").contains('/'));
    }

    #[test]
    fn test_variant_selection() {
        assert_eq!(
            MediaVariant::for_platform(PlatformKind::Threads, MediaKind::Image),
            MediaVariant::Instagram
        );
        assert_eq!(
            MediaVariant::for_platform(PlatformKind::Facebook, MediaKind::Image),
            MediaVariant::Facebook
        );
        assert_eq!(
            MediaVariant::for_platform(PlatformKind::Instagram, MediaKind::Video),
            MediaVariant::Original
        );
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let dir = TempDir::new().unwrap();
        let base = serve_once("HTTP/1.1 200 OK", b"jpeg-bytes".to_vec()).await;
        let path = fetcher(&dir)
            .download(&format!("{}/images/sale.jpg", base), None)
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("sale.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_download_uses_explicit_filename() {
        let dir = TempDir::new().unwrap();
        let base = serve_once("HTTP/1.1 200 OK", b"x".to_vec()).await;
        let path = fetcher(&dir)
            .download(&format!("{}/a.jpg", base), Some("renamed.jpg"))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("renamed.jpg"));
    }

    #[tokio::test]
    async fn test_download_http_error_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let base = serve_once("HTTP/1.1 404 Not Found", b"missing".to_vec()).await;
        let result = fetcher(&dir).download(&format!("{}/gone.jpg", base), None).await;

        assert!(result.is_err());
        assert!(!dir.path().join("gone.jpg").exists());
    }

    #[tokio::test]
    async fn test_prepare_rejects_empty_url() {
        let dir = TempDir::new().unwrap();
        let result = fetcher(&dir).prepare(MediaKind::Image, "  ").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_prepare_fills_variants() {
        let dir = TempDir::new().unwrap();
        let base = serve_once("HTTP/1.1 200 OK", vec![0u8; 2 * 1024 * 1024]).await;
        let asset = fetcher(&dir)
            .prepare(MediaKind::Image, &format!("{}/big.png", base))
            .await
            .unwrap();

        // Over the 1 MB cap: warned about, not transformed
        assert_eq!(asset.instagram, asset.original);
        assert_eq!(asset.path_for(PlatformKind::Threads), asset.original.as_path());
        assert_eq!(asset.path_for(PlatformKind::Facebook), asset.facebook.as_path());
    }

    #[tokio::test]
    async fn test_variant_for_missing_file_is_passthrough() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.jpg");
        let variant = fetcher(&dir)
            .variant_for(&path, MediaKind::Image, PlatformKind::Instagram)
            .await;
        assert_eq!(variant, path);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_top_level_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"b").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();
        std::fs::write(dir.path().join("keep").join("c.txt"), b"c").unwrap();

        fetcher(&dir).cleanup().await;

        assert!(!dir.path().join("a.jpg").exists());
        assert!(!dir.path().join("b.mp4").exists());
        assert!(dir.path().join("keep").join("c.txt").exists());
    }

    #[tokio::test]
    async fn test_publish_url_uses_static_host() {
        let dir = TempDir::new().unwrap();
        let config = MediaConfig {
            temp_dir: dir.path().to_string_lossy().to_string(),
            public_base_url: Some("https://cdn.example.com/m".to_string()),
            ..MediaConfig::default()
        };
        let fetcher = MediaFetcher::from_config(&config, client()).unwrap();
        let url = fetcher
            .publish_url_for(&dir.path().join("clip.mp4"))
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/m/clip.mp4");
    }
}
