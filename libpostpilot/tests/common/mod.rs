//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use libpostpilot::config::MediaConfig;
use libpostpilot::media::{MediaFetcher, StaticBaseUrlHost};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const PUBLIC_BASE: &str = "https://media.example.test/";

/// Serve `body` with `status_line` to every connection on a local port.
/// Returns the base URL, e.g. `http://127.0.0.1:PORT`.
pub async fn serve(status_line: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status_line,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

/// A fetcher writing into `dir` whose files are published under
/// [`PUBLIC_BASE`].
pub fn media_fetcher(dir: &TempDir) -> Arc<MediaFetcher> {
    let config = MediaConfig {
        temp_dir: dir.path().to_string_lossy().to_string(),
        ..MediaConfig::default()
    };
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let host = StaticBaseUrlHost::new(PUBLIC_BASE, dir.path().to_path_buf()).unwrap();
    Arc::new(MediaFetcher::new(&config, client, Arc::new(host)).unwrap())
}
