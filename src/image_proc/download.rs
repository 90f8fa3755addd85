//! Image download functionality.
//!
//! Fetches image bytes from HTTP/HTTPS URLs. A single client is built at
//! startup and reused for every download. Each fetch is attempted once;
//! timeouts and HTTP errors are returned to the caller.

use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Download errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Empty URL")]
    EmptyUrl,

    #[error("Download timed out after {0:?}")]
    Timeout(Duration),
}

/// Shared HTTP client for image downloads
pub struct Downloader {
    client: reqwest::Client,
    timeout: Duration,
}

impl Downloader {
    /// Create a downloader whose requests are bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Download the raw bytes behind `url`
    pub async fn download(&self, url: &str) -> Result<Bytes, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        tracing::info!("Downloading image from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("HTTP error: {} for {}", status, url);
            return Err(FetchError::HttpError {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        tracing::debug!("Downloaded {} bytes", bytes.len());

        Ok(bytes)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            tracing::warn!("Download timed out after {:?}", self.timeout);
            FetchError::Timeout(self.timeout)
        } else {
            tracing::warn!("Request failed: {}", err);
            FetchError::RequestError(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{closed_port_url, solid_png, spawn_image_host};

    #[tokio::test]
    async fn downloads_body() {
        let png = solid_png(3, 3, [1, 2, 3]);
        let host = spawn_image_host(png.clone()).await;
        let downloader = Downloader::new(Duration::from_secs(2)).unwrap();

        let bytes = downloader.download(&format!("{host}/image.png")).await.unwrap();

        assert_eq!(bytes.as_ref(), png.as_slice());
    }

    #[tokio::test]
    async fn blank_url_is_rejected() {
        let downloader = Downloader::new(Duration::from_secs(1)).unwrap();
        assert!(matches!(downloader.download("   ").await, Err(FetchError::EmptyUrl)));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let host = spawn_image_host(Vec::new()).await;
        let downloader = Downloader::new(Duration::from_secs(2)).unwrap();

        let err = downloader.download(&format!("{host}/missing")).await.unwrap_err();

        assert!(matches!(err, FetchError::HttpError { status: 404 }));
    }

    #[tokio::test]
    async fn slow_host_times_out() {
        let host = spawn_image_host(Vec::new()).await;
        let downloader = Downloader::new(Duration::from_millis(200)).unwrap();

        let err = downloader.download(&format!("{host}/slow")).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "got {err}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let downloader = Downloader::new(Duration::from_secs(1)).unwrap();
        let url = format!("{}/image.png", closed_port_url().await);

        let err = downloader.download(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::RequestError(_)));
    }
}
