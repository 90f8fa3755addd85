//! HTTP driver for the networked e-paper display controller.
//!
//! The controller firmware drives a 200 x 200 monochrome panel and exposes:
//! - `POST /upload`: multipart file upload of one packed frame
//! - `GET /clear`, `GET /cross`: built-in drawing commands
//! - `POST /displayText`: renders the `plain` form field
//!
//! 1-bit color depth (8 pixels per byte, MSB first, white = 1)

use reqwest::multipart::{Form, Part};
use std::time::Duration;
use thiserror::Error;

/// Display dimensions
pub const WIDTH: u32 = 200;
pub const HEIGHT: u32 = 200;

/// Buffer size: 8 pixels per byte (1-bit color)
pub const BUFFER_SIZE: usize = (WIDTH as usize * HEIGHT as usize) / 8;

/// File name the firmware stores uploaded frames under
pub const UPLOAD_FILE_NAME: &str = "IMG_0001.bin";

/// Multipart field the firmware reads the frame from
const UPLOAD_FIELD: &str = "file";

/// Device driver errors
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to create HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("Device unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Upload failed with status {status_code}: {message}")]
    UploadFailed { status_code: u16, message: String },

    #[error("Invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },
}

/// Status and body returned by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse {
    pub status_code: u16,
    pub body: String,
}

/// Result of a successful frame upload
pub type UploadResult = DeviceResponse;

/// Display controller reachable over HTTP
pub struct DeviceClient {
    base_url: String,
    http: reqwest::Client,
}

impl DeviceClient {
    /// Create a client for the controller at `base_url`
    ///
    /// `timeout` bounds every request so an unresponsive panel never
    /// stalls the caller.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeviceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(DeviceError::Client)?;

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL of the controller
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload one packed frame
    ///
    /// Any non-2xx answer is reported as `UploadFailed`. There is no retry.
    pub async fn upload(&self, frame: &[u8]) -> Result<UploadResult, DeviceError> {
        if frame.len() != BUFFER_SIZE {
            return Err(DeviceError::InvalidFrameSize {
                expected: BUFFER_SIZE,
                actual: frame.len(),
            });
        }

        let url = self.endpoint("/upload");
        tracing::info!("Uploading {} byte frame to {}", frame.len(), url);

        let part = Part::bytes(frame.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("application/octet-stream")
            .map_err(DeviceError::Client)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await;

        if status.is_success() {
            let body = body?;
            tracing::info!("Upload to display successful ({})", status);
            return Ok(DeviceResponse {
                status_code: status.as_u16(),
                body,
            });
        }

        tracing::warn!("Upload to display failed with status {}", status);
        let body = body.unwrap_or_else(|e| {
            tracing::warn!("Could not read rejection body: {}", e);
            String::new()
        });
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("upload rejected")
                .to_string()
        } else {
            body
        };

        Err(DeviceError::UploadFailed {
            status_code: status.as_u16(),
            message,
        })
    }

    /// Clear the panel
    pub async fn clear(&self) -> Result<DeviceResponse, DeviceError> {
        self.get("/clear").await
    }

    /// Draw the firmware's test cross
    pub async fn cross(&self) -> Result<DeviceResponse, DeviceError> {
        self.get("/cross").await
    }

    /// Render plain text on the panel
    pub async fn display_text(&self, text: &str) -> Result<DeviceResponse, DeviceError> {
        let url = self.endpoint("/displayText");
        tracing::info!("Sending {} chars of text to {}", text.chars().count(), url);

        let response = self
            .http
            .post(&url)
            .form(&[("plain", text)])
            .send()
            .await?;

        Self::read_response(response).await
    }

    async fn get(&self, path: &str) -> Result<DeviceResponse, DeviceError> {
        let url = self.endpoint(path);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        Self::read_response(response).await
    }

    async fn read_response(response: reqwest::Response) -> Result<DeviceResponse, DeviceError> {
        let status_code = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!("Display answered {}: {}", status_code, body);
        Ok(DeviceResponse { status_code, body })
    }
}
