//! Device module for the remote e-paper display.
//!
//! This module provides the interface to the 200 x 200 monochrome panel
//! driven by an embedded controller on the local network.

pub mod client;

// Re-export main types
pub use client::{
    DeviceClient, DeviceError, DeviceResponse, UploadResult, BUFFER_SIZE, HEIGHT, WIDTH,
};

use std::sync::Arc;
use tokio::sync::Mutex;

/// Shareable handle to the display controller
///
/// When `serialize_uploads` is set, frame uploads are funnelled through a
/// single lock so two requests never interleave on the panel. Control
/// commands are not serialised.
#[derive(Clone)]
pub struct DeviceController {
    client: Arc<DeviceClient>,
    upload_lock: Option<Arc<Mutex<()>>>,
}

impl DeviceController {
    /// Create a new controller around a configured client
    pub fn new(client: DeviceClient, serialize_uploads: bool) -> Self {
        Self {
            client: Arc::new(client),
            upload_lock: serialize_uploads.then(|| Arc::new(Mutex::new(()))),
        }
    }

    /// Base URL of the controller
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Upload a packed frame
    pub async fn upload(&self, frame: &[u8]) -> Result<UploadResult, DeviceError> {
        let _guard = match &self.upload_lock {
            Some(lock) => {
                let guard = lock.lock().await;
                tracing::debug!("Acquired display upload lock");
                Some(guard)
            }
            None => None,
        };

        self.client.upload(frame).await
    }

    /// Clear display
    pub async fn clear(&self) -> Result<DeviceResponse, DeviceError> {
        self.client.clear().await
    }

    /// Draw cross
    pub async fn cross(&self) -> Result<DeviceResponse, DeviceError> {
        self.client.cross().await
    }

    /// Show plain text
    pub async fn display_text(&self, text: &str) -> Result<DeviceResponse, DeviceError> {
        self.client.display_text(text).await
    }
}
