//! Image processing module.
//!
//! Provides image download, decoding, enhancement, dithering, bit-packing
//! and payload encoding for the e-paper display.

pub mod artifacts;
pub mod bitmap;
pub mod decode;
pub mod dither;
pub mod download;
pub mod encode;
pub mod pack;
pub mod transform;

pub use artifacts::{ArtifactError, ArtifactStore, SavedArtifacts};
pub use bitmap::MonochromeBitmap;
pub use decode::{decode_image, DecodeError};
pub use download::{Downloader, FetchError};
pub use encode::{encode, DeviceUploadPayload};
pub use pack::pack;
pub use transform::transform_image;

use crate::device::{DeviceController, DeviceError, UploadResult};
use bytes::Bytes;
use thiserror::Error;

/// Image processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Short error tag for API responses
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Decode(_) => "DecodeError",
            ProcessingError::Fetch(_) => "FetchError",
            ProcessingError::Device(DeviceError::UploadFailed { .. }) => "UploadFailed",
            ProcessingError::Device(_) => "DeviceUnreachable",
            ProcessingError::Artifact(_) => "ArtifactError",
            ProcessingError::Task(_) => "InternalError",
        }
    }

    /// HTTP status to report to the client
    pub fn status_code(&self) -> u16 {
        match self {
            ProcessingError::Decode(_) => 400,
            ProcessingError::Fetch(_) => 502,
            ProcessingError::Device(DeviceError::InvalidFrameSize { .. }) => 500,
            ProcessingError::Device(DeviceError::Client(_)) => 500,
            ProcessingError::Device(_) => 502,
            ProcessingError::Artifact(_) | ProcessingError::Task(_) => 500,
        }
    }

    /// Status code the display answered with, when it rejected an upload
    pub fn device_status(&self) -> Option<u16> {
        match self {
            ProcessingError::Device(DeviceError::UploadFailed { status_code, .. }) => {
                Some(*status_code)
            }
            _ => None,
        }
    }
}

/// A transcoded frame ready for upload
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub payload: DeviceUploadPayload,
    pub artifacts: Option<SavedArtifacts>,
}

/// Outcome of a frame pushed to the display
#[derive(Debug, Clone)]
pub struct DisplayReport {
    pub frame: ProcessedFrame,
    pub upload: UploadResult,
}

/// Run decode → transform → pack → encode on raw image bytes
///
/// CPU bound; callers on the async runtime should use `spawn_blocking`.
pub fn transcode(bytes: &[u8]) -> Result<(MonochromeBitmap, DeviceUploadPayload), DecodeError> {
    let img = decode_image(bytes)?;
    let bitmap = transform_image(img);
    let payload = encode(pack(&bitmap));
    Ok((bitmap, payload))
}

/// Transcode and, if configured, record the frame
fn prepare_frame(
    bytes: &[u8],
    artifacts: Option<&ArtifactStore>,
) -> Result<ProcessedFrame, ProcessingError> {
    let (bitmap, payload) = transcode(bytes)?;

    let artifacts = match artifacts {
        Some(store) => Some(store.save(&bitmap, &payload)?),
        None => None,
    };

    Ok(ProcessedFrame { payload, artifacts })
}

/// Image processor that handles the full pipeline
pub struct ImageProcessor {
    device: DeviceController,
    downloader: Downloader,
    artifacts: Option<ArtifactStore>,
}

impl ImageProcessor {
    /// Create a new image processor
    pub fn new(
        device: DeviceController,
        downloader: Downloader,
        artifacts: Option<ArtifactStore>,
    ) -> Self {
        Self {
            device,
            downloader,
            artifacts,
        }
    }

    /// Display controller used for uploads and control commands
    pub fn device(&self) -> &DeviceController {
        &self.device
    }

    /// Process raw image bytes and push the frame to the display
    ///
    /// Full pipeline:
    /// 1. Decode image
    /// 2. Contrast, sharpen, resize to 200x200
    /// 3. Dither to 1-bit and pack
    /// 4. Save artifacts (optional)
    /// 5. Upload to display
    ///
    /// Nothing is sent to the display unless steps 1-4 all succeed.
    pub async fn process_and_display(&self, bytes: Bytes) -> Result<DisplayReport, ProcessingError> {
        tracing::info!("Starting image processing pipeline ({} bytes)", bytes.len());

        let artifacts = self.artifacts.clone();
        let frame =
            tokio::task::spawn_blocking(move || prepare_frame(&bytes, artifacts.as_ref()))
                .await??;

        let upload = self.device.upload(frame.payload.as_bytes()).await?;

        tracing::info!("Image processing complete");
        Ok(DisplayReport { frame, upload })
    }

    /// Download an image and push it to the display
    ///
    /// Fetch failures are returned before any processing happens.
    pub async fn process_url_and_display(&self, url: &str) -> Result<DisplayReport, ProcessingError> {
        let bytes = self.downloader.download(url).await?;
        self.process_and_display(bytes).await
    }
}
