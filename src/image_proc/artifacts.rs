//! Audit copies of transcoded frames.
//!
//! For every processed image three files are written to the output
//! directory: the rendered monochrome image, the hex array text and the
//! raw payload. They are never read back.

use super::bitmap::MonochromeBitmap;
use super::encode::{to_hex_array, DeviceUploadPayload};
use image::ImageFormat;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Hex array file name
pub const C_ARRAY_FILE: &str = "IMG_0001.h";

/// Raw payload file name
pub const BIN_FILE: &str = "IMG_0001.bin";

/// Per-process save counter, keeps file names unique within one second
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Artifact errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode rendered image: {0}")]
    Image(#[from] image::ImageError),
}

/// Paths of the files written for one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedArtifacts {
    pub image_path: PathBuf,
    pub c_array_path: PathBuf,
    pub bin_path: PathBuf,
}

/// Writes audit artifacts into a directory
///
/// Safe to share between concurrent requests: every temp file is unique
/// and the fixed-name `.h`/`.bin` pair is replaced under one lock, so the
/// two always describe the same frame.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    pair_lock: Arc<Mutex<()>>,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            pair_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Save the rendered frame, its hex array and the payload
    pub fn save(
        &self,
        bitmap: &MonochromeBitmap,
        payload: &DeviceUploadPayload,
    ) -> Result<SavedArtifacts, ArtifactError> {
        std::fs::create_dir_all(&self.dir)?;

        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let image_path = self
            .dir
            .join(format!("processed_{}_{:04}.png", timestamp, seq));
        let c_array_path = self.dir.join(C_ARRAY_FILE);
        let bin_path = self.dir.join(BIN_FILE);

        let image_tmp = temp_path(&image_path, seq);
        if let Err(e) = bitmap
            .to_gray_image()
            .save_with_format(&image_tmp, ImageFormat::Png)
        {
            let _ = std::fs::remove_file(&image_tmp);
            return Err(e.into());
        }
        commit(&image_tmp, &image_path)?;

        let c_array = to_hex_array(payload.as_bytes());
        let c_array_tmp = temp_path(&c_array_path, seq);
        let bin_tmp = temp_path(&bin_path, seq);
        write_temp(&c_array_tmp, c_array.as_bytes())?;
        write_temp(&bin_tmp, payload.as_bytes()).inspect_err(|_| {
            let _ = std::fs::remove_file(&c_array_tmp);
        })?;

        {
            // Guards no data, so a poisoned lock is still usable
            let _guard = self
                .pair_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            commit(&c_array_tmp, &c_array_path).inspect_err(|_| {
                let _ = std::fs::remove_file(&bin_tmp);
            })?;
            commit(&bin_tmp, &bin_path)?;
        }

        tracing::info!("Saved artifacts to {}", self.dir.display());

        Ok(SavedArtifacts {
            image_path,
            c_array_path,
            bin_path,
        })
    }
}

/// Unique sibling temp file for `path`
fn temp_path(path: &Path, seq: u64) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.{}.tmp", std::process::id(), seq));
    PathBuf::from(name)
}

fn write_temp(tmp_path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(tmp_path, contents).inspect_err(|_| {
        let _ = std::fs::remove_file(tmp_path);
    })
}

/// Rename a finished temp file over its target so readers never see a
/// partial file
fn commit(tmp_path: &Path, path: &Path) -> std::io::Result<()> {
    std::fs::rename(tmp_path, path).inspect_err(|_| {
        let _ = std::fs::remove_file(tmp_path);
    })
}
