//! Robust image loading.
//!
//! Direct decoding goes through `image::open`; when that fails on a readable
//! file the raw bytes are re-read and decoded from memory, which sidesteps
//! path-resolution quirks seen on some platforms. A file the process cannot
//! read is a hard error; bytes that simply are not an image are not — the
//! caller treats "no image" as "zero items".

use image::DynamicImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "Cannot read {path}: {source}. Copy the file to a readable location \
         (e.g. the working directory) and retry."
    )]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load and decode an image file.
///
/// Returns `Ok(None)` when the bytes decode to no image (corrupt or
/// unsupported data) and `Err(LoadError::FileAccess)` when the file itself
/// cannot be read.
pub fn load_image(path: &Path) -> Result<Option<DynamicImage>, LoadError> {
    match image::open(path) {
        Ok(img) => return Ok(Some(img)),
        Err(image::ImageError::IoError(e))
            if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) =>
        {
            return Err(LoadError::FileAccess { path: path.to_path_buf(), source: e });
        }
        Err(e) => {
            tracing::debug!("direct decode of {} failed ({e}), retrying from memory", path.display());
        }
    }

    // Fallback: read the raw bytes ourselves and decode in memory.
    let bytes = std::fs::read(path)
        .map_err(|e| LoadError::FileAccess { path: path.to_path_buf(), source: e })?;
    Ok(load_image_from_bytes(&bytes))
}

/// Decode an in-memory byte buffer; `None` when the bytes are not an image.
pub fn load_image_from_bytes(data: &[u8]) -> Option<DynamicImage> {
    image::load_from_memory(data).ok()
}
