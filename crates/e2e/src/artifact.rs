//! Screenshot artifact inspection

use std::path::{Path, PathBuf};

use image::{GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// A screenshot that was written and decoded successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotArtifact {
    pub path: PathBuf,

    /// Size on disk
    pub bytes: u64,

    pub width: u32,
    pub height: u32,

    /// Detected image format, e.g. "png"
    pub format: String,

    /// SHA256 of the file contents
    pub sha256: String,
}

/// Check that `path` holds a non-empty, decodable image
pub fn inspect(path: &Path) -> E2eResult<ScreenshotArtifact> {
    let invalid = |reason: String| E2eError::InvalidArtifact {
        path: path.to_path_buf(),
        reason,
    };

    let data = std::fs::read(path).map_err(|e| E2eError::ArtifactWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if data.is_empty() {
        return Err(invalid("file is empty".to_string()));
    }

    let format = image::guess_format(&data).map_err(|e| invalid(e.to_string()))?;
    let img = image::load_from_memory_with_format(&data, format).map_err(|e| invalid(e.to_string()))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(invalid(format!("image has no pixels ({}x{})", width, height)));
    }

    debug!("Screenshot {} is {}x{} {:?}", path.display(), width, height, format);

    Ok(ScreenshotArtifact {
        path: path.to_path_buf(),
        bytes: data.len() as u64,
        width,
        height,
        format: format_name(format),
        sha256: hash_bytes(&data),
    })
}

fn format_name(format: ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| format!("{:?}", format).to_lowercase())
}

/// Hash bytes using SHA256
fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
