//! Files prepared for multipart upload.

use std::path::{Path, PathBuf};

use crate::error::ClientError;

/// Extensions accepted for interactive selection.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    /// Reads `path`, rejecting files larger than `max_bytes` before loading them.
    pub async fn from_path(path: &Path, max_bytes: u64) -> Result<Self, ClientError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| io_error(path, source))?;
        if metadata.len() > max_bytes {
            return Err(ClientError::FileTooLarge {
                path: path.to_path_buf(),
                size_bytes: metadata.len(),
                limit_bytes: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| io_error(path, source))?;
        Ok(Self::from_bytes(upload_filename(path), bytes))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ClientError {
    ClientError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn upload_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.bin")
        .to_string()
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_IMAGE_EXTENSIONS)
}

/// Splits candidate paths into supported images and rejected paths, keeping order.
pub fn partition_supported(paths: impl IntoIterator<Item = PathBuf>) -> (Vec<PathBuf>, Vec<PathBuf>) {
    paths.into_iter().partition(|path| is_supported_image(path))
}
