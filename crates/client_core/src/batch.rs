//! Chunked batch uploads for large image collections.
//!
//! The backend caps the number of multipart fields per request, so large
//! directories are sent as a sequence of `/predict/batch` calls and the
//! per-chunk totals are aggregated client-side.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use shared::protocol::BatchDetectionResponse;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{error::ClientError, upload::has_extension, upload::UploadFile, ClientHandle};

pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const MAX_CHUNK_SIZE: usize = 100;
pub const CHUNK_PAUSE: Duration = Duration::from_secs(1);
/// Extensions picked up when scanning a directory.
pub const SCAN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Recursively collects image files under `dir`, sorted by path. Symlinked
/// directories are not descended into.
pub fn collect_image_files(dir: &Path) -> Result<Vec<PathBuf>, ClientError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|err| ClientError::Io {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.to_path_buf()),
            source: err.into(),
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), SCAN_EXTENSIONS) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Clamps a requested chunk size into `1..=MAX_CHUNK_SIZE`.
pub fn effective_chunk_size(requested: usize) -> usize {
    if requested > MAX_CHUNK_SIZE {
        warn!(
            requested,
            max = MAX_CHUNK_SIZE,
            "chunk size reduced to the backend form-field limit"
        );
        MAX_CHUNK_SIZE
    } else {
        requested.max(1)
    }
}

#[derive(Debug, Clone)]
pub struct ChunkOptions {
    pub confidence: f32,
    pub chunk_size: usize,
    pub pause: Duration,
    pub max_file_bytes: u64,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            confidence: 0.25,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pause: CHUNK_PAUSE,
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSummary {
    pub chunk_number: usize,
    pub images_processed: u32,
    pub detections: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkedUploadSummary {
    pub total_images_processed: u64,
    pub total_detections: u64,
    pub chunks: Vec<ChunkSummary>,
}

impl ChunkedUploadSummary {
    pub fn avg_detections_per_image(&self) -> f64 {
        self.total_detections as f64 / self.total_images_processed.max(1) as f64
    }

    fn record(&mut self, chunk_number: usize, response: &BatchDetectionResponse) {
        self.total_images_processed += u64::from(response.total_images);
        self.total_detections += u64::from(response.total_detections);
        self.chunks.push(ChunkSummary {
            chunk_number,
            images_processed: response.total_images,
            detections: response.total_detections,
        });
    }
}

/// Progress notice handed to the caller after each successful chunk.
#[derive(Debug)]
pub struct ChunkReport<'a> {
    pub chunk_number: usize,
    pub chunk_count: usize,
    pub skipped_files: &'a [PathBuf],
    pub response: &'a BatchDetectionResponse,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
#[error("chunk {chunk_number}/{chunk_count} failed: {source}")]
pub struct ChunkedUploadError {
    pub chunk_number: usize,
    pub chunk_count: usize,
    #[source]
    pub source: ClientError,
}

/// Uploads `files` chunk by chunk, stopping at the first failing chunk.
///
/// Files that cannot be read are skipped with a warning; a chunk left with no
/// readable files is skipped entirely.
pub async fn upload_in_chunks(
    client: &dyn ClientHandle,
    files: &[PathBuf],
    options: &ChunkOptions,
    mut on_chunk: impl FnMut(ChunkReport<'_>),
) -> Result<ChunkedUploadSummary, ChunkedUploadError> {
    let chunk_size = effective_chunk_size(options.chunk_size);
    let chunk_count = files.len().div_ceil(chunk_size);
    let mut summary = ChunkedUploadSummary::default();

    for (chunk_idx, chunk) in files.chunks(chunk_size).enumerate() {
        let chunk_number = chunk_idx + 1;
        let mut uploads = Vec::with_capacity(chunk.len());
        let mut skipped = Vec::new();
        for path in chunk {
            match UploadFile::from_path(path, options.max_file_bytes).await {
                Ok(file) => uploads.push(file),
                Err(err) => {
                    warn!(chunk = chunk_number, "skipping file: {err}");
                    skipped.push(path.clone());
                }
            }
        }

        if uploads.is_empty() {
            warn!(chunk = chunk_number, "no readable files in chunk");
            continue;
        }

        info!(
            chunk = chunk_number,
            chunk_count,
            files = uploads.len(),
            "uploading chunk"
        );
        let started = Instant::now();
        let response = client
            .predict_batch(uploads, options.confidence)
            .await
            .map_err(|source| ChunkedUploadError {
                chunk_number,
                chunk_count,
                source,
            })?;
        let elapsed = started.elapsed();

        summary.record(chunk_number, &response);
        on_chunk(ChunkReport {
            chunk_number,
            chunk_count,
            skipped_files: &skipped,
            response: &response,
            elapsed,
        });

        if chunk_number < chunk_count && !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }
    }

    Ok(summary)
}
