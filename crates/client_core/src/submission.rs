//! Single and batch submission flows, plus per-kind supersession tracking.

use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use shared::{
    domain::RequestId,
    protocol::{BatchDetectionResponse, SingleDetectionResponse},
};
use thiserror::Error;
use tracing::info;

use crate::{
    error::ClientError,
    monitor::{probe, ConnectionState},
    upload::UploadFile,
    ClientHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionKind {
    Single,
    Batch,
}

impl SubmissionKind {
    pub fn label(self) -> &'static str {
        match self {
            SubmissionKind::Single => "single",
            SubmissionKind::Batch => "batch",
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Please select an image first!")]
    NoFileSelected,
    #[error("Please select images first!")]
    NoFilesSelected,
    #[error("Backend API is not connected. Please start the backend server.")]
    BackendUnreachable,
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl SubmissionError {
    /// Precondition failures are raised before any upload is attempted.
    pub fn is_precondition(&self) -> bool {
        match self {
            SubmissionError::NoFileSelected
            | SubmissionError::NoFilesSelected
            | SubmissionError::BackendUnreachable => true,
            SubmissionError::Client(err) => matches!(
                err,
                ClientError::Io { .. } | ClientError::FileTooLarge { .. }
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome<T> {
    pub response: T,
    /// Client-side wall clock from request start to parsed body. Display only.
    pub elapsed: Duration,
}

pub async fn submit_single(
    client: &dyn ClientHandle,
    selection: Option<&Path>,
    confidence: f32,
    max_file_bytes: u64,
) -> Result<SubmissionOutcome<SingleDetectionResponse>, SubmissionError> {
    submit_single_checked(client, selection, confidence, max_file_bytes, probe(client)).await
}

/// Like [`submit_single`], with the liveness check supplied by the caller.
/// `preflight` is only awaited once the selection is known to be present.
pub async fn submit_single_checked(
    client: &dyn ClientHandle,
    selection: Option<&Path>,
    confidence: f32,
    max_file_bytes: u64,
    preflight: impl Future<Output = ConnectionState>,
) -> Result<SubmissionOutcome<SingleDetectionResponse>, SubmissionError> {
    let path = selection.ok_or(SubmissionError::NoFileSelected)?;
    ensure_connected(preflight).await?;

    let file = UploadFile::from_path(path, max_file_bytes).await?;
    let started = Instant::now();
    let response = client.predict_single(file, confidence).await?;
    let elapsed = started.elapsed();
    info!(
        detections = response.detections_count,
        elapsed_ms = elapsed.as_millis() as u64,
        "single detection finished"
    );
    Ok(SubmissionOutcome { response, elapsed })
}

pub async fn submit_batch(
    client: &dyn ClientHandle,
    selection: &[PathBuf],
    confidence: f32,
    max_file_bytes: u64,
) -> Result<SubmissionOutcome<BatchDetectionResponse>, SubmissionError> {
    submit_batch_checked(client, selection, confidence, max_file_bytes, probe(client)).await
}

pub async fn submit_batch_checked(
    client: &dyn ClientHandle,
    selection: &[PathBuf],
    confidence: f32,
    max_file_bytes: u64,
    preflight: impl Future<Output = ConnectionState>,
) -> Result<SubmissionOutcome<BatchDetectionResponse>, SubmissionError> {
    if selection.is_empty() {
        return Err(SubmissionError::NoFilesSelected);
    }
    ensure_connected(preflight).await?;

    let mut files = Vec::with_capacity(selection.len());
    for path in selection {
        files.push(UploadFile::from_path(path, max_file_bytes).await?);
    }
    let started = Instant::now();
    let response = client.predict_batch(files, confidence).await?;
    let elapsed = started.elapsed();
    info!(
        images = response.total_images,
        detections = response.total_detections,
        elapsed_ms = elapsed.as_millis() as u64,
        "batch detection finished"
    );
    Ok(SubmissionOutcome { response, elapsed })
}

async fn ensure_connected(
    preflight: impl Future<Output = ConnectionState>,
) -> Result<(), SubmissionError> {
    if preflight.await.is_connected() {
        Ok(())
    } else {
        Err(SubmissionError::BackendUnreachable)
    }
}

/// Issues request ids per submission kind. A newer id supersedes the older
/// one of the same kind; results and settle notices for stale ids are dropped.
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    last_issued: u64,
    current: HashMap<SubmissionKind, RequestId>,
}

impl SubmissionTracker {
    pub fn begin(&mut self, kind: SubmissionKind) -> RequestId {
        self.last_issued += 1;
        let id = RequestId(self.last_issued);
        if let Some(previous) = self.current.insert(kind, id) {
            info!(kind = kind.label(), superseded = previous.0, by = id.0, "submission superseded");
        }
        id
    }

    pub fn is_current(&self, kind: SubmissionKind, id: RequestId) -> bool {
        self.current.get(&kind) == Some(&id)
    }

    /// Marks `id` finished. Returns false when it was already superseded.
    pub fn settle(&mut self, kind: SubmissionKind, id: RequestId) -> bool {
        if self.is_current(kind, id) {
            self.current.remove(&kind);
            true
        } else {
            false
        }
    }

    pub fn current(&self, kind: SubmissionKind) -> Option<RequestId> {
        self.current.get(&kind).copied()
    }

    pub fn is_in_flight(&self, kind: SubmissionKind) -> bool {
        self.current.contains_key(&kind)
    }

    /// Forgets every in-flight id, so anything still running becomes stale.
    pub fn cancel_all(&mut self) {
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_submission_supersedes_older_of_same_kind() {
        let mut tracker = SubmissionTracker::default();
        let first = tracker.begin(SubmissionKind::Single);
        let second = tracker.begin(SubmissionKind::Single);

        assert!(!tracker.is_current(SubmissionKind::Single, first));
        assert!(!tracker.settle(SubmissionKind::Single, first));
        assert!(tracker.is_in_flight(SubmissionKind::Single));
        assert!(tracker.settle(SubmissionKind::Single, second));
        assert!(!tracker.is_in_flight(SubmissionKind::Single));
    }

    #[test]
    fn kinds_are_tracked_independently() {
        let mut tracker = SubmissionTracker::default();
        let single = tracker.begin(SubmissionKind::Single);
        let batch = tracker.begin(SubmissionKind::Batch);
        assert_ne!(single, batch);
        assert!(tracker.is_current(SubmissionKind::Single, single));
        assert!(!tracker.is_current(SubmissionKind::Batch, single));

        assert!(tracker.settle(SubmissionKind::Batch, batch));
        assert!(tracker.is_in_flight(SubmissionKind::Single));
        assert!(!tracker.is_in_flight(SubmissionKind::Batch));
    }

    #[test]
    fn cancel_all_makes_everything_stale() {
        let mut tracker = SubmissionTracker::default();
        let single = tracker.begin(SubmissionKind::Single);
        tracker.cancel_all();
        assert!(!tracker.settle(SubmissionKind::Single, single));
        assert_eq!(tracker.current(SubmissionKind::Single), None);
    }

    #[test]
    fn precondition_classification() {
        assert!(SubmissionError::NoFileSelected.is_precondition());
        assert!(SubmissionError::BackendUnreachable.is_precondition());
        assert!(!SubmissionError::Client(ClientError::Status {
            status: 500,
            body: String::new()
        })
        .is_precondition());
    }
}
