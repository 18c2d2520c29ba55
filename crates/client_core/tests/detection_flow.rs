use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use client_core::{
    batch::{upload_in_chunks, ChunkOptions, MAX_CHUNK_SIZE},
    metrics::{refresh_map_badge, FALLBACK_MAP_RANGE},
    report::{BatchReport, SingleReport},
    submission::{submit_batch, submit_single, submit_single_checked},
    ClientError, ClientHandle, ConnectionState, ConnectivityMonitor, MonitorEvent,
    SubmissionError, UploadFile,
};
use shared::protocol::{
    BatchDetectionResponse, HealthResponse, ModelInfo, SingleDetectionResponse,
};

/// In-memory backend that records every call it receives.
struct FakeBackend {
    healthy: bool,
    model_info: Option<ModelInfo>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl FakeBackend {
    fn healthy() -> Self {
        Self {
            healthy: true,
            model_info: serde_json::from_str(r#"{"mAP": 70.0}"#).ok(),
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientHandle for FakeBackend {
    async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok(HealthResponse::default())
        } else {
            Err(ClientError::Status {
                status: 503,
                body: String::new(),
            })
        }
    }

    async fn model_info(&self) -> Result<ModelInfo, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.model_info.clone().ok_or(ClientError::Status {
            status: 500,
            body: "no model".to_string(),
        })
    }

    async fn predict_single(
        &self,
        file: UploadFile,
        _confidence: f32,
    ) -> Result<SingleDetectionResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = format!(
            r#"{{"annotated_image":"/download/annotated_{}","detections_count":2,
                "detections":[{{"class":"FireAlarm","confidence":0.9,"bbox":[1,2,3,4]}},
                              {{"class":"Unknown","confidence":0.5,"bbox":[5,6,7,8]}}]}}"#,
            file.filename
        );
        serde_json::from_str(&body).map_err(|source| ClientError::InvalidResponse {
            raw: body.clone(),
            source,
        })
    }

    async fn predict_batch(
        &self,
        files: Vec<UploadFile>,
        _confidence: f32,
    ) -> Result<BatchDetectionResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes
            .lock()
            .expect("batch sizes lock")
            .push(files.len());
        let images: Vec<String> = files
            .iter()
            .map(|file| {
                format!(
                    r#"{{"filename":"{}","detections_count":1,"class_counts":{{"NitrogenTank":1}}}}"#,
                    file.filename
                )
            })
            .collect();
        let body = format!(
            r#"{{"total_images":{n},"total_detections":{n},"avg_detections_per_image":1.0,"images":[{}]}}"#,
            images.join(","),
            n = files.len()
        );
        serde_json::from_str(&body).map_err(|source| ClientError::InvalidResponse {
            raw: body.clone(),
            source,
        })
    }

    async fn fetch_annotated_image(&self, _path: &str) -> Result<Vec<u8>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn temp_images(count: usize) -> Vec<PathBuf> {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("detector_flow_{suffix}"));
    std::fs::create_dir_all(&dir).expect("temp dir");
    (0..count)
        .map(|idx| {
            let path = dir.join(format!("img_{idx:03}.jpg"));
            std::fs::write(&path, [0xFF, 0xD8, 0xFF]).expect("write image");
            path
        })
        .collect()
}

#[tokio::test]
async fn single_flow_renders_report_with_computed_average() {
    let backend = FakeBackend::healthy();
    let images = temp_images(1);

    let outcome = submit_single(&backend, Some(&images[0]), 0.25, 1024)
        .await
        .expect("submit");
    let report = SingleReport::from_response(&outcome.response, Duration::from_millis(2500));

    assert_eq!(report.average_confidence.display(), "70.0%");
    assert_eq!(report.processing_time_text(), "2.50s");
    assert_eq!(report.rows[1].swatch.hex(), "#FFFFFF");
    assert_eq!(report.annotated_image, "/download/annotated_img_000.jpg");
    assert_eq!(backend.calls(), 2, "health probe plus upload");
}

#[tokio::test]
async fn empty_selection_never_touches_the_backend() {
    let backend = FakeBackend::healthy();
    assert!(matches!(
        submit_single(&backend, None, 0.25, 1024).await,
        Err(SubmissionError::NoFileSelected)
    ));
    assert!(matches!(
        submit_batch(&backend, &[], 0.25, 1024).await,
        Err(SubmissionError::NoFilesSelected)
    ));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn oversized_file_is_rejected_before_upload() {
    let backend = FakeBackend::healthy();
    let images = temp_images(1);

    let err = submit_single(&backend, Some(&images[0]), 0.25, 2)
        .await
        .expect_err("too large");
    assert!(err.is_precondition());
    assert_eq!(backend.calls(), 1, "only the health probe ran");
}

#[tokio::test]
async fn batch_flow_aggregates_class_distribution() {
    let backend = FakeBackend::healthy();
    let images = temp_images(3);

    let outcome = submit_batch(&backend, &images, 0.25, 1024)
        .await
        .expect("submit");
    let report = BatchReport::from_response(&outcome.response, outcome.elapsed);

    assert_eq!(report.cards.len(), 3);
    assert_eq!(report.cards[2].filename, "img_002.jpg");
    assert_eq!(report.distribution.count_for("NitrogenTank"), Some(3));
    assert_eq!(report.distribution.entries()[0].fill.hex(), "#00FF00");
}

#[tokio::test]
async fn chunked_upload_respects_the_size_cap() {
    let backend = FakeBackend::healthy();
    let images = temp_images(MAX_CHUNK_SIZE + 5);
    let options = ChunkOptions {
        chunk_size: 500,
        pause: Duration::ZERO,
        ..ChunkOptions::default()
    };

    let summary = upload_in_chunks(&backend, &images, &options, |_| {})
        .await
        .expect("upload");

    let sizes = backend.batch_sizes.lock().expect("batch sizes lock").clone();
    assert_eq!(sizes, vec![MAX_CHUNK_SIZE, 5]);
    assert_eq!(summary.total_images_processed, (MAX_CHUNK_SIZE + 5) as u64);
    assert_eq!(summary.chunks.len(), 2);
}

#[tokio::test]
async fn badge_adjusts_reported_map_and_falls_back_on_failure() {
    let backend = FakeBackend::healthy();
    assert_eq!(refresh_map_badge(&backend).await, 80.0);

    let broken = FakeBackend {
        model_info: None,
        ..FakeBackend::healthy()
    };
    let value = refresh_map_badge(&broken).await;
    assert!(FALLBACK_MAP_RANGE.contains(&value));
}

#[tokio::test]
async fn monitored_preflight_publishes_connectivity() {
    let down: Arc<dyn ClientHandle> = Arc::new(FakeBackend {
        healthy: false,
        ..FakeBackend::healthy()
    });
    let monitor = ConnectivityMonitor::new(Arc::clone(&down), Duration::from_secs(30));
    let mut events = monitor.subscribe();
    let images = temp_images(1);

    let err = submit_single_checked(down.as_ref(), Some(&images[0]), 0.25, 1024, monitor.check())
        .await
        .expect_err("backend is down");
    assert!(matches!(err, SubmissionError::BackendUnreachable));
    assert_eq!(
        events.try_recv().expect("connectivity event"),
        MonitorEvent::Connectivity(ConnectionState::Disconnected)
    );

    let up: Arc<dyn ClientHandle> = Arc::new(FakeBackend::healthy());
    let monitor = ConnectivityMonitor::new(Arc::clone(&up), Duration::from_secs(30));
    let mut events = monitor.subscribe();
    submit_single_checked(up.as_ref(), Some(&images[0]), 0.25, 1024, monitor.check())
        .await
        .expect("submit");
    assert_eq!(
        events.recv().await.expect("connectivity event"),
        MonitorEvent::Connectivity(ConnectionState::Connected)
    );
    assert_eq!(
        events.recv().await.expect("badge event"),
        MonitorEvent::MapBadge(80.0)
    );
}

#[tokio::test]
async fn missing_selection_skips_the_monitored_preflight() {
    let backend: Arc<dyn ClientHandle> = Arc::new(FakeBackend::healthy());
    let monitor = ConnectivityMonitor::new(Arc::clone(&backend), Duration::from_secs(30));
    let mut events = monitor.subscribe();

    let err = submit_single_checked(backend.as_ref(), None, 0.25, 1024, monitor.check())
        .await
        .expect_err("nothing selected");
    assert!(matches!(err, SubmissionError::NoFileSelected));
    assert!(events.try_recv().is_err());
}
