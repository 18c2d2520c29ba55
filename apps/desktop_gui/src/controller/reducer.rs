//! UI state owned by the egui thread and the transitions applied to it.

use std::path::PathBuf;

use client_core::{
    report::{format_kib, BatchReport, ClassDistribution, SingleReport},
    upload::{partition_supported, upload_filename},
    ConnectionState, Settings, SubmissionError, SubmissionKind, SubmissionTracker,
};
use tracing::{debug, info, warn};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::events::{UiError, UiErrorContext, UiEvent},
    media::PreviewImage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Single,
    Batch,
}

impl Tab {
    pub fn label(self) -> &'static str {
        match self {
            Tab::Single => "Single Image",
            Tab::Batch => "Batch Processing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl SelectedFile {
    pub fn from_path(path: PathBuf) -> Self {
        let size_bytes = std::fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
        Self {
            name: upload_filename(&path),
            path,
            size_bytes,
        }
    }

    pub fn size_text(&self) -> String {
        format_kib(self.size_bytes)
    }
}

/// A rendered single-image result. `view_id` changes whenever the view is replaced.
#[derive(Debug)]
pub struct SingleView {
    pub view_id: u64,
    pub report: SingleReport,
    pub original: Option<PreviewImage>,
    pub annotated: Option<PreviewImage>,
}

#[derive(Debug)]
pub struct BatchView {
    pub view_id: u64,
    pub report: BatchReport,
    pub thumbnails: Vec<Option<PreviewImage>>,
}

/// The one live distribution chart. Replaced, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartInstance {
    pub generation: u64,
    pub distribution: ClassDistribution,
}

#[derive(Debug)]
pub struct AppState {
    pub tab: Tab,
    pub confidence: f32,
    pub single_selection: Option<SelectedFile>,
    pub batch_selection: Vec<SelectedFile>,
    pub connection: ConnectionState,
    pub map_badge: Option<f64>,
    pub alert: Option<UiError>,
    pub status: String,
    single_result: Option<SingleView>,
    batch_result: Option<BatchView>,
    chart: Option<ChartInstance>,
    tracker: SubmissionTracker,
    next_view_id: u64,
    next_chart_generation: u64,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            tab: Tab::default(),
            confidence: settings.default_confidence,
            single_selection: None,
            batch_selection: Vec::new(),
            connection: ConnectionState::Unknown,
            map_badge: None,
            alert: None,
            status: String::new(),
            single_result: None,
            batch_result: None,
            chart: None,
            tracker: SubmissionTracker::default(),
            next_view_id: 0,
            next_chart_generation: 0,
        }
    }

    /// Single mode keeps the first supported file.
    pub fn select_single(&mut self, candidates: Vec<PathBuf>) {
        let (accepted, rejected) = partition_supported(candidates);
        self.note_rejected(&rejected);
        if let Some(path) = accepted.into_iter().next() {
            info!(file = %path.display(), "single image selected");
            self.single_selection = Some(SelectedFile::from_path(path));
        }
    }

    /// Batch mode replaces the selection with every supported file, in order.
    pub fn select_batch(&mut self, candidates: Vec<PathBuf>) {
        let (accepted, rejected) = partition_supported(candidates);
        self.note_rejected(&rejected);
        if !accepted.is_empty() {
            info!(files = accepted.len(), "batch images selected");
            self.batch_selection = accepted.into_iter().map(SelectedFile::from_path).collect();
        }
    }

    fn note_rejected(&mut self, rejected: &[PathBuf]) {
        if rejected.is_empty() {
            return;
        }
        let names: Vec<String> = rejected.iter().map(|path| upload_filename(path)).collect();
        warn!(files = ?names, "ignored unsupported files");
        self.status = format!("Ignored unsupported files: {}", names.join(", "));
    }

    /// Starts a single detection, or raises the precondition alert.
    pub fn begin_single(&mut self) -> Option<BackendCommand> {
        let Some(selection) = &self.single_selection else {
            self.raise_precondition(SubmissionKind::Single, &SubmissionError::NoFileSelected);
            return None;
        };
        let path = selection.path.clone();
        let id = self.tracker.begin(SubmissionKind::Single);
        self.single_result = None;
        Some(BackendCommand::DetectSingle {
            id,
            path,
            confidence: self.confidence,
        })
    }

    pub fn begin_batch(&mut self) -> Option<BackendCommand> {
        if self.batch_selection.is_empty() {
            self.raise_precondition(SubmissionKind::Batch, &SubmissionError::NoFilesSelected);
            return None;
        }
        let paths = self
            .batch_selection
            .iter()
            .map(|file| file.path.clone())
            .collect();
        let id = self.tracker.begin(SubmissionKind::Batch);
        self.batch_result = None;
        self.chart = None;
        Some(BackendCommand::DetectBatch {
            id,
            paths,
            confidence: self.confidence,
        })
    }

    /// Undoes `begin_*` when its command never reached the bridge.
    pub fn abandon(&mut self, kind: SubmissionKind) {
        if let Some(id) = self.tracker.current(kind) {
            self.tracker.settle(kind, id);
        }
    }

    fn raise_precondition(&mut self, kind: SubmissionKind, err: &SubmissionError) {
        self.raise(UiError::from_submission(UiErrorContext::for_kind(kind), err));
    }

    pub fn is_loading(&self, kind: SubmissionKind) -> bool {
        self.tracker.is_in_flight(kind)
    }

    pub fn single_result(&self) -> Option<&SingleView> {
        self.single_result.as_ref()
    }

    pub fn batch_result(&self) -> Option<&BatchView> {
        self.batch_result.as_ref()
    }

    pub fn chart(&self) -> Option<&ChartInstance> {
        self.chart.as_ref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Hides results, resets selections, destroys the chart and the badge.
    /// Anything still in flight becomes stale.
    pub fn clear_results(&mut self) -> BackendCommand {
        self.single_result = None;
        self.batch_result = None;
        self.single_selection = None;
        self.batch_selection.clear();
        self.chart = None;
        self.map_badge = None;
        self.tracker.cancel_all();
        self.status = "Results cleared".to_string();
        info!("results cleared");
        BackendCommand::CancelSubmissions
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => self.status = message,
            UiEvent::Connectivity(state) => {
                if state != self.connection {
                    info!(from = ?self.connection, to = ?state, "connection state changed");
                }
                self.connection = state;
            }
            UiEvent::MapBadge(value) => self.map_badge = Some(value),
            UiEvent::SingleDetected {
                id,
                report,
                original,
                annotated,
            } => {
                if !self.tracker.is_current(SubmissionKind::Single, id) {
                    debug!(id = id.0, "dropping stale single result");
                    return;
                }
                self.status = format!("Detected {} objects", report.detections_count);
                self.single_result = Some(SingleView {
                    view_id: self.issue_view_id(),
                    report,
                    original,
                    annotated,
                });
            }
            UiEvent::BatchDetected {
                id,
                report,
                thumbnails,
            } => {
                if !self.tracker.is_current(SubmissionKind::Batch, id) {
                    debug!(id = id.0, "dropping stale batch result");
                    return;
                }
                self.status = format!(
                    "Processed {} images, {} detections",
                    report.total_images, report.total_detections
                );
                self.chart = Some(ChartInstance {
                    generation: self.issue_chart_generation(),
                    distribution: report.distribution.clone(),
                });
                self.batch_result = Some(BatchView {
                    view_id: self.issue_view_id(),
                    report,
                    thumbnails,
                });
            }
            UiEvent::SubmissionFailed { kind, id, error } => {
                if self.tracker.is_current(kind, id) {
                    self.raise(error);
                } else {
                    debug!(id = id.0, kind = kind.label(), "dropping stale failure");
                }
            }
            UiEvent::SubmissionSettled { kind, id } => {
                self.tracker.settle(kind, id);
            }
            UiEvent::Error(error) => self.raise(error),
        }
    }

    fn raise(&mut self, error: UiError) {
        warn!(
            context = ?error.context(),
            category = ?error.category(),
            "{}",
            error.message()
        );
        self.alert = Some(error);
    }

    fn issue_view_id(&mut self) -> u64 {
        self.next_view_id += 1;
        self.next_view_id
    }

    fn issue_chart_generation(&mut self) -> u64 {
        self.next_chart_generation += 1;
        self.next_chart_generation
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use client_core::ClientError;
    use shared::protocol::{BatchDetectionResponse, SingleDetectionResponse};

    use super::*;
    use crate::controller::events::UiErrorCategory;

    fn state() -> AppState {
        AppState::new(&Settings::default())
    }

    fn single_report() -> SingleReport {
        let response: SingleDetectionResponse = serde_json::from_str(
            r#"{"annotated_image":"/download/a.jpg","detections_count":1,
                "detections":[{"class":"FireAlarm","confidence":0.9,"bbox":[1,2,3,4]}]}"#,
        )
        .expect("single response");
        SingleReport::from_response(&response, Duration::from_millis(500))
    }

    fn batch_report() -> BatchReport {
        let response: BatchDetectionResponse = serde_json::from_str(
            r#"{"total_images":2,"total_detections":3,"avg_detections_per_image":1.5,
                "images":[{"filename":"a.png","detections_count":2,"class_counts":{"OxygenTank":2}},
                          {"filename":"b.png","detections_count":1,"class_counts":{"Mystery":1}}]}"#,
        )
        .expect("batch response");
        BatchReport::from_response(&response, Duration::from_secs(1))
    }

    fn server_error(kind: SubmissionKind) -> UiError {
        UiError::from_submission(
            UiErrorContext::for_kind(kind),
            &SubmissionError::Client(ClientError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
        )
    }

    fn select_single(state: &mut AppState) {
        state.single_selection = Some(SelectedFile {
            path: PathBuf::from("scene.jpg"),
            name: "scene.jpg".to_string(),
            size_bytes: 2048,
        });
    }

    fn select_batch(state: &mut AppState) {
        state.batch_selection = ["a.png", "b.png"]
            .into_iter()
            .map(|name| SelectedFile {
                path: PathBuf::from(name),
                name: name.to_string(),
                size_bytes: 1536,
            })
            .collect();
    }

    fn command_id(cmd: &BackendCommand) -> shared::domain::RequestId {
        match cmd {
            BackendCommand::DetectSingle { id, .. } | BackendCommand::DetectBatch { id, .. } => *id,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn submitting_without_selection_alerts_and_issues_nothing() {
        let mut state = state();
        assert!(state.begin_single().is_none());
        let alert = state.alert.take().expect("alert");
        assert_eq!(alert.category(), UiErrorCategory::Precondition);
        assert_eq!(alert.message(), "Please select an image first!");
        assert!(!state.is_loading(SubmissionKind::Single));

        assert!(state.begin_batch().is_none());
        assert_eq!(
            state.alert.as_ref().map(UiError::message),
            Some("Please select images first!")
        );
        assert!(!state.is_loading(SubmissionKind::Batch));
    }

    #[test]
    fn single_submission_carries_selection_and_threshold() {
        let mut state = state();
        select_single(&mut state);
        state.confidence = 0.4;
        match state.begin_single().expect("command") {
            BackendCommand::DetectSingle {
                path, confidence, ..
            } => {
                assert_eq!(path, PathBuf::from("scene.jpg"));
                assert_eq!(confidence, 0.4);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(state.is_loading(SubmissionKind::Single));
    }

    #[test]
    fn server_error_hides_loading_and_shows_no_result() {
        let mut state = state();
        select_single(&mut state);
        let id = command_id(&state.begin_single().expect("command"));

        state.apply(UiEvent::SubmissionFailed {
            kind: SubmissionKind::Single,
            id,
            error: server_error(SubmissionKind::Single),
        });
        state.apply(UiEvent::SubmissionSettled {
            kind: SubmissionKind::Single,
            id,
        });

        assert!(!state.is_loading(SubmissionKind::Single));
        assert!(state.single_result().is_none());
        assert_eq!(
            state.alert.as_ref().map(UiError::message),
            Some("Server error 500: boom")
        );
    }

    #[test]
    fn new_submission_replaces_previous_result() {
        let mut state = state();
        select_single(&mut state);
        let first = command_id(&state.begin_single().expect("command"));
        state.apply(UiEvent::SingleDetected {
            id: first,
            report: single_report(),
            original: None,
            annotated: None,
        });
        assert!(state.single_result().is_some());

        state.begin_single().expect("command");
        assert!(state.single_result().is_none());
    }

    #[test]
    fn superseded_result_and_settle_are_ignored() {
        let mut state = state();
        select_single(&mut state);
        let stale = command_id(&state.begin_single().expect("command"));
        let fresh = command_id(&state.begin_single().expect("command"));

        state.apply(UiEvent::SingleDetected {
            id: stale,
            report: single_report(),
            original: None,
            annotated: None,
        });
        state.apply(UiEvent::SubmissionSettled {
            kind: SubmissionKind::Single,
            id: stale,
        });
        assert!(state.single_result().is_none());
        assert!(state.is_loading(SubmissionKind::Single));

        state.apply(UiEvent::SingleDetected {
            id: fresh,
            report: single_report(),
            original: None,
            annotated: None,
        });
        assert_eq!(
            state.single_result().map(|view| view.report.detections_count),
            Some(1)
        );
    }

    #[test]
    fn batch_render_builds_chart_in_first_seen_order() {
        let mut state = state();
        select_batch(&mut state);
        let id = command_id(&state.begin_batch().expect("command"));
        state.apply(UiEvent::BatchDetected {
            id,
            report: batch_report(),
            thumbnails: vec![None, None],
        });

        let chart = state.chart().expect("chart");
        let labels: Vec<&str> = chart
            .distribution
            .entries()
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(labels, vec!["OxygenTank", "Mystery"]);
    }

    #[test]
    fn clear_destroys_chart_and_rerender_creates_fresh_instance() {
        let mut state = state();
        select_batch(&mut state);
        let id = command_id(&state.begin_batch().expect("command"));
        state.apply(UiEvent::BatchDetected {
            id,
            report: batch_report(),
            thumbnails: vec![None, None],
        });
        state.apply(UiEvent::MapBadge(80.0));
        let first_generation = state.chart().expect("chart").generation;

        assert!(matches!(
            state.clear_results(),
            BackendCommand::CancelSubmissions
        ));
        assert!(state.chart().is_none());
        assert!(state.batch_result().is_none());
        assert!(state.single_result().is_none());
        assert!(state.batch_selection.is_empty());
        assert!(state.single_selection.is_none());
        assert_eq!(state.map_badge, None);

        select_batch(&mut state);
        let id = command_id(&state.begin_batch().expect("command"));
        state.apply(UiEvent::BatchDetected {
            id,
            report: batch_report(),
            thumbnails: vec![None, None],
        });
        assert!(state.chart().expect("chart").generation > first_generation);
    }

    #[test]
    fn clear_makes_in_flight_results_stale() {
        let mut state = state();
        select_single(&mut state);
        let id = command_id(&state.begin_single().expect("command"));
        state.clear_results();
        assert!(!state.is_loading(SubmissionKind::Single));

        state.apply(UiEvent::SingleDetected {
            id,
            report: single_report(),
            original: None,
            annotated: None,
        });
        assert!(state.single_result().is_none());
    }

    #[test]
    fn abandon_releases_loading_state() {
        let mut state = state();
        select_batch(&mut state);
        state.begin_batch().expect("command");
        state.abandon(SubmissionKind::Batch);
        assert!(!state.is_loading(SubmissionKind::Batch));
    }

    #[test]
    fn unsupported_files_are_skipped_with_status() {
        let mut state = state();
        state.select_batch(vec![
            PathBuf::from("notes.txt"),
            PathBuf::from("a.PNG"),
            PathBuf::from("b.jpg"),
        ]);
        let names: Vec<&str> = state
            .batch_selection
            .iter()
            .map(|file| file.name.as_str())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg"]);
        assert!(state.status.contains("notes.txt"));

        state.select_single(vec![PathBuf::from("x.gif"), PathBuf::from("y.png")]);
        assert_eq!(
            state.single_selection.as_ref().map(|file| file.name.as_str()),
            Some("x.gif")
        );
    }

    #[test]
    fn batch_file_sizes_use_two_decimal_kib() {
        let file = SelectedFile {
            path: PathBuf::from("a.png"),
            name: "a.png".to_string(),
            size_bytes: 1536,
        };
        assert_eq!(file.size_text(), "1.50 KB");
    }
}
