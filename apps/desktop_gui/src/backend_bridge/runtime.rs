//! Runtime bridge between UI command queue and backend event intake.

use std::{collections::HashMap, path::PathBuf, sync::Arc, thread};

use client_core::{
    metrics::refresh_map_badge,
    report::{BatchReport, SingleReport},
    submission::{submit_batch_checked, submit_single_checked},
    ClientHandle, ConnectivityMonitor, DetectionClient, MonitorEvent, Settings, SubmissionKind,
};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::RequestId;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::events::{UiError, UiErrorCategory, UiErrorContext, UiEvent},
    media::{load_preview, PREVIEW_MAX_DIMENSION, THUMBNAIL_MAX_DIMENSION},
};

/// Reports its submission as settled when dropped, whether the task
/// finished, failed or was aborted.
struct LoadingGuard {
    kind: SubmissionKind,
    id: RequestId,
    ui_tx: Sender<UiEvent>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let settled = UiEvent::SubmissionSettled {
            kind: self.kind,
            id: self.id,
        };
        if let Err(err) = self.ui_tx.try_send(settled) {
            warn!(
                kind = self.kind.label(),
                id = self.id.0,
                "settle notice dropped; ui event queue unavailable: {err}"
            );
        }
    }
}

struct Bridge {
    client: Arc<dyn ClientHandle>,
    monitor: Arc<ConnectivityMonitor>,
    ui_tx: Sender<UiEvent>,
    max_file_bytes: u64,
    in_flight: HashMap<SubmissionKind, JoinHandle<()>>,
}

pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                send_startup_error(&ui_tx, format!("failed to build backend runtime: {err}"));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = match DetectionClient::from_settings(&settings) {
                Ok(client) => Arc::new(client) as Arc<dyn ClientHandle>,
                Err(err) => {
                    send_startup_error(&ui_tx, format!("invalid backend configuration: {err}"));
                    error!("failed to construct detection client: {err}");
                    return;
                }
            };

            let monitor = ConnectivityMonitor::new(
                Arc::clone(&client),
                settings.health_poll_interval(),
            );
            forward_monitor_events(&monitor, ui_tx.clone());
            let _poller = monitor.spawn();
            info!(
                api = %settings.api_base_url,
                interval_secs = monitor.interval().as_secs(),
                "backend worker ready"
            );
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Using detection API at {}",
                settings.api_base_url
            )));

            let mut bridge = Bridge {
                client,
                monitor,
                ui_tx,
                max_file_bytes: settings.max_file_bytes(),
                in_flight: HashMap::new(),
            };
            while let Ok(cmd) = cmd_rx.recv() {
                bridge.handle(cmd);
            }
            bridge.cancel_all();
            info!("ui command queue closed; backend worker exiting");
        });
    });
}

fn send_startup_error(ui_tx: &Sender<UiEvent>, message: String) {
    let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
        UiErrorCategory::Unknown,
        UiErrorContext::BackendStartup,
        format!("backend worker startup failure: {message}"),
    )));
}

fn forward_monitor_events(monitor: &Arc<ConnectivityMonitor>, ui_tx: Sender<UiEvent>) {
    let mut events = monitor.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(MonitorEvent::Connectivity(state)) => UiEvent::Connectivity(state),
                Ok(MonitorEvent::MapBadge(value)) => UiEvent::MapBadge(value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "monitor events lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if ui_tx.try_send(event).is_err() {
                warn!("ui event queue unavailable; dropping monitor event");
            }
        }
    });
}

impl Bridge {
    fn handle(&mut self, cmd: BackendCommand) {
        debug!(command = cmd.name(), "handling ui command");
        match cmd {
            BackendCommand::CheckHealth => {
                let monitor = Arc::clone(&self.monitor);
                tokio::spawn(async move {
                    monitor.check().await;
                });
            }
            BackendCommand::DetectSingle {
                id,
                path,
                confidence,
            } => {
                let guard = self.guard(SubmissionKind::Single, id);
                let task = tokio::spawn(run_single(
                    Arc::clone(&self.client),
                    Arc::clone(&self.monitor),
                    guard,
                    path,
                    confidence,
                    self.max_file_bytes,
                ));
                self.track(SubmissionKind::Single, task);
            }
            BackendCommand::DetectBatch {
                id,
                paths,
                confidence,
            } => {
                let guard = self.guard(SubmissionKind::Batch, id);
                let task = tokio::spawn(run_batch(
                    Arc::clone(&self.client),
                    Arc::clone(&self.monitor),
                    guard,
                    paths,
                    confidence,
                    self.max_file_bytes,
                ));
                self.track(SubmissionKind::Batch, task);
            }
            BackendCommand::CancelSubmissions => self.cancel_all(),
        }
    }

    fn guard(&self, kind: SubmissionKind, id: RequestId) -> LoadingGuard {
        LoadingGuard {
            kind,
            id,
            ui_tx: self.ui_tx.clone(),
        }
    }

    /// Aborts the previous task of the same kind; its result would be stale.
    fn track(&mut self, kind: SubmissionKind, task: JoinHandle<()>) {
        if let Some(previous) = self.in_flight.insert(kind, task) {
            if !previous.is_finished() {
                info!(kind = kind.label(), "aborting superseded submission");
                previous.abort();
            }
        }
    }

    fn cancel_all(&mut self) {
        for (kind, task) in self.in_flight.drain() {
            if !task.is_finished() {
                info!(kind = kind.label(), "aborting submission");
                task.abort();
            }
        }
    }
}

async fn run_single(
    client: Arc<dyn ClientHandle>,
    monitor: Arc<ConnectivityMonitor>,
    guard: LoadingGuard,
    path: PathBuf,
    confidence: f32,
    max_file_bytes: u64,
) {
    let outcome = match submit_single_checked(
        client.as_ref(),
        Some(&path),
        confidence,
        max_file_bytes,
        monitor.check(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(id = guard.id.0, "single detection failed: {err}");
            let error = UiError::from_submission(UiErrorContext::SingleDetection, &err);
            send_failure(&guard, error);
            return;
        }
    };
    let report = SingleReport::from_response(&outcome.response, outcome.elapsed);

    let original = match load_preview(&path, PREVIEW_MAX_DIMENSION).await {
        Ok(preview) => Some(preview),
        Err(err) => {
            warn!("original image preview unavailable: {err:#}");
            None
        }
    };
    let annotated = match client.fetch_annotated_image(&report.annotated_image).await {
        Ok(bytes) => match crate::media::decode_preview(&bytes, PREVIEW_MAX_DIMENSION) {
            Ok(preview) => Some(preview),
            Err(err) => {
                warn!("annotated image could not be decoded: {err:#}");
                None
            }
        },
        Err(err) => {
            warn!("annotated image download failed: {err}");
            None
        }
    };

    let ui_tx = guard.ui_tx.clone();
    let _ = ui_tx.try_send(UiEvent::SingleDetected {
        id: guard.id,
        report,
        original,
        annotated,
    });
    drop(guard);
    refresh_badge(client.as_ref(), &ui_tx).await;
}

async fn run_batch(
    client: Arc<dyn ClientHandle>,
    monitor: Arc<ConnectivityMonitor>,
    guard: LoadingGuard,
    paths: Vec<PathBuf>,
    confidence: f32,
    max_file_bytes: u64,
) {
    let outcome = match submit_batch_checked(
        client.as_ref(),
        &paths,
        confidence,
        max_file_bytes,
        monitor.check(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(id = guard.id.0, "batch detection failed: {err}");
            let error = UiError::from_submission(UiErrorContext::BatchDetection, &err);
            send_failure(&guard, error);
            return;
        }
    };
    let report = BatchReport::from_response(&outcome.response, outcome.elapsed);

    let mut thumbnails = Vec::with_capacity(paths.len());
    for path in &paths {
        match load_preview(path, THUMBNAIL_MAX_DIMENSION).await {
            Ok(preview) => thumbnails.push(Some(preview)),
            Err(err) => {
                warn!("thumbnail unavailable: {err:#}");
                thumbnails.push(None);
            }
        }
    }

    let ui_tx = guard.ui_tx.clone();
    let _ = ui_tx.try_send(UiEvent::BatchDetected {
        id: guard.id,
        report,
        thumbnails,
    });
    drop(guard);
    refresh_badge(client.as_ref(), &ui_tx).await;
}

fn send_failure(guard: &LoadingGuard, error: UiError) {
    let _ = guard.ui_tx.try_send(UiEvent::SubmissionFailed {
        kind: guard.kind,
        id: guard.id,
        error,
    });
}

async fn refresh_badge(client: &dyn ClientHandle, ui_tx: &Sender<UiEvent>) {
    let value = refresh_map_badge(client).await;
    let _ = ui_tx.try_send(UiEvent::MapBadge(value));
}
