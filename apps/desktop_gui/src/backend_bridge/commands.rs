//! Backend commands queued from UI to backend worker.

use shared::domain::RequestId;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BackendCommand {
    CheckHealth,
    DetectSingle {
        id: RequestId,
        path: PathBuf,
        confidence: f32,
    },
    DetectBatch {
        id: RequestId,
        paths: Vec<PathBuf>,
        confidence: f32,
    },
    /// Aborts every in-flight submission task.
    CancelSubmissions,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::CheckHealth => "check_health",
            BackendCommand::DetectSingle { .. } => "detect_single",
            BackendCommand::DetectBatch { .. } => "detect_batch",
            BackendCommand::CancelSubmissions => "cancel_submissions",
        }
    }
}
