//! UI/backend events and error modeling for desktop GUI controller.

use client_core::{
    report::{BatchReport, SingleReport},
    ClientError, ConnectionState, SubmissionError, SubmissionKind,
};
use shared::{domain::RequestId, error::detail_message};

use crate::media::PreviewImage;

pub enum UiEvent {
    Info(String),
    Connectivity(ConnectionState),
    MapBadge(f64),
    SingleDetected {
        id: RequestId,
        report: SingleReport,
        original: Option<PreviewImage>,
        annotated: Option<PreviewImage>,
    },
    BatchDetected {
        id: RequestId,
        report: BatchReport,
        /// One entry per submitted file, in selection order.
        thumbnails: Vec<Option<PreviewImage>>,
    },
    SubmissionFailed {
        kind: SubmissionKind,
        id: RequestId,
        error: UiError,
    },
    /// Sent exactly once per submission task, including aborted ones.
    SubmissionSettled {
        kind: SubmissionKind,
        id: RequestId,
    },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Connectivity,
    Precondition,
    Server,
    InvalidResponse,
    Unknown,
}

impl UiErrorCategory {
    pub fn title(self) -> &'static str {
        match self {
            UiErrorCategory::Connectivity => "Connection problem",
            UiErrorCategory::Precondition => "Cannot submit",
            UiErrorCategory::Server => "Server error",
            UiErrorCategory::InvalidResponse => "Invalid response",
            UiErrorCategory::Unknown => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    SingleDetection,
    BatchDetection,
}

impl UiErrorContext {
    pub fn for_kind(kind: SubmissionKind) -> Self {
        match kind {
            SubmissionKind::Single => UiErrorContext::SingleDetection,
            SubmissionKind::Batch => UiErrorContext::BatchDetection,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
    detail: Option<String>,
}

impl UiError {
    pub fn new(
        category: UiErrorCategory,
        context: UiErrorContext,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            context,
            message: message.into(),
            detail: None,
        }
    }

    pub fn from_submission(context: UiErrorContext, err: &SubmissionError) -> Self {
        let category = match err {
            SubmissionError::Client(client) if !err.is_precondition() => classify_client(client),
            _ => UiErrorCategory::Precondition,
        };
        let detail = match err {
            SubmissionError::Client(ClientError::Status { body, .. }) => detail_message(body),
            _ => None,
        };
        Self {
            category,
            context,
            message: err.to_string(),
            detail,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    /// Shown verbatim in the alert, e.g. `Server error 500: {"detail":"..."}`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The backend's `detail` text, when the error body carried one.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

fn classify_client(err: &ClientError) -> UiErrorCategory {
    match err {
        ClientError::Transport(_) => UiErrorCategory::Connectivity,
        ClientError::Status { .. } => UiErrorCategory::Server,
        ClientError::InvalidResponse { .. } => UiErrorCategory::InvalidResponse,
        ClientError::Io { .. } | ClientError::FileTooLarge { .. } => UiErrorCategory::Precondition,
        ClientError::InvalidUrl { .. } => UiErrorCategory::Unknown,
    }
}
