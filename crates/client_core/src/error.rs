use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to reach detection backend: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid JSON response from server: {raw}")]
    InvalidResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{}' is {size_bytes} bytes, above the {limit_bytes} byte upload limit", path.display())]
    FileTooLarge {
        path: PathBuf,
        size_bytes: u64,
        limit_bytes: u64,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(err) if err.status().is_none())
    }

    pub fn is_invalid_response(&self) -> bool {
        matches!(self, ClientError::InvalidResponse { .. })
    }
}
