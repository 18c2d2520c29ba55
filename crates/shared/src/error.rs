use serde::{Deserialize, Serialize};

/// Error body returned by the detection backend, `{"detail": ...}`.
///
/// `detail` is usually a string, but request validation failures carry a list
/// of objects instead, so it is kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Best-effort extraction of the `detail` message from a raw error body.
pub fn detail_message(raw: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(raw)
        .ok()
        .map(|body| body.message())
}
