use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_loaded: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<u32>,
    #[serde(rename = "mAP", default, skip_serializing_if = "Option::is_none")]
    pub map: Option<serde_json::Value>,
    /// Lower-case spelling some deployments use instead of `mAP`.
    #[serde(rename = "map", default, skip_serializing_if = "Option::is_none")]
    pub map_lowercase: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes_list: Option<BTreeMap<String, String>>,
}

impl ModelInfo {
    /// The reported mAP percentage, if the backend sent a usable positive value.
    ///
    /// `map` is consulted only when `mAP` is absent, null, zero, `false` or
    /// empty. A present but unparseable `mAP` yields `None`.
    pub fn map_percent(&self) -> Option<f64> {
        [self.map.as_ref(), self.map_lowercase.as_ref()]
            .into_iter()
            .flatten()
            .find(|value| !is_blank(value))
            .and_then(json_number)
            .filter(|value| *value > 0.0)
    }
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(flag) => !flag,
        serde_json::Value::Number(number) => number.as_f64() == Some(0.0),
        serde_json::Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => leading_float(text),
        _ => None,
    }
}

/// Parses the longest leading decimal prefix, so `"84.1%"` reads as 84.1.
fn leading_float(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '0'..='9' => end = idx + 1,
            '.' if !seen_dot => seen_dot = true,
            '-' | '+' if idx == 0 => {}
            _ => break,
        }
    }
    trimmed[..end].parse().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleDetectionResponse {
    pub annotated_image: String,
    pub detections_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_confidence: Option<f64>,
    pub detections: Vec<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImageResult {
    pub filename: String,
    pub detections_count: u32,
    #[serde(default)]
    pub class_counts: BTreeMap<String, u32>,
    /// The backend only echoes the first few detections per image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetectionResponse {
    pub total_images: u32,
    pub total_detections: u32,
    pub avg_detections_per_image: f64,
    pub images: Vec<BatchImageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
