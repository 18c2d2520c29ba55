use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::protocol::{
    BatchDetectionResponse, HealthResponse, ModelInfo, SingleDetectionResponse,
};
use tracing::{debug, info, warn};
use url::Url;

pub mod batch;
pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod report;
pub mod submission;
pub mod upload;

pub use config::Settings;
pub use error::ClientError;
pub use monitor::{ConnectionState, ConnectivityMonitor, MonitorEvent};
pub use submission::{SubmissionError, SubmissionKind, SubmissionOutcome, SubmissionTracker};
pub use upload::UploadFile;

/// Operations of the detection backend's HTTP contract.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    async fn health(&self) -> Result<HealthResponse, ClientError>;
    async fn model_info(&self) -> Result<ModelInfo, ClientError>;
    async fn predict_single(
        &self,
        file: UploadFile,
        confidence: f32,
    ) -> Result<SingleDetectionResponse, ClientError>;
    async fn predict_batch(
        &self,
        files: Vec<UploadFile>,
        confidence: f32,
    ) -> Result<BatchDetectionResponse, ClientError>;
    async fn fetch_annotated_image(&self, path: &str) -> Result<Vec<u8>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct DetectionClient {
    http: Client,
    base_url: Url,
}

impl DetectionClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_http(base_url, Client::new())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_http(base_url, http)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        Self::with_timeout(&settings.api_base_url, settings.request_timeout())
    }

    fn with_http(base_url: &str, http: Client) -> Result<Self, ClientError> {
        let mut parsed = Url::parse(base_url).map_err(|source| ClientError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        // `Url::join` drops the last segment unless the base ends in a slash.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ClientError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                source,
            })
    }

    /// URL of an annotated image path returned by `/predict/single`, with a
    /// cache-busting `t` query parameter.
    pub fn annotated_image_url(&self, path: &str, cache_bust: i64) -> Result<Url, ClientError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("t", &cache_bust.to_string());
        Ok(url)
    }

    async fn send_multipart<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: Form,
        confidence: f32,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(endpoint)?;
        let response = self
            .http
            .post(url)
            // Deployments that read the threshold from the query string see it too.
            .query(&[("confidence", confidence_field(confidence))])
            .multipart(form)
            .send()
            .await?;
        decode_json(response).await
    }
}

pub(crate) fn confidence_field(confidence: f32) -> String {
    format!("{confidence}")
}

fn upload_part(file: UploadFile) -> Result<Part, ClientError> {
    let part = Part::bytes(file.bytes)
        .file_name(file.filename)
        .mime_str(&file.mime_type)?;
    Ok(part)
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "detection backend returned error status");
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    let raw = response.text().await?;
    serde_json::from_str(&raw).map_err(|source| ClientError::InvalidResponse { raw, source })
}

#[async_trait]
impl ClientHandle for DetectionClient {
    async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.endpoint("health")?).send().await?;
        let response = ensure_success(response).await?;
        // Any 2xx counts as healthy, whatever the body says.
        let raw = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    }

    async fn model_info(&self) -> Result<ModelInfo, ClientError> {
        let response = self.http.get(self.endpoint("model-info")?).send().await?;
        decode_json(response).await
    }

    async fn predict_single(
        &self,
        file: UploadFile,
        confidence: f32,
    ) -> Result<SingleDetectionResponse, ClientError> {
        info!(
            filename = %file.filename,
            size_bytes = file.size_bytes(),
            confidence,
            "predict/single"
        );
        let form = Form::new()
            .part("file", upload_part(file)?)
            .text("confidence", confidence_field(confidence));
        let result: SingleDetectionResponse =
            self.send_multipart("predict/single", form, confidence).await?;
        debug!(detections = result.detections_count, "predict/single completed");
        Ok(result)
    }

    async fn predict_batch(
        &self,
        files: Vec<UploadFile>,
        confidence: f32,
    ) -> Result<BatchDetectionResponse, ClientError> {
        info!(files = files.len(), confidence, "predict/batch");
        let mut form = Form::new();
        for file in files {
            form = form.part("files", upload_part(file)?);
        }
        let form = form.text("confidence", confidence_field(confidence));
        let result: BatchDetectionResponse =
            self.send_multipart("predict/batch", form, confidence).await?;
        debug!(
            images = result.total_images,
            detections = result.total_detections,
            "predict/batch completed"
        );
        Ok(result)
    }

    async fn fetch_annotated_image(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let cache_bust = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default();
        let url = self.annotated_image_url(path, cache_bust)?;
        let response = ensure_success(self.http.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
