//! Table detection through an HTTP table-extraction service.
//!
//! The page PDF is posted base64-encoded; the service answers with one row
//! per table it found. Bounding boxes come back as `[x0, y0, x1, y1]` in
//! table space (bottom-left origin).

use crate::collaborators::TableDetector;
use crate::config::IndexConfig;
use crate::error::{CollaboratorError, TableSearchError};
use crate::model::{BoundingBox, TableRegion};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "table detector";

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    file: String,
    pages: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectedRow {
    bbox: [f32; 4],
    #[serde(default)]
    html: String,
    #[serde(default)]
    accuracy: Option<f32>,
    #[serde(default)]
    parsing_report: Option<ParsingReport>,
}

#[derive(Debug, Deserialize)]
struct ParsingReport {
    #[serde(default)]
    accuracy: Option<f32>,
}

impl DetectedRow {
    fn into_region(self) -> TableRegion {
        let accuracy = self
            .accuracy
            .or_else(|| self.parsing_report.and_then(|r| r.accuracy))
            .unwrap_or(0.0);
        let [x0, y0, x1, y1] = self.bbox;
        TableRegion::new(BoundingBox::from_corners(x0, y0, x1, y1), accuracy, self.html)
    }
}

/// Parse a detector response body into table regions, in response order.
pub fn parse_detector_response(body: &str) -> Result<Vec<TableRegion>, CollaboratorError> {
    let rows: Vec<DetectedRow> =
        serde_json::from_str(body).map_err(|e| CollaboratorError::InvalidResponse {
            service: SERVICE,
            detail: e.to_string(),
        })?;
    Ok(rows.into_iter().map(DetectedRow::into_region).collect())
}

/// [`TableDetector`] calling a remote table-extraction endpoint.
#[derive(Debug, Clone)]
pub struct HttpTableDetector {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTableDetector {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, TableSearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TableSearchError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self, TableSearchError> {
        let endpoint = config.table_detector_endpoint.clone().ok_or_else(|| {
            TableSearchError::InvalidConfig(
                "table detector endpoint is not set (EXTRACT_TABLES_ENDPOINT)".into(),
            )
        })?;
        Self::new(
            endpoint,
            config.table_detector_api_key.clone(),
            config.request_timeout_secs,
        )
    }
}

#[async_trait]
impl TableDetector for HttpTableDetector {
    async fn detect(&self, page_pdf: &[u8]) -> Result<Vec<TableRegion>, CollaboratorError> {
        let body = DetectRequest {
            file: STANDARD.encode(page_pdf),
            pages: "1",
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| CollaboratorError::Request {
            service: SERVICE,
            detail: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| CollaboratorError::Request {
            service: SERVICE,
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: text,
            });
        }

        let regions = parse_detector_response(&text)?;
        debug!("Detector returned {} table(s)", regions.len());
        Ok(regions)
    }
}
