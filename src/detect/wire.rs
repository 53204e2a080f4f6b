//! JSON wire format shared by the detection API and the HTTP client service.
//!
//! Success: `{"success": true, "detections": [{"class", "confidence", "bbox": [x, y, w, h]}], "timestamp": "<RFC 3339>"}`
//! Failure: `{"error": "<message>"}`

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detect::result::{Detection, DetectionBatch};

#[derive(Debug, Serialize, Deserialize)]
pub struct WireResponse {
    pub success: bool,
    pub detections: Vec<Detection>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireError {
    pub error: String,
}

impl From<&DetectionBatch> for WireResponse {
    fn from(batch: &DetectionBatch) -> Self {
        Self {
            success: true,
            detections: batch.detections.clone(),
            timestamp: batch.timestamp,
        }
    }
}

pub fn encode_batch(batch: &DetectionBatch) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&WireResponse::from(batch))?)
}

pub fn encode_error(message: &str) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&WireError {
        error: message.to_string(),
    })?)
}

/// Parse a response body into a batch.
///
/// Error bodies, `success: false`, and confidences outside `[0, 1]` are all
/// failures; nothing from such a response is returned.
pub fn decode_response(body: &str) -> Result<DetectionBatch> {
    if let Ok(err) = serde_json::from_str::<WireError>(body) {
        return Err(anyhow!("detection service error: {}", err.error));
    }
    let resp: WireResponse =
        serde_json::from_str(body).context("invalid detection response body")?;
    if !resp.success {
        return Err(anyhow!("detection service reported failure"));
    }
    for (i, det) in resp.detections.iter().enumerate() {
        if !(0.0..=1.0).contains(&det.confidence) {
            return Err(anyhow!(
                "detection {} has confidence {} outside [0, 1]",
                i,
                det.confidence
            ));
        }
    }
    Ok(DetectionBatch::new(resp.detections, resp.timestamp))
}
