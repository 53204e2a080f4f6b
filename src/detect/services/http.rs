//! Remote detection service over HTTP.
//!
//! The encoded image is POSTed as the raw request body with its MIME type as
//! `Content-Type`; the reply uses the JSON wire format in `detect::wire`. This
//! is the seam where a real inference server replaces the mocks.

use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::result::DetectionBatch;
use crate::detect::service::{DetectionRequest, DetectionService};
use crate::detect::wire;

pub const HTTP_SERVICE_NAME: &str = "http";

#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Endpoint URL, e.g. `http://127.0.0.1:8787/api/detect`.
    pub url: String,
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct HttpDetectionService {
    config: HttpConfig,
    agent: ureq::Agent,
}

impl HttpDetectionService {
    pub fn new(config: HttpConfig) -> Result<Self> {
        if !(config.url.starts_with("http://") || config.url.starts_with("https://")) {
            return Err(anyhow!(
                "detection service url must be http:// or https:// (got '{}')",
                config.url
            ));
        }
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self { config, agent })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl DetectionService for HttpDetectionService {
    fn name(&self) -> &str {
        HTTP_SERVICE_NAME
    }

    fn detect(&mut self, request: &DetectionRequest) -> Result<DetectionBatch> {
        request.ensure_payload()?;
        let response = self
            .agent
            .post(&self.config.url)
            .set("Content-Type", &request.content_type)
            .send_bytes(&request.image);
        let body = match response {
            Ok(resp) => resp.into_string()?,
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(anyhow!(
                    "detection service returned {}: {}",
                    code,
                    body.trim()
                ));
            }
            Err(err) => return Err(anyhow!("detection request failed: {}", err)),
        };
        wire::decode_response(&body)
    }
}
