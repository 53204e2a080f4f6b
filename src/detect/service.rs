use anyhow::{anyhow, Result};

use crate::detect::result::DetectionBatch;

/// One detection round trip: an opaque encoded image submitted as a single unit.
#[derive(Clone, Debug)]
pub struct DetectionRequest {
    /// Encoded raster bytes (JPEG, PNG, ...). Never decoded by the caller side.
    pub image: Vec<u8>,
    /// MIME type of `image`.
    pub content_type: String,
}

impl DetectionRequest {
    pub fn new(image: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            image,
            content_type: content_type.into(),
        }
    }

    pub fn jpeg(image: Vec<u8>) -> Self {
        Self::new(image, "image/jpeg")
    }

    /// Rejects requests that carry no image at all.
    pub fn ensure_payload(&self) -> Result<()> {
        if self.image.is_empty() {
            return Err(anyhow!("no image provided"));
        }
        Ok(())
    }
}

/// Detection service boundary.
///
/// Given an encoded image, return every detection for it or an error. There are
/// no partial results: a failed call yields nothing to render. How detections
/// are produced (a model, a remote server, fixed data) is the implementation's
/// business; callers only see this contract.
pub trait DetectionService: Send {
    /// Service identifier, used as the registry key.
    fn name(&self) -> &str;

    /// Run detection on one encoded image.
    fn detect(&mut self, request: &DetectionRequest) -> Result<DetectionBatch>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
