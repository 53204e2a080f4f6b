use std::time::Duration;

use anyhow::Result;

use crate::detect::result::{BoundingBox, Detection, DetectionBatch};
use crate::detect::service::{DetectionRequest, DetectionService};

pub const UPLOAD_SERVICE_NAME: &str = "mock-upload";
pub const WEBCAM_SERVICE_NAME: &str = "mock-webcam";

const UPLOAD_DELAY: Duration = Duration::from_millis(1000);
const WEBCAM_DELAY: Duration = Duration::from_millis(300);

/// Mock service: waits a fixed delay, then returns the same detections for any image.
///
/// Stands in for a real inference backend. The image payload is only checked
/// for presence, never decoded.
#[derive(Clone, Debug)]
pub struct FixedDetectionService {
    name: String,
    delay: Duration,
    detections: Vec<Detection>,
    calls: u64,
}

impl FixedDetectionService {
    pub fn new(name: impl Into<String>, delay: Duration, detections: Vec<Detection>) -> Self {
        Self {
            name: name.into(),
            delay,
            detections,
            calls: 0,
        }
    }

    /// Still-image preset.
    pub fn upload() -> Self {
        Self::new(
            UPLOAD_SERVICE_NAME,
            UPLOAD_DELAY,
            vec![
                Detection::new(
                    "insulator_fault",
                    0.92,
                    BoundingBox::new(120.0, 80.0, 200.0, 160.0),
                ),
                Detection::new(
                    "insulator_normal",
                    0.87,
                    BoundingBox::new(320.0, 220.0, 180.0, 140.0),
                ),
            ],
        )
    }

    /// Live-feed preset, shorter delay.
    pub fn webcam() -> Self {
        Self::new(
            WEBCAM_SERVICE_NAME,
            WEBCAM_DELAY,
            vec![
                Detection::new(
                    "insulator_fault",
                    0.89,
                    BoundingBox::new(150.0, 100.0, 180.0, 140.0),
                ),
                Detection::new(
                    "insulator_normal",
                    0.93,
                    BoundingBox::new(350.0, 200.0, 160.0, 120.0),
                ),
            ],
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectionService for FixedDetectionService {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, request: &DetectionRequest) -> Result<DetectionBatch> {
        request.ensure_payload()?;
        self.calls += 1;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(DetectionBatch::now(self.detections.clone()))
    }
}
