mod classes;
mod registry;
mod result;
mod service;
pub mod services;
pub mod wire;

pub use classes::{FaultClasses, FaultClassifier, DEFAULT_FAULT_CLASS};
pub use registry::{ServiceRegistry, SharedService};
pub use result::{BoundingBox, Detection, DetectionBatch, DEFAULT_MIN_CONFIDENCE};
pub use service::{DetectionRequest, DetectionService};
pub use services::FixedDetectionService;
