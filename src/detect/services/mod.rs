pub mod fixed;

#[cfg(feature = "detect-http")]
pub mod http;

pub use fixed::{FixedDetectionService, UPLOAD_SERVICE_NAME, WEBCAM_SERVICE_NAME};

#[cfg(feature = "detect-http")]
pub use http::{HttpConfig, HttpDetectionService, HTTP_SERVICE_NAME};
