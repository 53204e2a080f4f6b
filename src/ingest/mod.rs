//! Frame sources.
//!
//! - Local still images (the uploaded-file case): `ImageFileSource`
//! - Synthetic scenes for tests and demos (`stub://name`): `SyntheticSource`
//!
//! Sources only produce pixels. Sequence numbers and timestamps are assigned
//! by the capture loop. Camera drivers and network streams are not supported;
//! `open_source` rejects URL schemes other than `stub://`.

pub mod file;
pub mod synthetic;

use anyhow::{anyhow, Result};
use image::RgbaImage;

pub use file::ImageFileSource;
pub use synthetic::SyntheticSource;

/// Anything that can hand out frames on demand.
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    /// Prepare the source. Called once before the first capture.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame.
    fn capture(&mut self) -> Result<RgbaImage>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Open a source from a URI: `stub://name` or a local image path.
pub fn open_source(uri: &str, width: u32, height: u32) -> Result<Box<dyn FrameSource>> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(anyhow!("frame source must not be empty"));
    }
    if uri.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(uri, width, height)?));
    }
    if uri.contains("://") {
        return Err(anyhow!(
            "frame source '{}' is not supported (use a local image path or stub://)",
            uri
        ));
    }
    Ok(Box::new(ImageFileSource::new(uri)))
}
