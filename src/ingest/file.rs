//! Local still-image source.
//!
//! Decodes the image once on `connect` and hands out the same pixels on every
//! capture. Used for the single-upload flow and for replaying a fixed scene
//! through the live loop.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use image::RgbaImage;

use super::{FrameSource, SourceStats};

pub struct ImageFileSource {
    path: PathBuf,
    label: String,
    image: Option<RgbaImage>,
    frames_captured: u64,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self {
            path,
            label,
            image: None,
            frames_captured: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode an image file to RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .map_err(|e| anyhow!("failed to open image {}: {}", path.display(), e))?
        .to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(anyhow!("image {} has zero dimensions", path.display()));
    }
    Ok(image)
}

impl FrameSource for ImageFileSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn connect(&mut self) -> Result<()> {
        let image = load_image(&self.path)?;
        log::info!(
            "ImageFileSource: loaded {} ({}x{})",
            self.label,
            image.width(),
            image.height()
        );
        self.image = Some(image);
        Ok(())
    }

    fn capture(&mut self) -> Result<RgbaImage> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| anyhow!("image source {} is not connected", self.label))?;
        self.frames_captured += 1;
        Ok(image.clone())
    }

    fn is_healthy(&self) -> bool {
        self.image.is_some()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames_captured,
            source: self.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn captures_repeat_the_loaded_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insulator.png");
        RgbaImage::from_pixel(12, 8, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut source = ImageFileSource::new(&path);
        assert!(source.capture().is_err());
        assert!(!source.is_healthy());

        source.connect().unwrap();
        let a = source.capture().unwrap();
        let b = source.capture().unwrap();
        assert_eq!(a.dimensions(), (12, 8));
        assert_eq!(a, b);
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn missing_file_fails_on_connect() {
        let mut source = ImageFileSource::new("/nonexistent/insulator.png");
        assert!(source.connect().is_err());
    }
}
