use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};

use super::{FrameSource, SourceStats};

/// Generated scene (`stub://name`): a gradient that shifts every frame.
pub struct SyntheticSource {
    uri: String,
    width: u32,
    height: u32,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    pub fn new(uri: &str, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("synthetic source needs a non-zero frame size"));
        }
        Ok(Self {
            uri: uri.to_string(),
            width,
            height,
            frame_count: 0,
            connected: false,
        })
    }

    fn generate(&self) -> RgbaImage {
        let shift = self.frame_count;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let r = ((x as u64 + shift) % 256) as u8;
            let g = ((y as u64 + shift / 2) % 256) as u8;
            Rgba([r, g, 96, 255])
        })
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.uri
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticSource: connected to {}", self.uri);
        self.connected = true;
        Ok(())
    }

    fn capture(&mut self) -> Result<RgbaImage> {
        if !self.connected {
            return Err(anyhow!("synthetic source {} is not connected", self.uri));
        }
        self.frame_count += 1;
        Ok(self.generate())
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_change_between_captures() {
        let mut source = SyntheticSource::new("stub://camera", 16, 8).unwrap();
        source.connect().unwrap();
        let a = source.capture().unwrap();
        let b = source.capture().unwrap();
        assert_eq!(a.dimensions(), (16, 8));
        assert_ne!(a, b);
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(SyntheticSource::new("stub://camera", 0, 8).is_err());
    }
}
