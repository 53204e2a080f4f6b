use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::frame::AnnotatedFrame;

/// Receives annotated frames in presentation order.
pub trait OverlaySink: Send {
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<()>;
}

impl<F> OverlaySink for F
where
    F: FnMut(&AnnotatedFrame) -> Result<()> + Send,
{
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        self(frame)
    }
}

/// Writes each annotated frame as `frame_<seq>.png` and refreshes `latest.png`.
pub struct DirectorySink {
    dir: PathBuf,
    written: u64,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn frame_path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", seq))
    }
}

impl OverlaySink for DirectorySink {
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        let path = self.frame_path(frame.seq);
        frame
            .image
            .save(&path)
            .map_err(|e| anyhow!("writing {}: {}", path.display(), e))?;
        let latest = self.dir.join("latest.png");
        std::fs::copy(&path, &latest)
            .with_context(|| format!("updating {}", latest.display()))?;
        self.written += 1;
        log::info!(
            "frame #{}: {} ({} detections) -> {}",
            frame.seq,
            frame.status(),
            frame.batch.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectionBatch;
    use crate::render::AnnotationReport;
    use image::RgbaImage;

    #[test]
    fn writes_numbered_and_latest_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out")).unwrap();
        let frame = AnnotatedFrame {
            seq: 42,
            captured_at: chrono::Utc::now(),
            image: RgbaImage::new(4, 4),
            batch: DetectionBatch::now(vec![]),
            report: AnnotationReport::default(),
            has_fault: false,
        };
        sink.present(&frame).unwrap();
        assert!(sink.frame_path(42).exists());
        assert!(sink.dir().join("latest.png").exists());
        assert_eq!(sink.written(), 1);
    }
}
