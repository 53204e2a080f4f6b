//! Captured frames and their annotated counterparts.
//!
//! - `Frame`: one captured image tagged with a monotonic sequence number.
//! - `FrameSequence`: hands out those numbers; never reuses or goes backwards.
//! - `Overlay`: style, fault classifier and font needed to annotate a frame.
//! - `AnnotatedFrame`: a frame with its detection batch drawn on top.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ab_glyph::FontArc;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::detect::{
    DetectionBatch, DetectionRequest, FaultClasses, FaultClassifier, DEFAULT_MIN_CONFIDENCE,
};
use crate::render::{annotate, default_font, AnnotationReport, OverlayStyle, RasterSurface};

/// Encoding used for the detection request payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameEncoding {
    #[default]
    Jpeg,
    Png,
}

impl FrameEncoding {
    pub fn content_type(self) -> &'static str {
        match self {
            FrameEncoding::Jpeg => "image/jpeg",
            FrameEncoding::Png => "image/png",
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            FrameEncoding::Jpeg => ImageFormat::Jpeg,
            FrameEncoding::Png => ImageFormat::Png,
        }
    }
}

impl std::str::FromStr for FrameEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(FrameEncoding::Jpeg),
            "png" => Ok(FrameEncoding::Png),
            other => Err(anyhow!("unsupported frame encoding '{}'", other)),
        }
    }
}

/// Monotonic frame/request counter. The first number handed out is 1.
#[derive(Debug, Default)]
pub struct FrameSequence {
    last: AtomicU64,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last number handed out (0 before the first call to `next`).
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

/// One captured image.
#[derive(Clone, Debug)]
pub struct Frame {
    pub seq: u64,
    pub image: RgbaImage,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(seq: u64, image: RgbaImage) -> Self {
        Self {
            seq,
            image,
            captured_at: Utc::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode the frame into an opaque payload.
    pub fn encode(&self, encoding: FrameEncoding) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        match encoding {
            // JPEG has no alpha channel.
            FrameEncoding::Jpeg => DynamicImage::ImageRgba8(self.image.clone())
                .to_rgb8()
                .write_to(&mut out, encoding.format())?,
            FrameEncoding::Png => self.image.write_to(&mut out, encoding.format())?,
        }
        Ok(out.into_inner())
    }

    pub fn detection_request(&self, encoding: FrameEncoding) -> Result<DetectionRequest> {
        Ok(DetectionRequest::new(
            self.encode(encoding)?,
            encoding.content_type(),
        ))
    }

    /// Draw `batch` over a copy of this frame. Detections below the overlay's
    /// confidence threshold are dropped first and left out of the result.
    pub fn annotate(&self, batch: DetectionBatch, overlay: &Overlay) -> Result<AnnotatedFrame> {
        let received = batch.len();
        let batch = batch.above_confidence(overlay.min_confidence);
        if batch.len() < received {
            log::debug!(
                "frame {}: {} detections below confidence {}",
                self.seq,
                received - batch.len(),
                overlay.min_confidence
            );
        }
        let mut surface = RasterSurface::new(self.image.clone()).with_font(overlay.font.clone());
        let report = annotate(
            &mut surface,
            &batch.detections,
            &overlay.style,
            overlay.classifier.as_ref(),
        )?;
        for skipped in &report.skipped {
            log::warn!("frame {}: {}", self.seq, skipped);
        }
        let has_fault = batch.has_fault(overlay.classifier.as_ref());
        Ok(AnnotatedFrame {
            seq: self.seq,
            captured_at: self.captured_at,
            image: surface.into_image(),
            batch,
            report,
            has_fault,
        })
    }
}

/// Everything the renderer needs besides the detections themselves.
#[derive(Clone)]
pub struct Overlay {
    pub style: OverlayStyle,
    pub classifier: Arc<dyn FaultClassifier + Send + Sync>,
    pub font: Option<FontArc>,
    /// Detections scored below this are not drawn.
    pub min_confidence: f32,
}

impl Overlay {
    pub fn new(
        style: OverlayStyle,
        classifier: Arc<dyn FaultClassifier + Send + Sync>,
        font: Option<FontArc>,
    ) -> Self {
        Self {
            style,
            classifier,
            font,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

impl Default for Overlay {
    fn default() -> Self {
        let font = match default_font() {
            Ok(font) => Some(font),
            Err(e) => {
                log::warn!("label text disabled: {}", e);
                None
            }
        };
        Self::new(
            OverlayStyle::default(),
            Arc::new(FaultClasses::default()),
            font,
        )
    }
}

/// A frame with its detection overlay applied.
#[derive(Clone, Debug)]
pub struct AnnotatedFrame {
    pub seq: u64,
    pub captured_at: DateTime<Utc>,
    pub image: RgbaImage,
    pub batch: DetectionBatch,
    pub report: AnnotationReport,
    pub has_fault: bool,
}

impl AnnotatedFrame {
    pub fn status(&self) -> &'static str {
        if self.has_fault {
            "Fault Detected"
        } else {
            "No Fault"
        }
    }
}
