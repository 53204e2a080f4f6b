use thiserror::Error;

use crate::detect::{BoundingBox, Detection, FaultClassifier};

use super::style::OverlayStyle;
use super::surface::{RectF, Surface};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum AnnotateError {
    /// Box with a non-positive or non-finite extent. Skipped; the rest of the batch is drawn.
    #[error("detection {index} ({class}) has invalid geometry {bbox:?}")]
    InvalidGeometry {
        index: usize,
        class: String,
        bbox: BoundingBox,
    },
    /// Nothing to draw on yet. The caller must wait for the surface to be ready.
    #[error("drawing surface is not ready")]
    SurfaceUnavailable,
}

/// Outcome of one `annotate` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationReport {
    /// Detections that got a box and a label.
    pub drawn: usize,
    /// Detections left out, each with the reason.
    pub skipped: Vec<AnnotateError>,
}

/// Label text for a detection: `"insulator fault 92%"`.
pub fn label_text(detection: &Detection) -> String {
    let percent = (detection.confidence.clamp(0.0, 1.0) * 100.0).round() as u32;
    format!("{} {}%", detection.display_class(), percent)
}

/// Draw boxes and labels for `detections` over the image already on `surface`.
///
/// Detections are drawn in order, so later ones cover earlier ones. Boxes with
/// bad geometry are skipped and reported. An empty batch touches nothing.
pub fn annotate<S>(
    surface: &mut S,
    detections: &[Detection],
    style: &OverlayStyle,
    classifier: &dyn FaultClassifier,
) -> Result<AnnotationReport, AnnotateError>
where
    S: Surface + ?Sized,
{
    let mut report = AnnotationReport::default();
    if detections.is_empty() {
        return Ok(report);
    }
    if !surface.is_ready() {
        return Err(AnnotateError::SurfaceUnavailable);
    }

    for (index, detection) in detections.iter().enumerate() {
        let bbox = detection.bbox;
        if !bbox.is_drawable() {
            log::debug!(
                "skipping detection {} ({}): bbox {:?}",
                index,
                detection.class,
                bbox
            );
            report.skipped.push(AnnotateError::InvalidGeometry {
                index,
                class: detection.class.clone(),
                bbox,
            });
            continue;
        }

        let tier = style.tier(classifier.is_fault(&detection.class));
        let rect = RectF::new(bbox.x, bbox.y, bbox.width, bbox.height);
        surface.fill_rect(rect, tier.fill);
        surface.stroke_rect(rect, tier.stroke, style.stroke_width);

        // Label sits on the box's top edge; near y = 0 it clips off the surface.
        let label = label_text(detection);
        let text_width = surface.measure_text(&label, style.font_size);
        surface.fill_rect(
            RectF::new(
                bbox.x,
                bbox.y - style.label_height,
                text_width + style.label_padding,
                style.label_height,
            ),
            tier.label,
        );
        surface.fill_text(
            &label,
            bbox.x + style.text_inset,
            bbox.y - style.text_baseline_offset,
            style.text_color,
            style.font_size,
        );
        report.drawn += 1;
    }

    Ok(report)
}
