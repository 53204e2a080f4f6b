use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classes::FaultClassifier;

/// Detections scored below this are dropped before drawing unless configured otherwise.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Axis-aligned box in source-image pixel space, origin at the top-left.
///
/// On the wire this is the 4-element array `[x, y, width, height]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the box can be drawn: finite components and a positive extent.
    pub fn is_drawable(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One labeled, scored, located object found in an image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    /// Model certainty in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class: class.into(),
            confidence,
            bbox,
        }
    }

    /// Class name with word separators turned into spaces.
    pub fn display_class(&self) -> String {
        self.class.replace('_', " ")
    }
}

/// All detections returned for one image or frame.
///
/// Batches are never merged: a new batch replaces the previous one outright.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionBatch {
    pub detections: Vec<Detection>,
    pub timestamp: DateTime<Utc>,
}

impl DetectionBatch {
    pub fn new(detections: Vec<Detection>, timestamp: DateTime<Utc>) -> Self {
        Self {
            detections,
            timestamp,
        }
    }

    pub fn now(detections: Vec<Detection>) -> Self {
        Self::new(detections, Utc::now())
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub fn has_fault(&self, classifier: &dyn FaultClassifier) -> bool {
        self.detections
            .iter()
            .any(|d| classifier.is_fault(&d.class))
    }

    /// Batch keeping only detections scored at or above `min`. Order and timestamp are kept.
    pub fn above_confidence(&self, min: f32) -> DetectionBatch {
        DetectionBatch::new(
            self.detections
                .iter()
                .filter(|d| d.confidence >= min)
                .cloned()
                .collect(),
            self.timestamp,
        )
    }
}

impl<'a> IntoIterator for &'a DetectionBatch {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::FaultClasses;

    #[test]
    fn bbox_serializes_as_array() {
        let det = Detection::new("insulator_fault", 0.92, BoundingBox::new(120.0, 80.0, 200.0, 160.0));
        let json = serde_json::to_value(&det).unwrap();
        assert_eq!(json["bbox"], serde_json::json!([120.0, 80.0, 200.0, 160.0]));
        assert_eq!(json["class"], "insulator_fault");

        let back: Detection = serde_json::from_value(json).unwrap();
        assert_eq!(back, det);
    }

    #[test]
    fn confidence_threshold_is_inclusive() {
        let batch = DetectionBatch::now(vec![
            Detection::new("insulator_fault", 0.49, BoundingBox::new(0.0, 0.0, 5.0, 5.0)),
            Detection::new("insulator_normal", 0.5, BoundingBox::new(5.0, 0.0, 5.0, 5.0)),
            Detection::new("insulator_fault", 0.92, BoundingBox::new(9.0, 0.0, 5.0, 5.0)),
        ]);
        let kept = batch.above_confidence(0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.detections[0].confidence, 0.5);
        assert_eq!(kept.timestamp, batch.timestamp);
        assert_eq!(batch.above_confidence(0.0), batch);
    }

    #[test]
    fn drawable_requires_positive_extent() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_drawable());
        assert!(!BoundingBox::new(0.0, 0.0, -5.0, 10.0).is_drawable());
        assert!(!BoundingBox::new(0.0, 0.0, 10.0, 0.0).is_drawable());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 10.0, 10.0).is_drawable());
    }

    #[test]
    fn batch_fault_flag_follows_classifier() {
        let classes = FaultClasses::default();
        let normal = DetectionBatch::now(vec![Detection::new(
            "insulator_normal",
            0.9,
            BoundingBox::new(0.0, 0.0, 5.0, 5.0),
        )]);
        assert!(!normal.has_fault(&classes));

        let mut mixed = normal.clone();
        mixed.detections.push(Detection::new(
            "insulator_fault",
            0.6,
            BoundingBox::new(1.0, 1.0, 5.0, 5.0),
        ));
        assert!(mixed.has_fault(&classes));
        assert!(!DetectionBatch::now(vec![]).has_fault(&classes));
    }

    #[test]
    fn display_class_replaces_every_separator() {
        let det = Detection::new("cracked_disc_fault", 0.5, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(det.display_class(), "cracked disc fault");
    }
}
