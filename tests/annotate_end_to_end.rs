use image::{Rgba, RgbaImage};

use insulator_inspect::detect::{BoundingBox, Detection, FaultClasses, FixedDetectionService};
use insulator_inspect::render::{annotate, AnnotateError, RasterSurface, RecordingSurface};
use insulator_inspect::{DetectionRequest, DetectionService, Frame, FrameEncoding, OverlayStyle};

const BACKGROUND: Rgba<u8> = Rgba([100, 100, 100, 255]);
const FAULT_STROKE: Rgba<u8> = Rgba([0xef, 0x44, 0x44, 0xff]);
const NORMAL_STROKE: Rgba<u8> = Rgba([0x22, 0xc5, 0x5e, 0xff]);

fn upload_batch() -> Vec<Detection> {
    let mut service = FixedDetectionService::upload().with_delay(std::time::Duration::ZERO);
    service
        .detect(&DetectionRequest::jpeg(vec![0xff, 0xd8, 0xff]))
        .expect("mock detection")
        .detections
}

fn render(detections: &[Detection]) -> (RgbaImage, usize) {
    let mut surface = RasterSurface::new(RgbaImage::from_pixel(640, 480, BACKGROUND));
    let report = annotate(
        &mut surface,
        detections,
        &OverlayStyle::default(),
        &FaultClasses::default(),
    )
    .expect("annotate");
    (surface.into_image(), report.drawn)
}

#[test]
fn upload_scenario_draws_both_tiers() {
    let (image, drawn) = render(&upload_batch());
    assert_eq!(drawn, 2);

    // Box outlines sit on the bbox edges in the opaque tier colour.
    assert_eq!(*image.get_pixel(120, 150), FAULT_STROKE);
    assert_eq!(*image.get_pixel(319, 150), FAULT_STROKE);
    assert_eq!(*image.get_pixel(200, 80), FAULT_STROKE);
    assert_eq!(*image.get_pixel(320, 300), NORMAL_STROKE);
    assert_eq!(*image.get_pixel(400, 359), NORMAL_STROKE);

    // Interiors are tinted, not covered.
    let fault_fill = image.get_pixel(200, 160);
    assert!(fault_fill.0[0] > 130 && fault_fill.0[0] < 160, "{:?}", fault_fill);
    assert!(fault_fill.0[1] < 100);
    let normal_fill = image.get_pixel(400, 300);
    assert!(normal_fill.0[1] > 110 && normal_fill.0[1] < 140, "{:?}", normal_fill);
    assert!(normal_fill.0[0] < 100);

    // Label backgrounds sit above each box.
    let fault_label = image.get_pixel(125, 65);
    assert!(fault_label.0[0] > 190 && fault_label.0[1] < 90, "{:?}", fault_label);
    let normal_label = image.get_pixel(325, 205);
    assert!(normal_label.0[1] > 160 && normal_label.0[0] < 60, "{:?}", normal_label);

    // Everything else is untouched.
    assert_eq!(*image.get_pixel(10, 10), BACKGROUND);
    assert_eq!(*image.get_pixel(600, 450), BACKGROUND);
}

#[test]
fn rendering_is_deterministic() {
    let detections = upload_batch();
    let (first, _) = render(&detections);
    let (second, _) = render(&detections);
    assert_eq!(first, second);
}

#[test]
fn recording_surface_sees_labels_and_tier_colours() {
    let mut surface = RecordingSurface::new(640, 480);
    let report = annotate(
        &mut surface,
        &upload_batch(),
        &OverlayStyle::default(),
        &FaultClasses::default(),
    )
    .unwrap();
    assert_eq!(report.drawn, 2);

    let strokes: Vec<_> = surface.stroked_rects().collect();
    assert_eq!(strokes.len(), 2);
    assert_eq!(strokes[0].1, FAULT_STROKE);
    assert_eq!(strokes[1].1, NORMAL_STROKE);
    assert_eq!((strokes[0].0.x, strokes[0].0.y), (120.0, 80.0));

    let texts: Vec<_> = surface.texts().collect();
    assert_eq!(texts, vec!["insulator fault 92%", "insulator normal 87%"]);
}

#[test]
fn malformed_box_is_skipped_and_rest_drawn() {
    let mut detections = upload_batch();
    detections.insert(
        1,
        Detection::new("insulator_fault", 0.5, BoundingBox::new(10.0, 10.0, -5.0, 20.0)),
    );
    let mut surface = RecordingSurface::new(640, 480);
    let report = annotate(
        &mut surface,
        &detections,
        &OverlayStyle::default(),
        &FaultClasses::default(),
    )
    .unwrap();
    assert_eq!(report.drawn, 2);
    assert!(matches!(
        report.skipped.as_slice(),
        [AnnotateError::InvalidGeometry { index: 1, .. }]
    ));
    assert_eq!(surface.stroked_rects().count(), 2);
}

#[test]
fn frame_round_trip_through_mock_service() {
    let frame = Frame::new(1, RgbaImage::from_pixel(640, 480, BACKGROUND));
    let request = frame.detection_request(FrameEncoding::Jpeg).unwrap();
    assert_eq!(request.content_type, "image/jpeg");

    let mut service = FixedDetectionService::webcam().with_delay(std::time::Duration::ZERO);
    let batch = service.detect(&request).unwrap();
    let annotated = frame
        .annotate(batch, &insulator_inspect::Overlay::default())
        .unwrap();
    assert!(annotated.has_fault);
    assert_eq!(annotated.report.drawn, 2);
    assert_eq!(*annotated.image.get_pixel(150, 170), FAULT_STROKE);
}
