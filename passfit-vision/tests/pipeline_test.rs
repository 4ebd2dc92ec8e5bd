use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use passfit_vision::{
    BoundingBox, DetectionFilter, DetectorSession, FaceDetectionResult, FaceLandmarks,
    PhotoStandard, Pipeline, Point2D, SessionState, StaticDetector,
};

fn portrait() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 1000, Rgb([200, 180, 160])))
}

fn face(offset_x: f64, confidence: f64) -> FaceDetectionResult {
    FaceDetectionResult {
        bounding_box: BoundingBox::new(380.0 + offset_x, 330.0, 240.0, 300.0),
        landmarks: FaceLandmarks {
            left_eye: Point2D::new(440.0 + offset_x, 450.0),
            right_eye: Point2D::new(560.0 + offset_x, 450.0),
            nose: Point2D::new(500.0 + offset_x, 520.0),
            mouth: Point2D::new(500.0 + offset_x, 580.0),
        },
        confidence,
    }
}

#[test]
fn test_pipeline_crops_compliant_photo() -> Result<()> {
    env_logger::try_init().ok();
    let session = DetectorSession::open(StaticDetector::new(vec![face(0.0, 0.95)]));
    let mut pipeline = Pipeline::new(session, PhotoStandard::default())?;

    let outcome = pipeline.process(&portrait())?;
    assert!(outcome.result.passed);
    let normalized = outcome.normalized.expect("compliant photo is cropped");
    assert_eq!(normalized.dimensions(), (600, 600));
    assert_eq!(pipeline.session.state(), SessionState::Ready);

    pipeline.session.close();
    assert!(pipeline.process(&portrait()).is_err());
    Ok(())
}

#[test]
fn test_pipeline_skips_crop_on_failure() -> Result<()> {
    let session = DetectorSession::open(StaticDetector::new(vec![face(150.0, 0.95)]));
    let mut pipeline = Pipeline::new(session, PhotoStandard::default())?;

    let outcome = pipeline.process(&portrait())?;
    assert!(!outcome.result.passed);
    assert!(outcome.result.face_data.is_some());
    assert!(outcome.normalized.is_none());

    // Forced crop still works since exactly one face was found
    let outcome = pipeline.process_forced(&portrait())?;
    assert!(!outcome.result.passed);
    assert!(outcome.normalized.is_some());
    Ok(())
}

#[test]
fn test_filter_runs_before_face_count() -> Result<()> {
    // A low-confidence ghost detection would otherwise fail the face count
    let faces = vec![face(0.0, 0.95), face(-300.0, 0.1)];

    let session = DetectorSession::open(StaticDetector::new(faces.clone()));
    let mut pipeline = Pipeline::new(session, PhotoStandard::default())?;
    assert_eq!(pipeline.evaluate(&portrait())?.metrics.face_count, 2);

    let session = DetectorSession::open(StaticDetector::new(faces)).with_filter(DetectionFilter {
        min_confidence: 0.5,
        nms_threshold: None,
    });
    let mut pipeline = Pipeline::new(session, PhotoStandard::default())?;
    let result = pipeline.evaluate(&portrait())?;
    assert_eq!(result.metrics.face_count, 1);
    assert!(result.passed);
    Ok(())
}
