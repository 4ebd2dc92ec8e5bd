//! Geometric compliance checks for a single identity photo.
//!
//! Checks run in a fixed order which is also the display order:
//! face count, head size, framing margin, head tilt, horizontal centering.
//! A failed face count ends the evaluation with only that check reported.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::face::FaceDetectionResult;
use crate::standard::PhotoStandard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckId {
    FaceCount,
    HeadSize,
    /// Framing margin around the face. The id is historical: the check does
    /// not threshold the eye height itself.
    EyeHeight,
    HeadTilt,
    HorizontalCentering,
}

impl CheckId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckId::FaceCount => "face-count",
            CheckId::HeadSize => "head-size",
            CheckId::EyeHeight => "eye-height",
            CheckId::HeadTilt => "head-tilt",
            CheckId::HorizontalCentering => "horizontal-centering",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckId::FaceCount => "Single face",
            CheckId::HeadSize => "Head size",
            CheckId::EyeHeight => "Framing margin",
            CheckId::HeadTilt => "Head tilt",
            CheckId::HorizontalCentering => "Horizontal centering",
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub id: CheckId,
    pub label: String,
    pub passed: bool,
    pub message: String,
}

impl ComplianceCheck {
    fn new(id: CheckId, passed: bool, message: String) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            passed,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComplianceMetrics {
    pub face_count: usize,
    pub head_height_percent: f64,
    /// Eye centre height measured from the bottom of the image.
    pub eye_height_percent: f64,
    pub head_tilt_degrees: f64,
    pub horizontal_center_offset_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub passed: bool,
    pub checks: Vec<ComplianceCheck>,
    pub metrics: ComplianceMetrics,
    /// The single detected face. Present whenever the face count check passed,
    /// even if later checks failed.
    pub face_data: Option<FaceDetectionResult>,
}

impl ComplianceResult {
    pub fn check(&self, id: CheckId) -> Option<&ComplianceCheck> {
        self.checks.iter().find(|c| c.id == id)
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &ComplianceCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// The most actionable failure: a face count failure if there is one,
    /// otherwise the first failing check in display order.
    pub fn primary_failure(&self) -> Option<&ComplianceCheck> {
        self.checks
            .iter()
            .find(|c| c.id == CheckId::FaceCount && !c.passed)
            .or_else(|| self.failed_checks().next())
    }
}

/// Evaluate with the default passport standard.
pub fn evaluate(
    image_width: u32,
    image_height: u32,
    faces: &[FaceDetectionResult],
) -> ComplianceResult {
    ComplianceEvaluator::default().evaluate(image_width, image_height, faces)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceEvaluator {
    standard: PhotoStandard,
}

impl ComplianceEvaluator {
    pub fn new(standard: PhotoStandard) -> Self {
        Self { standard }
    }

    pub fn standard(&self) -> &PhotoStandard {
        &self.standard
    }

    pub fn evaluate(
        &self,
        image_width: u32,
        image_height: u32,
        faces: &[FaceDetectionResult],
    ) -> ComplianceResult {
        let mut metrics = ComplianceMetrics {
            face_count: faces.len(),
            ..Default::default()
        };

        let face = match faces {
            [face] => face,
            _ => {
                let check = face_count_check(faces.len());
                debug!("{}: {}", check.id, check.message);
                return ComplianceResult {
                    passed: false,
                    checks: vec![check],
                    metrics,
                    face_data: None,
                };
            }
        };

        let width = image_width as f64;
        let height = image_height as f64;
        let eye_center = face.landmarks.eye_center();
        let head_height = self.standard.estimated_head_height(&face.bounding_box);
        let tilt = tilt_degrees(face);
        let offset_px = face.bounding_box.center_x() - width / 2.0;

        metrics.head_height_percent = head_height / height * 100.0;
        metrics.eye_height_percent = (height - eye_center.y) / height * 100.0;
        metrics.head_tilt_degrees = tilt;
        metrics.horizontal_center_offset_percent = offset_px.abs() / width * 100.0;

        let checks = vec![
            face_count_check(1),
            self.head_size_check(head_height, metrics.head_height_percent),
            self.framing_check(head_height, eye_center.y, height),
            self.tilt_check(tilt),
            self.centering_check(metrics.horizontal_center_offset_percent, offset_px),
        ];

        for check in &checks {
            debug!(
                "{}: {} ({})",
                check.id,
                if check.passed { "pass" } else { "fail" },
                check.message
            );
        }

        ComplianceResult {
            passed: checks.iter().all(|c| c.passed),
            checks,
            metrics,
            face_data: Some(*face),
        }
    }

    fn head_size_check(&self, head_height: f64, head_percent: f64) -> ComplianceCheck {
        let min = self.standard.min_head_pixels;
        if head_height >= min {
            ComplianceCheck::new(
                CheckId::HeadSize,
                true,
                format!(
                    "Head size is sufficient ({:.0}px, {:.1}% of image height)",
                    head_height, head_percent
                ),
            )
        } else {
            ComplianceCheck::new(
                CheckId::HeadSize,
                false,
                format!(
                    "Head is too small ({:.0}px, minimum {:.0}px). Move closer to the camera or use a higher resolution photo.",
                    head_height, min
                ),
            )
        }
    }

    fn framing_check(&self, head_height: f64, eye_y: f64, image_height: f64) -> ComplianceCheck {
        let s = &self.standard;
        let crop_height = head_height / s.target_head_fraction;
        let needed_above = crop_height * s.eye_from_top();
        let needed_below = crop_height * s.target_eye_from_bottom;

        let short_above = eye_y < needed_above * s.margin_tolerance;
        let short_below = image_height - eye_y < needed_below * s.margin_tolerance;

        let message = match (short_above, short_below) {
            (false, false) => "Enough space around the head for cropping".to_string(),
            (true, false) => {
                "Not enough space above head. Step back or include more space above your head."
                    .to_string()
            }
            (false, true) => {
                "Not enough space below chin. Step back or include your shoulders in the frame."
                    .to_string()
            }
            (true, true) => {
                "Not enough space above head or below chin. Step back from the camera."
                    .to_string()
            }
        };

        ComplianceCheck::new(CheckId::EyeHeight, !short_above && !short_below, message)
    }

    fn tilt_check(&self, tilt: f64) -> ComplianceCheck {
        let max = self.standard.max_tilt_degrees;
        if tilt <= max {
            ComplianceCheck::new(
                CheckId::HeadTilt,
                true,
                format!("Head is level ({:.1}°)", tilt),
            )
        } else {
            ComplianceCheck::new(
                CheckId::HeadTilt,
                false,
                format!(
                    "Head is tilted {:.1}° (maximum {:.1}°). Keep your head straight.",
                    tilt, max
                ),
            )
        }
    }

    fn centering_check(&self, offset_percent: f64, offset_px: f64) -> ComplianceCheck {
        let max = self.standard.max_center_offset_percent;
        if offset_percent <= max {
            return ComplianceCheck::new(
                CheckId::HorizontalCentering,
                true,
                format!("Face is centered ({:.1}% offset)", offset_percent),
            );
        }

        let side = if offset_px < 0.0 { "left" } else { "right" };
        ComplianceCheck::new(
            CheckId::HorizontalCentering,
            false,
            format!(
                "Face is {:.1}% {} of center (maximum {:.1}%). Center your face in the frame.",
                offset_percent, side, max
            ),
        )
    }
}

fn face_count_check(count: usize) -> ComplianceCheck {
    match count {
        0 => ComplianceCheck::new(
            CheckId::FaceCount,
            false,
            "No face detected. Make sure your face is clearly visible.".to_string(),
        ),
        1 => ComplianceCheck::new(
            CheckId::FaceCount,
            true,
            "Exactly one face detected".to_string(),
        ),
        n => ComplianceCheck::new(
            CheckId::FaceCount,
            false,
            format!(
                "Multiple faces detected ({}). Only one person should be in the photo.",
                n
            ),
        ),
    }
}

/// Deviation of the eye line from horizontal in degrees, independent of
/// which eye the detector reports first.
///
/// Same value as folding `atan2(dy, dx)` into [0, 90] (`180 - |a|` when
/// `|a| > 90`), but computed on absolute deltas so swapping the eyes gives
/// bit-identical results.
pub fn tilt_degrees(face: &FaceDetectionResult) -> f64 {
    let left = face.landmarks.left_eye;
    let right = face.landmarks.right_eye;
    let dx = (right.x - left.x).abs();
    let dy = (right.y - left.y).abs();
    dy.atan2(dx).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{BoundingBox, FaceLandmarks, Point2D};

    fn face(bbox: BoundingBox, left_eye: Point2D, right_eye: Point2D) -> FaceDetectionResult {
        FaceDetectionResult {
            bounding_box: bbox,
            landmarks: FaceLandmarks {
                left_eye,
                right_eye,
                nose: Point2D::new(bbox.center_x(), bbox.center_y()),
                mouth: Point2D::new(bbox.center_x(), bbox.origin_y + bbox.height * 0.8),
            },
            confidence: 0.99,
        }
    }

    fn compliant() -> FaceDetectionResult {
        face(
            BoundingBox::new(380.0, 350.0, 240.0, 300.0),
            Point2D::new(440.0, 450.0),
            Point2D::new(560.0, 450.0),
        )
    }

    #[test]
    fn zero_faces_short_circuits() {
        let result = evaluate(1000, 1000, &[]);
        assert!(!result.passed);
        assert_eq!(result.checks.len(), 1);
        assert_eq!(result.checks[0].id, CheckId::FaceCount);
        assert!(result.checks[0].message.contains("No face"));
        assert_eq!(result.metrics, ComplianceMetrics::default());
        assert!(result.face_data.is_none());
    }

    #[test]
    fn multiple_faces_short_circuits() {
        let result = evaluate(1000, 1000, &[compliant(), compliant(), compliant()]);
        assert!(!result.passed);
        assert_eq!(result.checks.len(), 1);
        assert_eq!(result.metrics.face_count, 3);
        assert_eq!(result.metrics.head_height_percent, 0.0);
        assert!(result.checks[0].message.contains("(3)"));
    }

    #[test]
    fn compliant_metrics() {
        let result = evaluate(1000, 1000, &[compliant()]);
        assert!(result.passed, "{:?}", result.checks);
        assert_eq!(result.checks.len(), 5);
        assert!((result.metrics.head_height_percent - 37.5).abs() < 1e-9);
        assert!((result.metrics.eye_height_percent - 55.0).abs() < 1e-9);
        assert_eq!(result.metrics.head_tilt_degrees, 0.0);
        assert_eq!(result.metrics.horizontal_center_offset_percent, 0.0);
        assert_eq!(result.face_data, Some(compliant()));
    }

    #[test]
    fn tilt_normalization_handles_swapped_eyes() {
        let a = face(
            BoundingBox::new(380.0, 350.0, 240.0, 300.0),
            Point2D::new(440.0, 440.0),
            Point2D::new(560.0, 470.0),
        );
        let b = face(a.bounding_box, a.landmarks.right_eye, a.landmarks.left_eye);
        assert_eq!(tilt_degrees(&a), tilt_degrees(&b));
        assert!(tilt_degrees(&a) < 90.0);
    }

    #[test]
    fn tilt_matches_folded_atan2() {
        let folded = |dx: f64, dy: f64| {
            let angle = dy.atan2(dx).to_degrees().abs();
            if angle > 90.0 {
                180.0 - angle
            } else {
                angle
            }
        };
        for (dx, dy) in [(120.0, 20.0), (-120.0, 20.0), (-50.0, -80.0), (30.0, -2.0)] {
            let f = face(
                BoundingBox::new(0.0, 0.0, 100.0, 100.0),
                Point2D::new(0.0, 0.0),
                Point2D::new(dx, dy),
            );
            assert!((tilt_degrees(&f) - folded(dx, dy)).abs() < 1e-9);
        }
    }

    #[test]
    fn head_size_boundary() {
        let mut f = compliant();
        f.bounding_box.height = 120.0;
        let result = evaluate(1000, 1000, &[f]);
        assert!(result.check(CheckId::HeadSize).map_or(false, |c| c.passed));

        f.bounding_box.height = 119.99;
        let result = evaluate(1000, 1000, &[f]);
        assert!(!result.check(CheckId::HeadSize).map_or(true, |c| c.passed));
        // Metric is recorded on failure too: 119.99 * 1.25 / 1000
        assert!((result.metrics.head_height_percent - 14.99875).abs() < 1e-9);
    }

    #[test]
    fn framing_reports_both_sides() {
        // 875px head needs ~1470px of crop height, more than the whole image
        let mut f = compliant();
        f.bounding_box.origin_y = 150.0;
        f.bounding_box.height = 700.0;
        let result = evaluate(1000, 1000, &[f]);
        let check = result.check(CheckId::EyeHeight).cloned().unwrap();
        assert!(!check.passed);
        assert!(
            check.message.contains("above head or below chin"),
            "message: {}",
            check.message
        );
    }

    #[test]
    fn framing_reports_short_side() {
        // Eyes close to the top edge
        let mut f = compliant();
        f.landmarks.left_eye.y = 100.0;
        f.landmarks.right_eye.y = 100.0;
        let result = evaluate(1000, 1000, &[f]);
        let check = result.check(CheckId::EyeHeight).cloned().unwrap();
        assert!(!check.passed);
        assert!(check.message.contains("above head"));

        // Eyes close to the bottom edge
        f.landmarks.left_eye.y = 900.0;
        f.landmarks.right_eye.y = 900.0;
        let result = evaluate(1000, 1000, &[f]);
        let check = result.check(CheckId::EyeHeight).cloned().unwrap();
        assert!(!check.passed);
        assert!(check.message.contains("below chin"));
    }

    #[test]
    fn framing_tolerance_allows_five_percent_shortfall() {
        // needed_above = 375 / 0.595 * 0.375 ~= 236.3; 95% of that ~= 224.5
        let mut f = compliant();
        f.landmarks.left_eye.y = 230.0;
        f.landmarks.right_eye.y = 230.0;
        let result = evaluate(1000, 1000, &[f]);
        assert!(result.check(CheckId::EyeHeight).map_or(false, |c| c.passed));

        f.landmarks.left_eye.y = 220.0;
        f.landmarks.right_eye.y = 220.0;
        let result = evaluate(1000, 1000, &[f]);
        assert!(!result.check(CheckId::EyeHeight).map_or(true, |c| c.passed));
    }

    #[test]
    fn primary_failure_prefers_face_count() {
        let result = evaluate(1000, 1000, &[]);
        assert_eq!(
            result.primary_failure().map(|c| c.id),
            Some(CheckId::FaceCount)
        );

        let mut f = compliant();
        f.bounding_box.height = 100.0;
        f.bounding_box.origin_x = 600.0;
        let result = evaluate(1000, 1000, &[f]);
        assert_eq!(result.primary_failure().map(|c| c.id), Some(CheckId::HeadSize));
        assert_eq!(result.failed_checks().count(), 2);

        let result = evaluate(1000, 1000, &[compliant()]);
        assert!(result.primary_failure().is_none());
    }

    #[test]
    fn custom_standard_changes_thresholds() {
        let evaluator = ComplianceEvaluator::new(PhotoStandard {
            max_tilt_degrees: 1.0,
            ..Default::default()
        });
        let f = face(
            BoundingBox::new(380.0, 350.0, 240.0, 300.0),
            Point2D::new(440.0, 450.0),
            Point2D::new(560.0, 455.0),
        );
        let result = evaluator.evaluate(1000, 1000, &[f]);
        assert!(!result.check(CheckId::HeadTilt).map_or(true, |c| c.passed));
        assert!(evaluate(1000, 1000, &[f]).passed);
    }

    #[test]
    fn zero_dimensions_do_not_panic() {
        let result = evaluate(0, 0, &[compliant()]);
        assert!(!result.metrics.head_height_percent.is_finite());
        assert_eq!(result.checks.len(), 5);
    }

    #[test]
    fn check_ids_serialize_kebab_case() {
        assert_eq!(CheckId::HorizontalCentering.as_str(), "horizontal-centering");
        assert_eq!(CheckId::EyeHeight.to_string(), "eye-height");
    }
}
