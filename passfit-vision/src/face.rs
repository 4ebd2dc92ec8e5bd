use serde::{Deserialize, Serialize};

/// A point in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point2D) -> Point2D {
        Point2D {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Detector face region: forehead to chin, cheek to cheek. Hair is not included.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    pub fn center_x(&self) -> f64 {
        self.origin_x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.origin_y + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: Point2D,
    pub right_eye: Point2D,
    pub nose: Point2D,
    pub mouth: Point2D,
}

impl FaceLandmarks {
    /// Midpoint between the two eyes.
    pub fn eye_center(&self) -> Point2D {
        self.left_eye.midpoint(self.right_eye)
    }
}

/// One face reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceDetectionResult {
    pub bounding_box: BoundingBox,
    pub landmarks: FaceLandmarks,
    #[serde(default)]
    pub confidence: f64,
}

impl FaceDetectionResult {
    /// Convert detector-native coordinates in [0, 1] to pixels of a
    /// `width` x `height` image.
    pub fn denormalize(&self, width: u32, height: u32) -> FaceDetectionResult {
        let (w, h) = (width as f64, height as f64);
        let point = |p: Point2D| Point2D::new(p.x * w, p.y * h);
        let b = &self.bounding_box;

        FaceDetectionResult {
            bounding_box: BoundingBox::new(b.origin_x * w, b.origin_y * h, b.width * w, b.height * h),
            landmarks: FaceLandmarks {
                left_eye: point(self.landmarks.left_eye),
                right_eye: point(self.landmarks.right_eye),
                nose: point(self.landmarks.nose),
                mouth: point(self.landmarks.mouth),
            },
            confidence: self.confidence,
        }
    }
}

/// Intersection over union of two face boxes.
pub fn compute_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x1 = a.origin_x.max(b.origin_x);
    let y1 = a.origin_y.max(b.origin_y);
    let x2 = (a.origin_x + a.width).min(b.origin_x + b.width);
    let y2 = (a.origin_y + a.height).min(b.origin_y + b.height);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    let area_a = a.width * a.height;
    let area_b = b.width * b.height;
    inter / (area_a + area_b - inter)
}

/// Apply non-maximum suppression to remove overlapping detections
pub fn nms(detections: &[FaceDetectionResult], iou_threshold: f64) -> Vec<FaceDetectionResult> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceDetectionResult> = Vec::new();
    for candidate in sorted {
        let overlaps = keep
            .iter()
            .any(|kept| compute_iou(&kept.bounding_box, &candidate.bounding_box) > iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }

    keep
}
