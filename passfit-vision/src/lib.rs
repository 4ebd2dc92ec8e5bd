pub mod compliance;
pub mod crop;
pub mod detector;
pub mod face;
pub mod pipeline;
pub mod standard;

// Re-export commonly used types
pub use compliance::{
    evaluate, CheckId, ComplianceCheck, ComplianceEvaluator, ComplianceMetrics, ComplianceResult,
};
pub use crop::{crop_to_target, CropError, CropGeometry, CropTransformer};
pub use detector::{DetectionFilter, DetectorSession, FaceDetector, SessionState, StaticDetector};
pub use face::{BoundingBox, FaceDetectionResult, FaceLandmarks, Point2D};
pub use pipeline::{Outcome, Pipeline};
pub use standard::{PhotoStandard, PolicyError};
