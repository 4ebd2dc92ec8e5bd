pub mod config;
pub mod detections;
pub mod report;

// Re-export vision types for convenience
pub use passfit_vision::{
    compliance, crop, detector, face, pipeline, standard, ComplianceResult, FaceDetectionResult,
    Outcome, PhotoStandard, Pipeline,
};
