use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, RgbImage};
use log::{info, warn};

use crate::compliance::{ComplianceEvaluator, ComplianceResult};
use crate::crop::CropTransformer;
use crate::detector::{DetectorSession, FaceDetector};
use crate::standard::PhotoStandard;

/// Result of running one photo through the pipeline.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: ComplianceResult,
    /// Normalized square photo, present only when a crop was produced.
    pub normalized: Option<RgbImage>,
}

/// Full pipeline: detect faces → evaluate compliance → crop
pub struct Pipeline<D> {
    pub session: DetectorSession<D>,
    evaluator: ComplianceEvaluator,
    transformer: CropTransformer,
}

impl<D: FaceDetector> Pipeline<D> {
    pub fn new(session: DetectorSession<D>, standard: PhotoStandard) -> Result<Self> {
        standard.validate().context("invalid photo standard")?;
        Ok(Self {
            session,
            evaluator: ComplianceEvaluator::new(standard),
            transformer: CropTransformer::new(standard),
        })
    }

    pub fn evaluate(&mut self, img: &DynamicImage) -> Result<ComplianceResult> {
        let (width, height) = img.dimensions();
        let faces = self.session.detect(img).context("detecting faces")?;
        info!("{} face(s) detected in {}x{} image", faces.len(), width, height);

        let result = self.evaluator.evaluate(width, height, &faces);
        if let Some(failure) = result.primary_failure() {
            warn!("{}: {}", failure.id, failure.message);
        }
        Ok(result)
    }

    /// Evaluate the photo and crop it when it passes every check.
    pub fn process(&mut self, img: &DynamicImage) -> Result<Outcome> {
        let result = self.evaluate(img)?;
        let normalized = match (&result.face_data, result.passed) {
            (Some(face), true) => Some(
                self.transformer
                    .crop_to_target(img, face)
                    .context("cropping photo")?,
            ),
            _ => None,
        };
        Ok(Outcome { result, normalized })
    }

    /// Crop regardless of the verdict, as long as exactly one face was found.
    pub fn process_forced(&mut self, img: &DynamicImage) -> Result<Outcome> {
        let result = self.evaluate(img)?;
        let normalized = match &result.face_data {
            Some(face) => Some(
                self.transformer
                    .crop_to_target(img, face)
                    .context("cropping photo")?,
            ),
            None => None,
        };
        Ok(Outcome { result, normalized })
    }
}
