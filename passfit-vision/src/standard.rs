//! Policy values for a photo standard.
//!
//! The defaults describe a 2x2 inch passport photo printed at 300 DPI. Every
//! value can be overridden so other identity-document standards can be
//! calibrated without touching the evaluator or the cropper.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::face::BoundingBox;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{name} must be a finite positive number, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be in (0, 1], got {value}")]
    NotFraction { name: &'static str, value: f64 },

    #[error("output size must be > 0")]
    ZeroOutputSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoStandard {
    /// Full head height (with hair) divided by detector box height.
    pub head_to_box_ratio: f64,
    /// Head height as a fraction of the output height.
    pub target_head_fraction: f64,
    /// Eye line position measured from the bottom of the output.
    pub target_eye_from_bottom: f64,
    /// Smallest estimated head height, in source pixels, that still crops
    /// without heavy upscaling.
    pub min_head_pixels: f64,
    /// Fraction of the needed framing margin that must be available.
    pub margin_tolerance: f64,
    pub max_center_offset_percent: f64,
    pub max_tilt_degrees: f64,
    /// Side of the square output in pixels.
    pub output_size: u32,
    pub dpi: u32,
}

impl Default for PhotoStandard {
    fn default() -> Self {
        Self {
            head_to_box_ratio: 1.25,
            target_head_fraction: 0.595,
            target_eye_from_bottom: 0.625,
            min_head_pixels: 150.0,
            margin_tolerance: 0.95,
            max_center_offset_percent: 10.0,
            max_tilt_degrees: 5.0,
            output_size: 600,
            dpi: 300,
        }
    }
}

impl PhotoStandard {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let positive = [
            ("head_to_box_ratio", self.head_to_box_ratio),
            ("min_head_pixels", self.min_head_pixels),
            ("max_center_offset_percent", self.max_center_offset_percent),
            ("max_tilt_degrees", self.max_tilt_degrees),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PolicyError::NotPositive { name, value });
            }
        }

        let fractions = [
            ("target_head_fraction", self.target_head_fraction),
            ("target_eye_from_bottom", self.target_eye_from_bottom),
            ("margin_tolerance", self.margin_tolerance),
        ];
        for (name, value) in fractions {
            // NaN fails both comparisons
            if !(value > 0.0 && value <= 1.0) {
                return Err(PolicyError::NotFraction { name, value });
            }
        }

        if self.output_size == 0 {
            return Err(PolicyError::ZeroOutputSize);
        }

        Ok(())
    }

    /// Head height including hair, estimated from the detector box.
    pub fn estimated_head_height(&self, bbox: &BoundingBox) -> f64 {
        bbox.height * self.head_to_box_ratio
    }

    /// Eye line position measured from the top of the output.
    pub fn eye_from_top(&self) -> f64 {
        1.0 - self.target_eye_from_bottom
    }

    /// Physical side of the printed output in inches.
    pub fn print_inches(&self) -> f64 {
        self.output_size as f64 / self.dpi.max(1) as f64
    }
}
