//! Crop and scale a compliant photo into the standard square output.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::face::{FaceDetectionResult, Point2D};
use crate::standard::{PhotoStandard, PolicyError};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum CropError {
    #[error("source image has zero width or height")]
    EmptySource,

    #[error("cannot derive a crop window (scale {0})")]
    DegenerateWindow(f64),

    #[error("cannot allocate a {size}x{size} output image")]
    Allocation { size: u32 },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Square source window and the output it is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub output_size: u32,
}

impl CropGeometry {
    /// Output pixels per source pixel.
    pub fn scale(&self) -> f64 {
        self.output_size as f64 / self.width
    }

    /// Map a source-image point into output coordinates.
    pub fn to_output(&self, p: Point2D) -> Point2D {
        let scale = self.scale();
        Point2D::new((p.x - self.x) * scale, (p.y - self.y) * scale)
    }

    /// Whether the window lies inside the source image, up to float rounding.
    pub fn fits_within(&self, source_width: u32, source_height: u32) -> bool {
        const EPS: f64 = 1e-6;
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= source_width as f64 + EPS
            && self.y + self.height <= source_height as f64 + EPS
    }
}

/// Crop with the default passport standard.
pub fn crop_to_target(
    img: &DynamicImage,
    face: &FaceDetectionResult,
) -> Result<RgbImage, CropError> {
    CropTransformer::default().crop_to_target(img, face)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CropTransformer {
    standard: PhotoStandard,
}

impl CropTransformer {
    pub fn new(standard: PhotoStandard) -> Self {
        Self { standard }
    }

    pub fn standard(&self) -> &PhotoStandard {
        &self.standard
    }

    /// Compute the source window that places the eye line and head height at
    /// their target positions, translated (and only if unavoidable, shrunk)
    /// to stay inside the source image.
    pub fn geometry(
        &self,
        source_width: u32,
        source_height: u32,
        face: &FaceDetectionResult,
    ) -> Result<CropGeometry, CropError> {
        self.standard.validate()?;
        if source_width == 0 || source_height == 0 {
            return Err(CropError::EmptySource);
        }

        let output = self.standard.output_size as f64;
        let (w, h) = (source_width as f64, source_height as f64);

        let target_head = output * self.standard.target_head_fraction;
        let scale = target_head / self.standard.estimated_head_height(&face.bounding_box);
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CropError::DegenerateWindow(scale));
        }

        let eye = face.landmarks.eye_center();
        let mut side = output / scale;
        if side > w.min(h) {
            debug!(
                "crop window {:.1}px exceeds source {}x{}, shrinking",
                side, source_width, source_height
            );
            side = w.min(h);
        }

        // Eye centre at the horizontal midpoint and on the target eye line
        let ideal_x = eye.x - side / 2.0;
        let ideal_y = eye.y - side * self.standard.eye_from_top();

        let x = ideal_x.clamp(0.0, w - side);
        let y = ideal_y.clamp(0.0, h - side);
        if x != ideal_x || y != ideal_y {
            debug!(
                "crop window moved from ({:.1}, {:.1}) to ({:.1}, {:.1})",
                ideal_x, ideal_y, x, y
            );
        }

        Ok(CropGeometry {
            x,
            y,
            width: side,
            height: side,
            output_size: self.standard.output_size,
        })
    }

    /// Render the normalized square photo on a white background.
    pub fn crop_to_target(
        &self,
        img: &DynamicImage,
        face: &FaceDetectionResult,
    ) -> Result<RgbImage, CropError> {
        let (img_w, img_h) = img.dimensions();
        let geometry = self.geometry(img_w, img_h, face)?;
        render(&img.to_rgb8(), &geometry)
    }
}

/// Allocate a white `size` x `size` canvas without panicking on huge sizes.
fn white_canvas(size: u32) -> Result<RgbImage, CropError> {
    let len = (size as usize)
        .checked_mul(size as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or(CropError::Allocation { size })?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CropError::Allocation { size })?;
    buf.resize(len, WHITE[0]);

    RgbImage::from_raw(size, size, buf).ok_or(CropError::Allocation { size })
}

/// Draw the geometry's source window scaled to fill a white output square.
pub fn render(src: &RgbImage, geometry: &CropGeometry) -> Result<RgbImage, CropError> {
    let size = geometry.output_size;
    let (img_w, img_h) = src.dimensions();
    let mut output = white_canvas(size)?;
    let step = geometry.width / size as f64;

    for out_y in 0..size {
        // Map output pixel centres back to source pixel centres
        let in_y = (geometry.y + (out_y as f64 + 0.5) * step - 0.5).max(0.0);
        if !(in_y < img_h as f64) {
            continue;
        }
        for out_x in 0..size {
            let in_x = (geometry.x + (out_x as f64 + 0.5) * step - 0.5).max(0.0);
            if !(in_x < img_w as f64) {
                continue;
            }
            output.put_pixel(out_x, out_y, bilinear(src, in_x, in_y));
        }
    }

    Ok(output)
}

fn bilinear(src: &RgbImage, in_x: f64, in_y: f64) -> Rgb<u8> {
    let (img_w, img_h) = src.dimensions();
    let x0 = in_x.floor() as u32;
    let y0 = in_y.floor() as u32;
    let x1 = (x0 + 1).min(img_w - 1);
    let y1 = (y0 + 1).min(img_h - 1);

    let fx = in_x - x0 as f64;
    let fy = in_y - y0 as f64;

    let p00 = src.get_pixel(x0, y0);
    let p10 = src.get_pixel(x1, y0);
    let p01 = src.get_pixel(x0, y1);
    let p11 = src.get_pixel(x1, y1);

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    let channel = |c: usize| {
        (p00[c] as f64 * w00 + p10[c] as f64 * w10 + p01[c] as f64 * w01 + p11[c] as f64 * w11)
            .round() as u8
    };

    Rgb([channel(0), channel(1), channel(2)])
}
