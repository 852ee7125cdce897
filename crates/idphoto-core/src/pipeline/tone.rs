//! Brightness and contrast adjustment.

use image::{DynamicImage, RgbImage};

use crate::config::ContrastPivot;
use crate::types::ToneParams;

const MID_GRAY: f32 = 128.0;

/// Applies brightness then contrast to 8-bit RGB images.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneAdjuster {
    pivot: ContrastPivot,
}

impl ToneAdjuster {
    pub fn new(pivot: ContrastPivot) -> Self {
        Self { pivot }
    }

    /// Adjust an image. A factor of exactly 1.0 skips its step.
    pub fn adjust(&self, image: DynamicImage, tone: &ToneParams) -> DynamicImage {
        if tone.is_identity() {
            return image;
        }

        let mut rgb = image.into_rgb8();

        if tone.brightness != 1.0 {
            let lut = build_lut(|v| v * tone.brightness);
            apply_lut(&mut rgb, &lut);
        }

        if tone.contrast != 1.0 {
            let pivot = match self.pivot {
                ContrastPivot::MidGray => MID_GRAY,
                ContrastPivot::MeanLuminance => mean_luma(&rgb),
            };
            let lut = build_lut(|v| pivot + (v - pivot) * tone.contrast);
            apply_lut(&mut rgb, &lut);
        }

        DynamicImage::ImageRgb8(rgb)
    }
}

fn build_lut(f: impl Fn(f32) -> f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = f(i as f32).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn apply_lut(image: &mut RgbImage, lut: &[u8; 256]) {
    for value in image.iter_mut() {
        *value = lut[*value as usize];
    }
}

/// Rounded mean of ITU-R 601 luma.
fn mean_luma(image: &RgbImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return MID_GRAY;
    }
    let total: u64 = image
        .pixels()
        .map(|p| (p[0] as u64 * 299 + p[1] as u64 * 587 + p[2] as u64 * 114) / 1000)
        .sum();
    (total as f64 / count as f64).round() as f32
}
