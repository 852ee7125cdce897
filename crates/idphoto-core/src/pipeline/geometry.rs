//! Aspect-preserving crop and resize to an exact print size.

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;

use crate::error::PipelineError;
use crate::types::SizeSpec;

/// Region of the source kept before the final resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centered crop that gives `(width, height)` the aspect ratio of
/// `(target_width, target_height)`, removing only the excess dimension.
///
/// Ratios are compared by cross-multiplication, so equal ratios are exact
/// and take the height branch. All four inputs must be non-zero.
pub fn plan_crop(width: u32, height: u32, target_width: u32, target_height: u32) -> CropRect {
    let (w, h) = (width as u64, height as u64);
    let (tw, th) = (target_width as u64, target_height as u64);

    if w * th > h * tw {
        let new_width = ((h * tw / th) as u32).clamp(1, width);
        CropRect {
            x: (width - new_width) / 2,
            y: 0,
            width: new_width,
            height,
        }
    } else {
        let new_height = ((w * th / tw) as u32).clamp(1, height);
        CropRect {
            x: 0,
            y: (height - new_height) / 2,
            width,
            height: new_height,
        }
    }
}

/// Scales, aligns, crops and resizes images to a [`SizeSpec`].
#[derive(Debug, Clone)]
pub struct GeometryTransformer {
    pre_shrink_max: u32,
}

impl GeometryTransformer {
    pub fn new(pre_shrink_max: u32) -> Self {
        Self { pre_shrink_max }
    }

    /// Produce an image of exactly `size.width x size.height`.
    pub fn fit(&self, image: DynamicImage, size: &SizeSpec) -> Result<DynamicImage, PipelineError> {
        size.validate()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }

        let mut image = image;

        let longest = image.width().max(image.height());
        if longest > self.pre_shrink_max {
            image = image.resize(self.pre_shrink_max, self.pre_shrink_max, FilterType::Lanczos3);
            tracing::trace!(
                "  Pre-shrink: {}x{} (longest side was {})",
                image.width(),
                image.height(),
                longest
            );
        }

        let source_portrait = image.height() > image.width();
        if source_portrait != size.is_portrait() {
            image = image.rotate90();
            tracing::trace!("  Pre-align: rotated to {}x{}", image.width(), image.height());
        }

        let crop = plan_crop(image.width(), image.height(), size.width, size.height);
        tracing::trace!("  Crop: {:?}", crop);
        let cropped = image.crop_imm(crop.x, crop.y, crop.width, crop.height);

        let resized = cropped.resize_exact(size.width, size.height, FilterType::Lanczos3);

        if resized.width() != size.width || resized.height() != size.height {
            return Err(PipelineError::Transform(format!(
                "resize produced {}x{}, expected {}x{}",
                resized.width(),
                resized.height(),
                size.width,
                size.height
            )));
        }

        Ok(resized)
    }
}

impl Default for GeometryTransformer {
    fn default() -> Self {
        Self::new(crate::config::TransformConfig::default().pre_shrink_max)
    }
}
