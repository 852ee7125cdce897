//! EXIF orientation correction.
//!
//! Tag values follow the usual 1-8 table. Rotations below are expressed in the
//! `image` crate's terms, where `rotate90` is a clockwise quarter turn.

use image::DynamicImage;
use serde::Serialize;

use super::metadata::ExifProbe;

/// The eight EXIF orientation values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90Cw,
    Transverse,
    Rotate90Ccw,
}

impl Orientation {
    pub fn from_exif(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Normal,
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            5 => Self::Transpose,
            6 => Self::Rotate90Cw,
            7 => Self::Transverse,
            8 => Self::Rotate90Ccw,
            _ => return None,
        })
    }

    /// Bring stored pixels upright.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => image,
            Self::FlipHorizontal => image.fliph(),
            Self::Rotate180 => image.rotate180(),
            Self::FlipVertical => image.flipv(),
            Self::Transpose => image.fliph().rotate270(),
            Self::Rotate90Cw => image.rotate90(),
            Self::Transverse => image.fliph().rotate90(),
            Self::Rotate90Ccw => image.rotate270(),
        }
    }
}

/// What orientation correction did to an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrientationOutcome {
    /// No metadata, no orientation tag, or tag value 1
    Unchanged,
    /// Tag applied; `extra_rotation` is set when the landscape-to-portrait
    /// heuristic added a counter-clockwise quarter turn
    Corrected {
        orientation: u32,
        extra_rotation: bool,
    },
    /// Metadata unusable; image left as decoded
    Fallback { reason: String },
}

/// An image after orientation correction.
pub struct Oriented {
    pub image: DynamicImage,
    pub outcome: OrientationOutcome,
}

/// Ratio change above which the landscape-to-portrait heuristic considers
/// the correction suspicious.
const RATIO_TOLERANCE: f64 = 0.01;

/// Applies EXIF orientation. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrientationCorrector;

impl OrientationCorrector {
    pub fn correct(&self, image: DynamicImage, exif: &ExifProbe) -> Oriented {
        let value = match exif {
            ExifProbe::Absent => return Self::unchanged(image),
            ExifProbe::Malformed(reason) => {
                tracing::warn!("Ignoring malformed EXIF block: {}", reason);
                return Self::fallback(image, format!("malformed metadata: {reason}"));
            }
            ExifProbe::Present(data) => match data.orientation {
                Some(value) => value,
                None => return Self::unchanged(image),
            },
        };

        let orientation = match Orientation::from_exif(value) {
            Some(Orientation::Normal) => return Self::unchanged(image),
            Some(o) => o,
            None => {
                tracing::warn!("Ignoring out-of-range orientation value {}", value);
                return Self::fallback(image, format!("orientation value {value} out of range"));
            }
        };

        let orig_ratio = ratio(&image);
        let mut image = orientation.apply(image);
        let final_ratio = ratio(&image);

        let extra_rotation = (orig_ratio - final_ratio).abs() > RATIO_TOLERANCE
            && final_ratio < 1.0
            && orig_ratio > 1.0;
        if extra_rotation {
            tracing::debug!(
                "Orientation {} turned landscape into portrait, rotating back",
                value
            );
            image = image.rotate270();
        }

        tracing::debug!(
            "Applied orientation {} ({}x{})",
            value,
            image.width(),
            image.height()
        );

        Oriented {
            image,
            outcome: OrientationOutcome::Corrected {
                orientation: value,
                extra_rotation,
            },
        }
    }

    fn unchanged(image: DynamicImage) -> Oriented {
        Oriented {
            image,
            outcome: OrientationOutcome::Unchanged,
        }
    }

    fn fallback(image: DynamicImage, reason: String) -> Oriented {
        Oriented {
            image,
            outcome: OrientationOutcome::Fallback { reason },
        }
    }
}

fn ratio(image: &DynamicImage) -> f64 {
    image.width() as f64 / image.height() as f64
}
