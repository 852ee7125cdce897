//! EXIF metadata extraction from source bytes.

use exif::{In, Reader, Tag};
use image::ImageFormat;
use std::io::Cursor;

use crate::types::ExifData;

/// Result of asking a decoded image for its EXIF block.
#[derive(Debug, Clone, PartialEq)]
pub enum ExifProbe {
    /// An EXIF block was found and parsed
    Present(ExifData),
    /// The container carries no EXIF block
    Absent,
    /// An EXIF block exists but could not be parsed
    Malformed(String),
}

impl ExifProbe {
    /// Orientation tag value, if the block has one.
    pub fn orientation(&self) -> Option<u32> {
        match self {
            ExifProbe::Present(data) => data.orientation,
            _ => None,
        }
    }
}

/// Extracts EXIF metadata from image bytes.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Probe raw source bytes for EXIF data.
    ///
    /// Containers the EXIF reader cannot parse (GIF, BMP) are reported as
    /// `Absent` rather than malformed.
    pub fn probe(bytes: &[u8], format: ImageFormat) -> ExifProbe {
        if !Self::can_carry_exif(format) {
            return ExifProbe::Absent;
        }

        let mut cursor = Cursor::new(bytes);
        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return ExifProbe::Absent,
            Err(e) => return ExifProbe::Malformed(e.to_string()),
        };

        let orientation = match exif.get_field(Tag::Orientation, In::PRIMARY) {
            Some(field) => match field.value.get_uint(0) {
                Some(value) => Some(value),
                None => {
                    return ExifProbe::Malformed(format!(
                        "orientation tag has non-integer value {}",
                        field.display_value()
                    ))
                }
            },
            None => None,
        };

        ExifProbe::Present(ExifData { orientation })
    }

    fn can_carry_exif(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::with_orientation;
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn plain_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(8, 4));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_probe_without_exif_is_absent() {
        assert_eq!(
            MetadataExtractor::probe(&plain_jpeg(), ImageFormat::Jpeg),
            ExifProbe::Absent
        );
    }

    #[test]
    fn test_probe_reads_orientation() {
        let bytes = with_orientation(&plain_jpeg(), 6);
        let probe = MetadataExtractor::probe(&bytes, ImageFormat::Jpeg);
        assert_eq!(probe.orientation(), Some(6));
        assert_eq!(
            probe,
            ExifProbe::Present(ExifData {
                orientation: Some(6)
            })
        );
    }

    #[test]
    fn test_probe_gif_is_absent() {
        assert_eq!(
            MetadataExtractor::probe(b"GIF89a", ImageFormat::Gif),
            ExifProbe::Absent
        );
    }

    #[test]
    fn test_probe_truncated_exif_is_malformed() {
        let jpeg = plain_jpeg();
        let mut bytes = jpeg[..2].to_vec();
        // APP1 claiming an Exif payload whose TIFF header is garbage
        let payload = b"Exif\x00\x00XX\x00\x00";
        bytes.extend_from_slice(&[0xFF, 0xE1]);
        bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&jpeg[2..]);

        let probe = MetadataExtractor::probe(&bytes, ImageFormat::Jpeg);
        assert!(matches!(probe, ExifProbe::Malformed(_)), "{probe:?}");
    }
}
