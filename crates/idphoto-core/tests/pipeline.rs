//! End-to-end tests for the transform pipeline and its cache.
//!
//! Run with: `cargo test -p idphoto-core --test pipeline`

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use idphoto_core::cache::{CacheKey, ManualClock};
use idphoto_core::pipeline::{plan_crop, CropRect, GeometryTransformer, Hasher, PhotoEncoder};
use idphoto_core::{
    CacheStatus, Config, OrientationOutcome, PipelineError, SizeSpec, ToneParams,
    TransformPipeline,
};

const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.cache.dir = dir.join("cache").to_string_lossy().into_owned();
    config
}

fn pipeline(tmp: &TempDir) -> TransformPipeline {
    TransformPipeline::new(&config_in(tmp.path())).unwrap()
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Square image with a distinct saturated color in each quadrant.
fn quadrants(side: u32) -> DynamicImage {
    let half = side / 2;
    DynamicImage::ImageRgb8(RgbImage::from_fn(side, side, |x, y| {
        match (x < half, y < half) {
            (true, true) => Rgb([255, 0, 0]),
            (false, true) => Rgb([0, 255, 0]),
            (true, false) => Rgb([0, 0, 255]),
            (false, false) => Rgb([255, 255, 255]),
        }
    }))
}

#[derive(Debug, PartialEq)]
enum Color {
    Red,
    Green,
    Blue,
    White,
    Other,
}

fn classify(p: &Rgb<u8>) -> Color {
    let [r, g, b] = p.0;
    match (r > 180, g > 180, b > 180) {
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (false, false, true) => Color::Blue,
        (true, true, true) => Color::White,
        _ => Color::Other,
    }
}

/// Pixels as a camera would store an upright scene under EXIF `orientation`.
fn stored_as(orientation: u16, upright: &DynamicImage) -> DynamicImage {
    match orientation {
        2 => upright.fliph(),
        3 => upright.rotate180(),
        4 => upright.flipv(),
        5 => upright.rotate90().fliph(),
        6 => upright.rotate270(),
        7 => upright.rotate270().fliph(),
        8 => upright.rotate90(),
        _ => upright.clone(),
    }
}

/// Insert an APP1 Exif segment carrying only an Orientation tag after SOI.
fn with_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2A");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0112u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let mut payload = b"Exif\x00\x00".to_vec();
    payload.extend_from_slice(&tiff);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

#[test]
fn test_output_matches_every_catalog_size() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);
    let sources = [
        encode(&gradient(800, 600), ImageFormat::Png),
        encode(&gradient(600, 800), ImageFormat::Jpeg),
        encode(&gradient(1500, 400), ImageFormat::Png),
    ];

    for size in pipeline.catalog().list().to_vec() {
        for source in &sources {
            let photo = pipeline
                .process(source, &size, &ToneParams::default())
                .unwrap();
            let decoded = image::load_from_memory(&photo.bytes).unwrap();
            assert_eq!(
                (decoded.width(), decoded.height()),
                (size.width, size.height),
                "size {}",
                size.id
            );
            assert_eq!(photo.content_type, "image/jpeg");
        }
    }
}

#[test]
fn test_crop_keeps_the_center_of_a_tall_source() {
    // 413x1000 portrait: blue bands top and bottom, green in the middle.
    // 一寸 keeps rows 211..789.
    let img = RgbImage::from_fn(413, 1000, |_, y| {
        if (200..800).contains(&y) {
            Rgb([0, 255, 0])
        } else {
            Rgb([0, 0, 255])
        }
    });
    let source = encode(&DynamicImage::ImageRgb8(img), ImageFormat::Png);

    let tmp = TempDir::new().unwrap();
    let photo = pipeline(&tmp)
        .process_named(&source, "一寸", &ToneParams::default())
        .unwrap();
    let out = image::load_from_memory(&photo.bytes).unwrap().to_rgb8();

    assert_eq!(plan_crop(413, 1000, 295, 413).y, 211);
    for (x, y) in [(5, 5), (147, 206), (290, 408), (147, 20), (147, 395)] {
        assert_eq!(classify(out.get_pixel(x, y)), Color::Green, "pixel ({x}, {y})");
    }
}

#[test]
fn test_landscape_800x600_to_one_inch() {
    assert_eq!(
        plan_crop(800, 600, 295, 413),
        CropRect {
            x: 186,
            y: 0,
            width: 428,
            height: 600
        }
    );

    let tmp = TempDir::new().unwrap();
    let photo = pipeline(&tmp)
        .process_named(
            &encode(&gradient(800, 600), ImageFormat::Jpeg),
            "一寸",
            &ToneParams::default(),
        )
        .unwrap();
    assert_eq!((photo.width, photo.height), (295, 413));
    assert_eq!(photo.size_id, "一寸");
}

#[test]
fn test_every_exif_orientation_comes_out_upright() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);
    let upright = quadrants(128);
    let size = SizeSpec::custom(64, 64);

    for value in 1..=8u16 {
        let stored = stored_as(value, &upright);
        let source = with_orientation(&encode(&stored, ImageFormat::Jpeg), value);

        let photo = pipeline
            .process(&source, &size, &ToneParams::default())
            .unwrap();
        let out = image::load_from_memory(&photo.bytes).unwrap().to_rgb8();

        assert_eq!(classify(out.get_pixel(16, 16)), Color::Red, "orientation {value}");
        assert_eq!(classify(out.get_pixel(48, 16)), Color::Green, "orientation {value}");
        assert_eq!(classify(out.get_pixel(16, 48)), Color::Blue, "orientation {value}");
        assert_eq!(classify(out.get_pixel(48, 48)), Color::White, "orientation {value}");

        let expected = if value == 1 {
            OrientationOutcome::Unchanged
        } else {
            OrientationOutcome::Corrected {
                orientation: value as u32,
                extra_rotation: false,
            }
        };
        assert_eq!(photo.orientation, Some(expected));
    }
}

#[test]
fn test_portrait_photo_comes_out_upright_for_every_orientation() {
    // Upright 120x160: red top half, blue bottom half. Tags 5-8 store it as
    // a landscape, so the extra quarter turn and the pre-crop alignment
    // both run before the 60x80 resize.
    let upright = DynamicImage::ImageRgb8(RgbImage::from_fn(120, 160, |_, y| {
        if y < 80 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    }));
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);
    let size = SizeSpec::custom(60, 80);

    for value in 1..=8u16 {
        let stored = stored_as(value, &upright);
        let source = with_orientation(&encode(&stored, ImageFormat::Jpeg), value);

        let photo = pipeline
            .process(&source, &size, &ToneParams::default())
            .unwrap();
        let out = image::load_from_memory(&photo.bytes).unwrap().to_rgb8();
        assert_eq!((out.width(), out.height()), (60, 80));

        for x in [5, 30, 55] {
            assert_eq!(classify(out.get_pixel(x, 10)), Color::Red, "orientation {value} top");
            assert_eq!(classify(out.get_pixel(x, 70)), Color::Blue, "orientation {value} bottom");
        }

        let expected = if value == 1 {
            OrientationOutcome::Unchanged
        } else {
            OrientationOutcome::Corrected {
                orientation: value as u32,
                extra_rotation: value >= 5,
            }
        };
        assert_eq!(photo.orientation, Some(expected), "orientation {value}");
    }
}

#[test]
fn test_source_without_exif_is_unchanged() {
    let tmp = TempDir::new().unwrap();
    let photo = pipeline(&tmp)
        .process(
            &encode(&gradient(64, 64), ImageFormat::Png),
            &SizeSpec::custom(32, 32),
            &ToneParams::default(),
        )
        .unwrap();
    assert_eq!(photo.orientation, Some(OrientationOutcome::Unchanged));
}

#[test]
fn test_identity_tone_matches_plain_fit_and_encode() {
    let source_img = gradient(300, 200);
    let source = encode(&source_img, ImageFormat::Png);
    let size = SizeSpec::new("护照", 330, 420);

    let tmp = TempDir::new().unwrap();
    let mut config = config_in(tmp.path());
    config.cache.enabled = false;
    let photo = TransformPipeline::new(&config)
        .unwrap()
        .process(&source, &size, &ToneParams::new(1.0, 1.0))
        .unwrap();

    let fitted = GeometryTransformer::default().fit(source_img, &size).unwrap();
    let reference = PhotoEncoder::default().encode(&fitted).unwrap();
    assert_eq!(photo.bytes, reference);
}

#[test]
fn test_brightness_changes_the_output() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_in(tmp.path());
    config.cache.enabled = false;
    let pipeline = TransformPipeline::new(&config).unwrap();
    let source = encode(
        &DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([100, 100, 100]))),
        ImageFormat::Png,
    );
    let size = SizeSpec::custom(32, 32);

    let photo = pipeline
        .process(&source, &size, &ToneParams::new(1.5, 1.0))
        .unwrap();
    let out = image::load_from_memory(&photo.bytes).unwrap().to_rgb8();
    let value = out.get_pixel(16, 16)[0];
    assert!((145..=155).contains(&value), "got {value}");
}

#[test]
fn test_second_request_is_a_byte_identical_hit() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);
    let source = encode(&gradient(640, 480), ImageFormat::Jpeg);

    let first = pipeline
        .process_named(&source, "二寸", &ToneParams::default())
        .unwrap();
    let second = pipeline
        .process_named(&source, "二寸", &ToneParams::default())
        .unwrap();

    assert_eq!(first.cache, CacheStatus::Miss);
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(first.bytes, second.bytes);
    assert!(second.orientation.is_none());

    let stats = pipeline.cache().unwrap().stats();
    assert_eq!(stats.to_string(), "1 cached, 1 computed (2 total)");
}

#[test]
fn test_entry_expires_after_the_retention_window() {
    let tmp = TempDir::new().unwrap();
    let start = SystemTime::now();
    let clock = Arc::new(ManualClock::new(start));
    let pipeline = TransformPipeline::with_clock(&config_in(tmp.path()), clock.clone()).unwrap();
    let source = encode(&gradient(200, 200), ImageFormat::Png);
    let size = SizeSpec::custom(50, 70);

    let first = pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();
    assert_eq!(first.cache, CacheStatus::Miss);

    clock.set(start + WEEK - Duration::from_secs(1));
    let hit = pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();
    assert_eq!(hit.cache, CacheStatus::Hit);

    clock.set(start + WEEK + Duration::from_secs(1));
    let key = CacheKey::new(&Hasher::content_hash(&source), &size);
    let report = pipeline.sweep_cache().unwrap();
    assert_eq!(report.removed, 1);
    assert!(!pipeline.cache().unwrap().entry_path(&key).exists());

    let recomputed = pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();
    assert_eq!(recomputed.cache, CacheStatus::Miss);
    assert_eq!(recomputed.bytes, first.bytes);
}

#[test]
fn test_expired_entry_is_a_miss_before_any_sweep() {
    let tmp = TempDir::new().unwrap();
    let start = SystemTime::now();
    let clock = Arc::new(ManualClock::new(start));
    let pipeline = TransformPipeline::with_clock(&config_in(tmp.path()), clock.clone()).unwrap();
    let source = encode(&gradient(90, 90), ImageFormat::Png);
    let size = SizeSpec::custom(30, 30);

    pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();
    clock.set(start + WEEK + Duration::from_secs(1));
    let again = pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();
    assert_eq!(again.cache, CacheStatus::Miss);
}

#[test]
fn test_corrupted_entry_is_recomputed_and_replaced() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);
    let source = encode(&gradient(500, 300), ImageFormat::Png);
    let size = SizeSpec::new("小一寸", 260, 378);

    let first = pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();

    let key = CacheKey::new(&Hasher::content_hash(&source), &size);
    let entry = pipeline.cache().unwrap().entry_path(&key);
    std::fs::write(&entry, b"\xFF\xD8\xFF\xE0 truncated garbage").unwrap();

    let second = pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();
    assert_eq!(second.cache, CacheStatus::Miss);
    assert_eq!(second.bytes, first.bytes);

    let repaired = image::load_from_memory(&std::fs::read(&entry).unwrap()).unwrap();
    assert_eq!((repaired.width(), repaired.height()), (260, 378));
}

#[test]
fn test_tone_is_ignored_on_hit_by_default() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);
    let source = encode(&gradient(100, 100), ImageFormat::Png);
    let size = SizeSpec::custom(40, 40);

    let plain = pipeline
        .process(&source, &size, &ToneParams::default())
        .unwrap();
    let bright = pipeline
        .process(&source, &size, &ToneParams::new(1.8, 1.0))
        .unwrap();
    assert_eq!(bright.cache, CacheStatus::Hit);
    assert_eq!(bright.bytes, plain.bytes);
}

#[test]
fn test_unknown_size_fails_before_touching_the_cache() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);

    let err = pipeline
        .process_named(b"not even an image", "foo", &ToneParams::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownSize(ref id) if id == "foo"));
    assert!(err.is_input_error());

    let cache = pipeline.cache().unwrap();
    assert_eq!(cache.stats().total(), 0);
    assert_eq!(cache.entry_count(), 0);
}

#[test]
fn test_garbage_bytes_are_an_input_error_and_not_cached() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(&tmp);

    let err = pipeline
        .process_named(b"definitely not an image", "一寸", &ToneParams::default())
        .unwrap_err();
    assert!(err.is_input_error());
    assert_eq!(pipeline.cache().unwrap().entry_count(), 0);
}

#[test]
fn test_data_uri_round_trips_the_jpeg() {
    use base64::Engine;

    let tmp = TempDir::new().unwrap();
    let photo = pipeline(&tmp)
        .process_named(
            &encode(&gradient(120, 160), ImageFormat::Png),
            "身份证",
            &ToneParams::default(),
        )
        .unwrap();
    let uri = photo.to_data_uri();
    let payload = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .unwrap();
    assert_eq!(decoded, photo.bytes);
}
