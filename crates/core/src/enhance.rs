// crates/core/src/enhance.rs
//! The fixed enhancement transform applied to every submitted image.
//!
//! [`StandardEnhancer`] runs, in order:
//! 1. Lanczos3 downscale so the longer side fits `max_dimension` (never upscales)
//! 2. Unsharp mask
//! 3. Contrast, color and brightness adjustments
//!
//! The three adjustments interpolate between the image and a "degenerate"
//! version of it (mean grey, per-pixel greyscale, black). A factor of `1.0`
//! leaves the image untouched.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::EnhanceError;

/// Longer side cap applied when no explicit value is configured.
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

/// Encoding used for every stored result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
        }
    }
}

/// Tunables for [`StandardEnhancer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceParams {
    pub max_dimension: u32,
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
    pub contrast: f32,
    pub color: f32,
    pub brightness: f32,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            sharpen_sigma: 2.0,
            sharpen_threshold: 3,
            contrast: 1.2,
            color: 1.1,
            brightness: 1.05,
        }
    }
}

/// A pure image transform. Implementations must be deterministic and free of I/O.
pub trait Enhancer: Send + Sync {
    fn enhance(&self, image: &DynamicImage) -> Result<DynamicImage, EnhanceError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

/// The production filter chain.
#[derive(Debug, Clone, Default)]
pub struct StandardEnhancer {
    params: EnhanceParams,
}

impl StandardEnhancer {
    pub fn new(params: EnhanceParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EnhanceParams {
        &self.params
    }
}

impl Enhancer for StandardEnhancer {
    fn enhance(&self, image: &DynamicImage) -> Result<DynamicImage, EnhanceError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EnhanceError::ZeroDimension);
        }
        if self.params.max_dimension == 0 {
            return Err(EnhanceError::Pipeline(
                "max_dimension must be greater than zero".into(),
            ));
        }

        let bounded = bound_dimensions(image, self.params.max_dimension);
        let sharpened = bounded.unsharpen(self.params.sharpen_sigma, self.params.sharpen_threshold);

        let mut rgb = sharpened.to_rgb8();
        adjust_contrast(&mut rgb, self.params.contrast);
        adjust_color(&mut rgb, self.params.color);
        adjust_brightness(&mut rgb, self.params.brightness);

        tracing::debug!(
            width = rgb.width(),
            height = rgb.height(),
            "image enhanced"
        );
        Ok(DynamicImage::ImageRgb8(rgb))
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// Decode uploaded bytes into an RGB image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, EnhanceError> {
    if bytes.is_empty() {
        return Err(EnhanceError::EmptyInput);
    }
    let format = image::guess_format(bytes).map_err(|_| EnhanceError::UnknownFormat)?;
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(EnhanceError::Decode)?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(EnhanceError::ZeroDimension);
    }
    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// Encode an image in the fixed output format.
pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, EnhanceError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format.image_format())
        .map_err(|source| EnhanceError::Encode {
            format: format.extension(),
            source,
        })?;
    Ok(buf.into_inner())
}

/// Shorthand for [`encode`] with [`OutputFormat::Png`].
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, EnhanceError> {
    encode(image, OutputFormat::Png)
}

/// Dimensions after capping the longer side at `max`, preserving aspect ratio.
pub fn bounded_size(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = max as f64 / width.max(height) as f64;
    let w = ((width as f64 * scale).round() as u32).clamp(1, max);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max);
    (w, h)
}

fn bound_dimensions(image: &DynamicImage, max: u32) -> DynamicImage {
    let (w, h) = bounded_size(image.width(), image.height(), max);
    if (w, h) == (image.width(), image.height()) {
        return image.clone();
    }
    image.resize_exact(w, h, FilterType::Lanczos3)
}

/// ITU-R 601-2 luma, the same weights used for greyscale conversion.
fn luma(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 * 299.0 + g as f32 * 587.0 + b as f32 * 114.0) / 1000.0
}

fn blend(degenerate: f32, value: u8, factor: f32) -> u8 {
    (degenerate + factor * (value as f32 - degenerate))
        .round()
        .clamp(0.0, 255.0) as u8
}

fn adjust_contrast(img: &mut RgbImage, factor: f32) {
    if factor == 1.0 {
        return;
    }
    let count = (img.width() as u64 * img.height() as u64).max(1);
    let sum: f64 = img
        .pixels()
        .map(|p| luma(p[0], p[1], p[2]) as f64)
        .sum();
    let mean = (sum / count as f64).round() as f32;
    for p in img.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = blend(mean, *c, factor);
        }
    }
}

fn adjust_color(img: &mut RgbImage, factor: f32) {
    if factor == 1.0 {
        return;
    }
    for p in img.pixels_mut() {
        let grey = luma(p[0], p[1], p[2]).round();
        for c in p.0.iter_mut() {
            *c = blend(grey, *c, factor);
        }
    }
}

fn adjust_brightness(img: &mut RgbImage, factor: f32) {
    if factor == 1.0 {
        return;
    }
    for p in img.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = blend(0.0, *c, factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_bounded_size_keeps_small_images() {
        assert_eq!(bounded_size(640, 480, 2048), (640, 480));
        assert_eq!(bounded_size(2048, 2048, 2048), (2048, 2048));
    }

    #[test]
    fn test_bounded_size_caps_longer_side() {
        assert_eq!(bounded_size(4000, 3000, 2048), (2048, 1536));
        assert_eq!(bounded_size(3000, 4000, 2048), (1536, 2048));
        assert_eq!(bounded_size(10000, 1, 100), (100, 1));
    }

    #[test]
    fn test_large_image_is_downscaled_with_aspect_ratio() {
        let enhancer = StandardEnhancer::default();
        let out = enhancer.enhance(&gradient(4000, 3000)).unwrap();

        assert!(out.width().max(out.height()) <= DEFAULT_MAX_DIMENSION);
        let ratio = out.width() as f64 / out.height() as f64;
        assert!((ratio - 4.0 / 3.0).abs() < 0.01, "ratio was {ratio}");

        let png = encode_png(&out).unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2048, 1536));
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let enhancer = StandardEnhancer::default();
        let out = enhancer.enhance(&gradient(64, 32)).unwrap();
        assert_eq!((out.width(), out.height()), (64, 32));
    }

    #[test]
    fn test_enhancement_is_deterministic() {
        let enhancer = StandardEnhancer::default();
        let input = gradient(120, 80);
        let a = encode_png(&enhancer.enhance(&input).unwrap()).unwrap();
        let b = encode_png(&enhancer.enhance(&input).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_factors_leave_pixels_untouched() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([10, 120, 240]));
        adjust_contrast(&mut img, 1.0);
        adjust_color(&mut img, 1.0);
        adjust_brightness(&mut img, 1.0);
        assert!(img.pixels().all(|p| *p == Rgb([10, 120, 240])));
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        let mut img = RgbImage::from_pixel(1, 1, Rgb([100, 250, 0]));
        adjust_brightness(&mut img, 1.05);
        assert_eq!(*img.get_pixel(0, 0), Rgb([105, 255, 0]));
    }

    #[test]
    fn test_color_leaves_grey_pixels_alone() {
        let mut img = RgbImage::from_pixel(2, 2, Rgb([90, 90, 90]));
        adjust_color(&mut img, 1.1);
        assert!(img.pixels().all(|p| *p == Rgb([90, 90, 90])));
    }

    #[test]
    fn test_contrast_spreads_values_around_mean() {
        let mut img = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([100, 100, 100])
            } else {
                Rgb([200, 200, 200])
            }
        });
        adjust_contrast(&mut img, 1.2);
        // mean is 150: 150 + 1.2 * (100 - 150) = 90, 150 + 1.2 * 50 = 210
        assert_eq!(*img.get_pixel(0, 0), Rgb([90, 90, 90]));
        assert_eq!(*img.get_pixel(1, 0), Rgb([210, 210, 210]));
    }

    #[test]
    fn test_zero_max_dimension_is_pipeline_error() {
        let enhancer = StandardEnhancer::new(EnhanceParams {
            max_dimension: 0,
            ..EnhanceParams::default()
        });
        let err = enhancer.enhance(&gradient(8, 8)).unwrap_err();
        assert!(matches!(err, EnhanceError::Pipeline(_)));
    }

    #[test]
    fn test_decode_rejects_empty_and_garbage() {
        assert!(matches!(decode_image(&[]), Err(EnhanceError::EmptyInput)));
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(EnhanceError::UnknownFormat)
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let png = encode_png(&gradient(16, 16)).unwrap();
        let err = decode_image(&png[..png.len() / 2]).unwrap_err();
        assert!(matches!(err, EnhanceError::Decode(_)));
    }

    #[test]
    fn test_decode_converts_to_rgb() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 4])));
        let png = encode_png(&rgba).unwrap();
        let decoded = decode_image(&png).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn test_params_deserialize_with_defaults() {
        let params: EnhanceParams = serde_json::from_str(r#"{"max_dimension": 512}"#).unwrap();
        assert_eq!(params.max_dimension, 512);
        assert_eq!(params.contrast, 1.2);
    }

    #[test]
    fn test_output_format_metadata() {
        assert_eq!(OutputFormat::Png.content_type(), "image/png");
        assert_eq!(OutputFormat::Png.extension(), "png");
    }
}
