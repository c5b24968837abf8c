//! Decode, normalize and recompress an image for display.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use super::PreloadError;

/// Parameters of the recompression step.
#[derive(Debug, Clone, Copy)]
pub struct CodecOptions {
    /// Longest allowed edge in pixels
    pub max_dimension: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_dimension: crate::constants::DEFAULT_MAX_DIMENSION,
            jpeg_quality: crate::constants::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Size that fits inside `max_dimension` on both axes, keeping aspect ratio.
///
/// Images already within bounds keep their size. Neither side drops below 1.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let scale = f64::from(max_dimension) / f64::from(width.max(height));
    let scaled = |v: u32| ((f64::from(v) * scale).round() as u32).clamp(1, max_dimension);
    (scaled(width), scaled(height))
}

/// Composite onto a white background and drop the alpha channel.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Turn raw file bytes into display-ready JPEG bytes.
///
/// `path` is only used for error reporting.
pub fn recompress(path: &Path, data: &[u8], options: CodecOptions) -> Result<Vec<u8>, PreloadError> {
    if options.max_dimension == 0 {
        return Err(PreloadError::InvalidMaxDimension);
    }
    let img = image::load_from_memory(data).map_err(|e| PreloadError::decode(path, e))?;
    let (width, height) = img.dimensions();

    let mut rgb = flatten_to_rgb(&img);
    let (target_w, target_h) = fit_within(width, height, options.max_dimension);
    if (target_w, target_h) != (width, height) {
        rgb = image::imageops::resize(&rgb, target_w, target_h, FilterType::Lanczos3);
    }

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, options.jpeg_quality)
        .encode_image(&rgb)
        .map_err(|e| PreloadError::encode(path, e))?;

    log::debug!(
        "Recompressed {:?}: {}x{} -> {}x{} ({} -> {} bytes)",
        path,
        width,
        height,
        target_w,
        target_h,
        data.len(),
        out.get_ref().len()
    );

    Ok(out.into_inner())
}
