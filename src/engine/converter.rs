// src/engine/converter.rs
//
// Single-image conversion: decode -> geometry -> re-render -> WebP encode.

use crate::engine::decoder::{check_dimensions, decode_image};
use crate::engine::geometry::{resolve_geometry, RenderPlan};
use crate::error::ConvertError;
use crate::settings::{CanvasColor, ConversionSettings};
use fast_image_resize::{self as fir, MulDiv, PixelType, ResizeOptions};
use image::{DynamicImage, Rgba, RgbaImage, RgbImage};
use std::borrow::Cow;
use tracing::debug;

type ConverterResult<T> = std::result::Result<T, ConvertError>;

/// One input file: a named byte buffer with a declared MIME type.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// The outcome of converting one file. Immutable once produced; dropping
/// the result releases the encoded output buffer.
#[derive(Clone, Debug)]
pub struct ConversionResult {
    pub source_name: String,
    pub source_byte_size: usize,
    pub output_bytes: Vec<u8>,
    pub output_byte_size: usize,
    /// Byte-size savings as a signed percentage; negative means the
    /// output grew.
    pub reduction_percent: f64,
    /// Snapshot of the settings in effect at conversion time
    pub settings_used: ConversionSettings,
}

/// Convert one file to WebP.
///
/// Fails with a decode-class error for unreadable image data and an
/// encode-class error when the output surface cannot be rendered or
/// encoded. Both are per-item: the batch orchestrator skips and continues.
pub fn convert_file(
    file: &SourceFile,
    settings: &ConversionSettings,
) -> ConverterResult<ConversionResult> {
    settings.validate()?;

    let decoded = decode_image(&file.bytes)?;
    let plan = resolve_geometry(decoded.width(), decoded.height(), settings)?;
    if plan.output_width == 0 || plan.output_height == 0 {
        return Err(ConvertError::zero_area_surface(
            plan.output_width,
            plan.output_height,
        ));
    }
    // The output surface is subject to the same limits as decoded input;
    // an oversized target must skip the file, not abort the batch.
    check_dimensions(plan.output_width, plan.output_height).map_err(|_| {
        ConvertError::resize_failed(
            (decoded.width(), decoded.height()),
            (plan.output_width, plan.output_height),
            "target dimensions exceed limits",
        )
    })?;

    let surface = render_surface(decoded, &plan, settings.canvas_color)?;
    let output_bytes = encode_webp(&surface, settings.encoder_quality())?;

    let source_byte_size = file.bytes.len();
    let output_byte_size = output_bytes.len();
    let reduction_percent = if source_byte_size > 0 {
        (source_byte_size as f64 - output_byte_size as f64) / source_byte_size as f64 * 100.0
    } else {
        0.0
    };
    debug!(
        source = %file.name,
        bytes_in = source_byte_size,
        bytes_out = output_byte_size,
        "encoded webp"
    );

    Ok(ConversionResult {
        source_name: file.name.clone(),
        source_byte_size,
        output_bytes,
        output_byte_size,
        reduction_percent,
        settings_used: settings.clone(),
    })
}

/// Apply a render plan to the decoded source, producing the output surface.
///
/// When the drawn image fills the output exactly, this is a plain resize
/// (or a pass-through for identity plans). Otherwise the source is scaled
/// and centered on an RGBA surface pre-filled with the canvas color.
fn render_surface(
    source: DynamicImage,
    plan: &RenderPlan,
    canvas_color: CanvasColor,
) -> ConverterResult<DynamicImage> {
    let draw_width = plan.draw_width.round() as u32;
    let draw_height = plan.draw_height.round() as u32;
    if draw_width == 0 || draw_height == 0 {
        return Err(ConvertError::zero_area_surface(draw_width, draw_height));
    }

    if plan.fills_output() {
        if (source.width(), source.height()) == (draw_width, draw_height) {
            return Ok(source);
        }
        return resample(source, draw_width, draw_height);
    }

    // Letterbox composition. The surface starts transparent; a solid
    // canvas color is painted underneath the scaled image.
    let mut surface = RgbaImage::new(plan.output_width, plan.output_height);
    if let CanvasColor::Solid(rgba) = canvas_color {
        for pixel in surface.pixels_mut() {
            *pixel = Rgba(rgba);
        }
    }

    let scaled = resample(source, draw_width, draw_height)?.into_rgba8();
    image::imageops::overlay(
        &mut surface,
        &scaled,
        plan.draw_x.round() as i64,
        plan.draw_y.round() as i64,
    );
    Ok(DynamicImage::ImageRgba8(surface))
}

/// High-quality resampling via fast_image_resize (Lanczos3), with alpha
/// premultiplication for RGBA sources so edges blend correctly.
fn resample(source: DynamicImage, dst_width: u32, dst_height: u32) -> ConverterResult<DynamicImage> {
    let src_width = source.width();
    let src_height = source.height();
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(ConvertError::resize_failed(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }

    // Select pixel layout without forcing RGBA when not needed;
    // take ownership of the buffer instead of copying where possible.
    let (pixel_type, src_pixels): (PixelType, Vec<u8>) = match source {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.into_raw()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    let map_err = |message: String| {
        ConvertError::resize_failed((src_width, src_height), (dst_width, dst_height), message)
    };

    // fir wants an aligned buffer it owns; copy into one.
    let mut src_image = fir::images::Image::new(src_width, src_height, pixel_type);
    if src_image.buffer().len() != src_pixels.len() {
        return Err(map_err(format!(
            "source buffer size mismatch: expected {}, got {}",
            src_image.buffer().len(),
            src_pixels.len()
        )));
    }
    src_image.buffer_mut().copy_from_slice(&src_pixels);

    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    let needs_premultiply = pixel_type == PixelType::U8x4;
    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| map_err(format!("failed to premultiply alpha: {e}")))?;
    }

    let options = ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| map_err(format!("fir resize error: {e:?}")))?;

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| map_err(format!("failed to unpremultiply alpha: {e}")))?;
    }

    let dst_pixels = dst_image.into_vec();
    match pixel_type {
        PixelType::U8x3 => RgbImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| map_err("failed to build rgb image from resized data".into())),
        PixelType::U8x4 => RgbaImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| map_err("failed to build rgba image from resized data".into())),
        _ => Err(map_err("unsupported pixel layout for resize".into())),
    }
}

/// Encode the output surface to WebP at the given encoder quality (0-100).
/// RGB input stays RGB; anything carrying alpha encodes RGBA.
fn encode_webp(img: &DynamicImage, quality: f32) -> ConverterResult<Vec<u8>> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(ConvertError::zero_area_surface(width, height));
    }

    let mut config = webp::WebPConfig::new()
        .map_err(|_| ConvertError::encode_failed("failed to create encoder config"))?;
    config.quality = quality;
    config.method = 4;
    config.pass = 1;
    config.autofilter = 1;

    let encoded = if img.color().has_alpha() {
        let rgba: Cow<'_, RgbaImage> = match img {
            DynamicImage::ImageRgba8(rgba) => Cow::Borrowed(rgba),
            _ => Cow::Owned(img.to_rgba8()),
        };
        webp::Encoder::from_rgba(&rgba, width, height)
            .encode_advanced(&config)
            .map_err(|e| ConvertError::encode_failed(format!("webp encode failed: {e:?}")))?
            .to_vec()
    } else {
        let rgb: Cow<'_, RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
            _ => Cow::Owned(img.to_rgb8()),
        };
        webp::Encoder::from_rgb(&rgb, width, height)
            .encode_advanced(&config)
            .map_err(|e| ConvertError::encode_failed(format!("webp encode failed: {e:?}")))?
            .to_vec()
    };

    Ok(encoded)
}
