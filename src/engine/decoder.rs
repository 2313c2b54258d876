// src/engine/decoder.rs
//
// Decoder routing: JPEG (mozjpeg), PNG (zune-png), WebP (libwebp),
// GIF and everything else via the image crate.

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::ConvertError;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

type DecoderResult<T> = std::result::Result<T, ConvertError>;

/// Run a decode stage, mapping panics from C-backed decoders (mozjpeg
/// signals errors by panicking) to decode failures.
fn run_decode<T>(
    stage: &'static str,
    f: impl FnOnce() -> DecoderResult<T>,
) -> DecoderResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "decoder panicked".to_string());
            Err(ConvertError::decode_failed(format!("{stage}: {message}")))
        }
    }
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint:
/// - Detect format once (magic bytes)
/// - Route JPEG to mozjpeg, PNG to zune-png, WebP to libwebp,
///   GIF and unknowns to the image crate
pub fn decode_image(bytes: &[u8]) -> DecoderResult<DynamicImage> {
    match detect_format(bytes) {
        Some(ImageFormat::Jpeg) => decode_jpeg(bytes),
        Some(ImageFormat::Png) => decode_png(bytes),
        Some(ImageFormat::WebP) => decode_webp(bytes),
        _ => decode_with_image_crate(bytes),
    }
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo).
fn decode_jpeg(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_decode("jpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(ConvertError::decode_failed("jpeg: missing EOI marker"));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            ConvertError::decode_failed(format!("jpeg: decompress init failed: {e:?}"))
        })?;
        let mut decompress = decompress.rgb().map_err(|e| {
            ConvertError::decode_failed(format!("jpeg: rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width() as u32;
        let height = decompress.height() as u32;
        check_dimensions(width, height)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            ConvertError::decode_failed(format!("jpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat: Vec<u8> = pixels.into_iter().flatten().collect();

        RgbImage::from_raw(width, height, flat)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| ConvertError::decode_failed("jpeg: failed to build image from raw data"))
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped down to 8-bit.
fn decode_png(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_decode("png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(Cursor::new(data), options);
        let pixels = decoder
            .decode()
            .map_err(|e| ConvertError::decode_failed(format!("png: decode failed: {e}")))?;

        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| ConvertError::decode_failed("png: missing header info"))?;
        let width = width as u32;
        let height = height as u32;
        check_dimensions(width, height)?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(ConvertError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ConvertError::decode_failed("png: missing colorspace"))?;

        match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build RGB image")),
            ColorSpace::RGBA | ColorSpace::YCbCr | ColorSpace::BGRA | ColorSpace::ARGB => {
                RgbaImage::from_raw(width, height, buf)
                    .map(DynamicImage::ImageRgba8)
                    .ok_or_else(|| ConvertError::decode_failed("png: failed to build RGBA image"))
            }
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build Luma image")),
            ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build LumaA image")),
            other => Err(ConvertError::decode_failed(format!(
                "png: unsupported colorspace {other:?}"
            ))),
        }
    })
}

/// Decode WebP using libwebp. Falls back to the image crate for animated WebP.
fn decode_webp(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_decode("webp", || {
        // Parse the header first to avoid allocating huge buffers on malformed files
        let features = BitstreamFeatures::new(data)
            .ok_or_else(|| ConvertError::decode_failed("webp: failed to read bitstream features"))?;

        if features.has_animation() {
            // The simple libwebp decoder does not support animation
            return image::load_from_memory(data).map_err(|e| {
                ConvertError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        check_dimensions(features.width(), features.height())?;

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| ConvertError::decode_failed("webp: decode failed"))?;
        check_dimensions(decoded.width(), decoded.height())?;

        Ok(decoded.to_image())
    })
}

/// Decode GIF and anything unrecognized via the image crate.
fn decode_with_image_crate(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_decode("image", || {
        let img = image::load_from_memory(data)
            .map_err(|e| ConvertError::decode_failed(format!("decode failed: {e}")))?;
        check_dimensions(img.width(), img.height())?;
        Ok(img)
    })
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ConvertError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(ConvertError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Read image dimensions from the header without decoding pixels.
/// Used by the batch orchestrator to bootstrap the aspect ratio from the
/// first file before any conversion runs.
pub fn read_dimensions(bytes: &[u8]) -> DecoderResult<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read image header: {e}")))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read dimensions: {e}")))?;
    check_dimensions(width, height)?;
    Ok((width, height))
}
