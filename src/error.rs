// src/error.rs
//
// Unified error handling for towebp
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - Validation: bad settings or an empty/unusable submission, nothing processed
// - Decode: one file's bytes cannot be interpreted as an image
// - Encode: the output surface cannot be rendered or encoded
// - Archive: the ZIP export step failed

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy matching the propagation policy:
/// Decode and Encode errors are per-item (skip the file, continue the batch),
/// Validation and Archive errors are fatal to their whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad settings or no usable input; the submission is rejected up front
    Validation,
    /// A file's bytes could not be decoded as an image
    Decode,
    /// Rendering or WebP encoding of the output surface failed
    Encode,
    /// The ZIP export failed; individual results remain valid
    Archive,
}

/// towebp error types
///
/// All errors are type-safe and provide clear, actionable messages.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    // Validation Errors
    #[error("No valid image files in submission (accepted: {accepted})")]
    NoValidFiles { accepted: Cow<'static, str> },

    #[error("Unsupported input type: {mime}")]
    UnsupportedFormat { mime: Cow<'static, str> },

    #[error("Invalid quality {value}: expected a value in (0, 1]")]
    InvalidQuality { value: f32 },

    #[error("Invalid target dimensions: width={width:?}, height={height:?}")]
    InvalidTargetDimensions {
        width: Option<u32>,
        height: Option<u32>,
    },

    #[error("Letterbox mode requires both width and height")]
    LetterboxRequiresDimensions,

    #[error("Invalid canvas color '{value}': expected 'transparent', #rgb, #rrggbb, or #rrggbbaa")]
    InvalidCanvasColor { value: Cow<'static, str> },

    // Decode Errors
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Corrupted image data")]
    CorruptedImage,

    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Encode Errors
    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("Output surface has zero area ({width}x{height})")]
    ZeroAreaSurface { width: u32, height: u32 },

    #[error("Failed to encode as WebP: {message}")]
    EncodeFailed { message: Cow<'static, str> },

    // Archive Errors
    #[error("Failed to build archive: {message}")]
    ArchiveFailed { message: Cow<'static, str> },
}

// Constructor Helpers
impl ConvertError {
    pub fn no_valid_files(accepted: impl Into<Cow<'static, str>>) -> Self {
        Self::NoValidFiles {
            accepted: accepted.into(),
        }
    }

    pub fn unsupported_format(mime: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat { mime: mime.into() }
    }

    pub fn invalid_quality(value: f32) -> Self {
        Self::InvalidQuality { value }
    }

    pub fn invalid_target_dimensions(width: Option<u32>, height: Option<u32>) -> Self {
        Self::InvalidTargetDimensions { width, height }
    }

    pub fn invalid_canvas_color(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidCanvasColor {
            value: value.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn corrupted_image() -> Self {
        Self::CorruptedImage
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn zero_area_surface(width: u32, height: u32) -> Self {
        Self::ZeroAreaSurface { width, height }
    }

    pub fn encode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::EncodeFailed {
            message: message.into(),
        }
    }

    pub fn archive_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ArchiveFailed {
            message: message.into(),
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoValidFiles { .. }
            | Self::UnsupportedFormat { .. }
            | Self::InvalidQuality { .. }
            | Self::InvalidTargetDimensions { .. }
            | Self::LetterboxRequiresDimensions
            | Self::InvalidCanvasColor { .. } => ErrorCategory::Validation,

            Self::DecodeFailed { .. }
            | Self::CorruptedImage
            | Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. } => ErrorCategory::Decode,

            Self::ResizeFailed { .. }
            | Self::ZeroAreaSurface { .. }
            | Self::EncodeFailed { .. } => ErrorCategory::Encode,

            Self::ArchiveFailed { .. } => ErrorCategory::Archive,
        }
    }

    /// True when this error only skips the current file instead of
    /// aborting the whole batch.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Decode | ErrorCategory::Encode
        )
    }
}
