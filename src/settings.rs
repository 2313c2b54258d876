// src/settings.rs
//
// Conversion settings and the pure width/height derivation helper.
// Settings are cheap to clone - each conversion takes an immutable snapshot.

use crate::error::ConvertError;
use std::str::FromStr;

/// How a resized source maps onto the output surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CanvasMode {
    /// Source pixels map straight onto the target dimensions.
    /// Aspect ratio may change when both width and height are forced.
    #[default]
    Direct,
    /// Source is scaled to fit (90% of the target), centered, and padded
    /// with the canvas color. Requires explicit width and height.
    Letterbox,
}

/// Background fill for letterbox composition.
///
/// Direct-mode surfaces always start fully transparent; the fill only
/// applies to letterbox padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CanvasColor {
    #[default]
    Transparent,
    /// Solid RGBA fill
    Solid([u8; 4]),
}

impl CanvasColor {
    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }
}

impl FromStr for CanvasColor {
    type Err = ConvertError;

    /// Accepts "transparent" plus #rgb, #rrggbb, and #rrggbbaa hex forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(Self::Transparent);
        }
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ConvertError::invalid_canvas_color(trimmed.to_string()))?;
        let nibble = |c: u8| -> Result<u8, ConvertError> {
            (c as char)
                .to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| ConvertError::invalid_canvas_color(trimmed.to_string()))
        };
        let bytes = hex.as_bytes();
        match bytes.len() {
            3 => {
                let mut rgba = [255u8; 4];
                for (i, &c) in bytes.iter().enumerate() {
                    let d = nibble(c)?;
                    rgba[i] = d << 4 | d;
                }
                Ok(Self::Solid(rgba))
            }
            6 | 8 => {
                let mut rgba = [255u8; 4];
                for (i, pair) in bytes.chunks(2).enumerate() {
                    rgba[i] = nibble(pair[0])? << 4 | nibble(pair[1])?;
                }
                Ok(Self::Solid(rgba))
            }
            _ => Err(ConvertError::invalid_canvas_color(trimmed.to_string())),
        }
    }
}

/// Per-batch conversion settings.
///
/// Immutable for the duration of one conversion call. Between calls the
/// caller may recompute width/height via [`derive_complementary_dimension`];
/// with `maintain_aspect_ratio` the two are mutually derived, never both free.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionSettings {
    /// WebP quality in (0, 1], mapped linearly to the encoder's 0-100 scale
    pub quality: f32,
    /// When false, width/height/canvas_mode/canvas_color are ignored
    pub resize: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: bool,
    pub canvas_mode: CanvasMode,
    pub canvas_color: CanvasColor,
    /// Source aspect ratio (width / height) backing the mutual
    /// width/height derivation. Bootstrapped by the batch orchestrator
    /// from the first file when unset.
    pub original_aspect_ratio: Option<f64>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            quality: 0.9,
            resize: false,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            canvas_mode: CanvasMode::Direct,
            canvas_color: CanvasColor::Transparent,
            original_aspect_ratio: None,
        }
    }
}

impl ConversionSettings {
    /// Validate the snapshot before a conversion run.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(ConvertError::invalid_quality(self.quality));
        }
        if !self.resize {
            return Ok(());
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(ConvertError::invalid_target_dimensions(
                self.width,
                self.height,
            ));
        }
        if self.canvas_mode == CanvasMode::Letterbox
            && (self.width.is_none() || self.height.is_none())
        {
            return Err(ConvertError::LetterboxRequiresDimensions);
        }
        Ok(())
    }

    /// Encoder quality on the 0-100 scale libwebp expects.
    pub fn encoder_quality(&self) -> f32 {
        (self.quality * 100.0).clamp(0.0, 100.0)
    }
}

/// The axis the caller just changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

/// Recompute the complementary dimension after one axis changed.
///
/// Pure replacement for the original UI's bidirectional change handlers:
/// with `maintain_aspect_ratio` and a known aspect ratio, setting width
/// derives height (and vice versa). Clearing an axis clears only that axis.
pub fn derive_complementary_dimension(
    settings: &ConversionSettings,
    changed: Axis,
    value: Option<u32>,
) -> ConversionSettings {
    let mut updated = settings.clone();
    match changed {
        Axis::Width => updated.width = value,
        Axis::Height => updated.height = value,
    }

    let ratio = match settings.original_aspect_ratio {
        Some(r) if r > 0.0 => r,
        _ => return updated,
    };
    if !settings.maintain_aspect_ratio {
        return updated;
    }

    if let Some(v) = value {
        match changed {
            Axis::Width => {
                updated.height = Some((v as f64 / ratio).round().max(1.0) as u32);
            }
            Axis::Height => {
                updated.width = Some((v as f64 * ratio).round().max(1.0) as u32);
            }
        }
    }
    updated
}

// =============================================================================
// PRESETS - Common target sizes for web image conversion
// =============================================================================

/// Fixed target-size presets offered alongside free-form dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizePreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

impl SizePreset {
    pub const ALL: [SizePreset; 4] = [
        SizePreset::new("1920x1080", 1920, 1080),
        SizePreset::new("1280x720", 1280, 720),
        SizePreset::new("800x600", 800, 600),
        SizePreset::new("500x500", 500, 500),
    ];

    const fn new(name: &'static str, width: u32, height: u32) -> Self {
        Self {
            name,
            width,
            height,
        }
    }

    pub fn get(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name == name)
    }

    /// Apply the preset's dimensions to a settings snapshot.
    pub fn apply(&self, settings: &ConversionSettings) -> ConversionSettings {
        let mut updated = settings.clone();
        updated.width = Some(self.width);
        updated.height = Some(self.height);
        updated
    }
}
