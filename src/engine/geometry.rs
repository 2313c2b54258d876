// src/engine/geometry.rs
//
// Geometry resolver: output surface size plus source placement and scale.

use crate::error::ConvertError;
use crate::settings::{CanvasMode, ConversionSettings};

/// Letterbox mode scales the source to 90% of the target box, leaving a
/// visible padding frame around the image.
const LETTERBOX_FILL: f64 = 0.9;

/// The rendering plan for one conversion.
///
/// Output dimensions are integral (they size the surface); draw dimensions
/// and offsets stay fractional, exactly as computed. Rasterization rounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPlan {
    pub output_width: u32,
    pub output_height: u32,
    pub draw_width: f64,
    pub draw_height: f64,
    pub draw_x: f64,
    pub draw_y: f64,
}

impl RenderPlan {
    fn full(width: u32, height: u32) -> Self {
        Self {
            output_width: width,
            output_height: height,
            draw_width: width as f64,
            draw_height: height as f64,
            draw_x: 0.0,
            draw_y: 0.0,
        }
    }

    /// True when the drawn image covers the whole output surface at (0,0),
    /// so no background padding is visible.
    pub fn fills_output(&self) -> bool {
        self.draw_x == 0.0
            && self.draw_y == 0.0
            && self.draw_width == self.output_width as f64
            && self.draw_height == self.output_height as f64
    }
}

/// Compute the output surface and source placement for one conversion.
///
/// Assumes positive source dimensions; degenerate inputs are rejected by
/// decode-time validation before this runs.
pub fn resolve_geometry(
    source_width: u32,
    source_height: u32,
    settings: &ConversionSettings,
) -> Result<RenderPlan, ConvertError> {
    debug_assert!(source_width > 0 && source_height > 0);

    if !settings.resize {
        return Ok(RenderPlan::full(source_width, source_height));
    }

    match settings.canvas_mode {
        CanvasMode::Direct => Ok(resolve_direct(source_width, source_height, settings)),
        CanvasMode::Letterbox => {
            let (width, height) = match (settings.width, settings.height) {
                (Some(w), Some(h)) => (w, h),
                _ => return Err(ConvertError::LetterboxRequiresDimensions),
            };
            Ok(resolve_letterbox(source_width, source_height, width, height))
        }
    }
}

fn resolve_direct(source_width: u32, source_height: u32, settings: &ConversionSettings) -> RenderPlan {
    match (settings.width, settings.height) {
        // Both forced: stretch to fill, aspect ratio may change. With
        // maintain_aspect_ratio the two were mutually derived upstream,
        // so the stretch is aspect-preserving in practice.
        (Some(w), Some(h)) => RenderPlan::full(w, h),
        (Some(w), None) => {
            let h = if settings.maintain_aspect_ratio {
                (w as f64 * source_height as f64 / source_width as f64).round() as u32
            } else {
                source_height
            };
            RenderPlan::full(w, h)
        }
        (None, Some(h)) => {
            let w = if settings.maintain_aspect_ratio {
                (h as f64 * source_width as f64 / source_height as f64).round() as u32
            } else {
                source_width
            };
            RenderPlan::full(w, h)
        }
        (None, None) => RenderPlan::full(source_width, source_height),
    }
}

fn resolve_letterbox(source_width: u32, source_height: u32, width: u32, height: u32) -> RenderPlan {
    let scale = f64::min(
        LETTERBOX_FILL * width as f64 / source_width as f64,
        LETTERBOX_FILL * height as f64 / source_height as f64,
    );
    let draw_width = source_width as f64 * scale;
    let draw_height = source_height as f64 * scale;
    RenderPlan {
        output_width: width,
        output_height: height,
        draw_width,
        draw_height,
        draw_x: (width as f64 - draw_width) / 2.0,
        draw_y: (height as f64 - draw_height) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CanvasColor;

    fn resize_settings() -> ConversionSettings {
        ConversionSettings {
            resize: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_resize_is_identity() {
        let plan = resolve_geometry(640, 480, &ConversionSettings::default()).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (640, 480));
        assert_eq!((plan.draw_width, plan.draw_height), (640.0, 480.0));
        assert_eq!((plan.draw_x, plan.draw_y), (0.0, 0.0));
        assert!(plan.fills_output());
    }

    #[test]
    fn test_resize_ignores_dimensions_when_disabled() {
        let settings = ConversionSettings {
            width: Some(100),
            height: Some(100),
            canvas_mode: CanvasMode::Letterbox,
            canvas_color: CanvasColor::Solid([0, 0, 0, 255]),
            ..Default::default()
        };
        let plan = resolve_geometry(640, 480, &settings).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (640, 480));
    }

    #[test]
    fn test_direct_both_dimensions_stretch() {
        let settings = ConversionSettings {
            width: Some(300),
            height: Some(100),
            ..resize_settings()
        };
        let plan = resolve_geometry(640, 480, &settings).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (300, 100));
        assert!(plan.fills_output());
    }

    #[test]
    fn test_direct_width_only_derives_height() {
        let settings = ConversionSettings {
            width: Some(320),
            ..resize_settings()
        };
        let plan = resolve_geometry(640, 480, &settings).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (320, 240));
    }

    #[test]
    fn test_direct_width_only_rounds_derived_height() {
        // 100 * 333 / 1000 = 33.3 -> 33
        let settings = ConversionSettings {
            width: Some(100),
            ..resize_settings()
        };
        let plan = resolve_geometry(1000, 333, &settings).unwrap();
        assert_eq!(plan.output_height, 33);
    }

    #[test]
    fn test_direct_height_only_derives_width() {
        let settings = ConversionSettings {
            height: Some(240),
            ..resize_settings()
        };
        let plan = resolve_geometry(640, 480, &settings).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (320, 240));
    }

    #[test]
    fn test_direct_single_axis_without_maintain_keeps_source_axis() {
        let settings = ConversionSettings {
            width: Some(320),
            maintain_aspect_ratio: false,
            ..resize_settings()
        };
        let plan = resolve_geometry(640, 480, &settings).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (320, 480));
    }

    #[test]
    fn test_direct_no_dimensions_is_identity() {
        let plan = resolve_geometry(640, 480, &resize_settings()).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (640, 480));
    }

    #[test]
    fn test_letterbox_wide_source() {
        // 1000x500 source into a 500x500 box:
        // scale = min(0.9*500/1000, 0.9*500/500) = 0.45
        let settings = ConversionSettings {
            width: Some(500),
            height: Some(500),
            canvas_mode: CanvasMode::Letterbox,
            ..resize_settings()
        };
        let plan = resolve_geometry(1000, 500, &settings).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (500, 500));
        assert_eq!((plan.draw_width, plan.draw_height), (450.0, 225.0));
        assert_eq!(plan.draw_x, 25.0);
        assert_eq!(plan.draw_y, 137.5);
        assert!(!plan.fills_output());
    }

    #[test]
    fn test_letterbox_missing_dimension_errors() {
        let settings = ConversionSettings {
            width: Some(500),
            canvas_mode: CanvasMode::Letterbox,
            ..resize_settings()
        };
        assert!(matches!(
            resolve_geometry(1000, 500, &settings),
            Err(ConvertError::LetterboxRequiresDimensions)
        ));
    }

    #[test]
    fn test_letterbox_centers_on_both_axes() {
        let settings = ConversionSettings {
            width: Some(400),
            height: Some(200),
            canvas_mode: CanvasMode::Letterbox,
            ..resize_settings()
        };
        let plan = resolve_geometry(100, 100, &settings).unwrap();
        // scale = min(0.9*400/100, 0.9*200/100) = 1.8
        assert_eq!((plan.draw_width, plan.draw_height), (180.0, 180.0));
        assert_eq!(plan.draw_x, 110.0);
        assert_eq!(plan.draw_y, 10.0);
    }
}
