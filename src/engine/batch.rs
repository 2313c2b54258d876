// src/engine/batch.rs
//
// Batch orchestration: MIME filtering, strictly sequential conversion with
// fractional progress, per-item skip-and-continue, aggregate outcome.
//
// The loop is intentionally sequential: progress fractions must be
// monotonically increasing and deterministic, and the aspect-ratio
// bootstrap depends on a well-defined "first file".

use crate::engine::converter::{convert_file, ConversionResult, SourceFile};
use crate::engine::decoder::read_dimensions;
use crate::error::ConvertError;
use crate::settings::ConversionSettings;
use std::fmt;
use tracing::{debug, info, warn};

/// MIME types every converter profile accepts.
pub const BASIC_ACCEPTED_TYPES: [&str; 4] =
    ["image/png", "image/jpeg", "image/jpg", "image/webp"];

/// Which converter surface submitted the batch. The basic converter
/// excludes GIF; the advanced one accepts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputProfile {
    Basic,
    Advanced,
}

impl InputProfile {
    pub fn accepts(&self, mime: &str) -> bool {
        BASIC_ACCEPTED_TYPES.contains(&mime)
            || (*self == Self::Advanced && mime == "image/gif")
    }

    fn accepted_list(&self) -> &'static str {
        match self {
            Self::Basic => "image/png, image/jpeg, image/jpg, image/webp",
            Self::Advanced => "image/png, image/jpeg, image/jpg, image/webp, image/gif",
        }
    }
}

/// One skipped file and the error that skipped it.
#[derive(Clone, Debug)]
pub struct BatchFailure {
    pub source_name: String,
    pub error: ConvertError,
}

/// Aggregate result of one batch run.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    /// Successful conversions, in submission order
    pub succeeded: Vec<ConversionResult>,
    /// Skipped files, in submission order
    pub failures: Vec<BatchFailure>,
    pub total_attempted: usize,
}

impl BatchOutcome {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Classify the run for user-visible reporting: zero successes out of
    /// N>0 attempts is a total failure, distinct from partial success.
    pub fn summary(&self) -> BatchSummary {
        if self.failures.is_empty() {
            BatchSummary::AllSucceeded {
                count: self.succeeded.len(),
            }
        } else if self.succeeded.is_empty() {
            BatchSummary::AllFailed {
                attempted: self.total_attempted,
            }
        } else {
            BatchSummary::PartialSuccess {
                succeeded: self.succeeded.len(),
                attempted: self.total_attempted,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchSummary {
    AllSucceeded { count: usize },
    PartialSuccess { succeeded: usize, attempted: usize },
    AllFailed { attempted: usize },
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllSucceeded { count } => write!(f, "converted {count} file(s)"),
            Self::PartialSuccess {
                succeeded,
                attempted,
            } => write!(f, "converted {succeeded} of {attempted} file(s)"),
            Self::AllFailed { attempted } => {
                write!(f, "all {attempted} file(s) failed to convert")
            }
        }
    }
}

/// Run a batch without progress reporting.
pub fn run_batch(
    files: &[SourceFile],
    settings: &ConversionSettings,
    profile: InputProfile,
) -> Result<BatchOutcome, ConvertError> {
    run_batch_with_progress(files, settings, profile, |_| {})
}

/// Run a batch, invoking `progress` after each item completes with the
/// fraction `items_done / total_items`.
///
/// Files whose declared MIME type is not accepted by `profile` are dropped
/// before processing; an empty remainder fails fast with `NoValidFiles`
/// before any decode. Per-file decode/encode failures are collected, never
/// raised.
pub fn run_batch_with_progress(
    files: &[SourceFile],
    settings: &ConversionSettings,
    profile: InputProfile,
    mut progress: impl FnMut(f32),
) -> Result<BatchOutcome, ConvertError> {
    settings.validate()?;

    let accepted: Vec<&SourceFile> = files.iter().filter(|f| profile.accepts(&f.mime)).collect();
    if accepted.is_empty() {
        return Err(ConvertError::no_valid_files(profile.accepted_list()));
    }

    // One snapshot owns the whole run. When the aspect ratio is unset,
    // derive it from the first file's header dimensions before any
    // conversion so width/height derivation has a basis for this batch.
    let mut snapshot = settings.clone();
    if snapshot.original_aspect_ratio.is_none() {
        match read_dimensions(&accepted[0].bytes) {
            Ok((width, height)) if height > 0 => {
                snapshot.original_aspect_ratio = Some(width as f64 / height as f64);
            }
            Ok(_) => {}
            Err(err) => {
                // The file will fail its own conversion below; nothing to
                // bootstrap from.
                debug!(source = %accepted[0].name, %err, "aspect-ratio probe failed");
            }
        }
    }

    let total = accepted.len();
    info!(total, "starting batch conversion");

    let mut succeeded = Vec::new();
    let mut failures = Vec::new();
    for (index, file) in accepted.iter().enumerate() {
        match convert_file(file, &snapshot) {
            Ok(result) => {
                debug!(
                    source = %file.name,
                    reduction_percent = result.reduction_percent,
                    "converted"
                );
                succeeded.push(result);
            }
            Err(error) => {
                warn!(source = %file.name, %error, "conversion failed, skipping");
                failures.push(BatchFailure {
                    source_name: file.name.clone(),
                    error,
                });
            }
        }
        progress((index + 1) as f32 / total as f32);
    }

    let outcome = BatchOutcome {
        succeeded,
        failures,
        total_attempted: total,
    };
    info!(
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed_count(),
        "batch finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_file(name: &str, width: u32, height: u32) -> SourceFile {
        let img = RgbImage::from_pixel(width, height, Rgb([50, 100, 150]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        SourceFile::new(name, "image/png", buf)
    }

    fn gif_file(name: &str) -> SourceFile {
        let img = RgbaImage::from_pixel(4, 4, Rgba([50, 100, 150, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
            .unwrap();
        SourceFile::new(name, "image/gif", buf)
    }

    fn corrupt_file(name: &str) -> SourceFile {
        SourceFile::new(name, "image/png", b"not an image at all".to_vec())
    }

    #[test]
    fn test_partial_failure_skips_and_continues() {
        let files = vec![
            png_file("a.png", 8, 8),
            corrupt_file("b.png"),
            png_file("c.png", 8, 8),
            corrupt_file("d.png"),
            png_file("e.png", 8, 8),
        ];
        let outcome =
            run_batch(&files, &ConversionSettings::default(), InputProfile::Basic).unwrap();
        assert_eq!(outcome.succeeded.len(), 3);
        assert_eq!(outcome.failed_count(), 2);
        assert_eq!(outcome.total_attempted, 5);
        assert_eq!(
            outcome.summary(),
            BatchSummary::PartialSuccess {
                succeeded: 3,
                attempted: 5
            }
        );
        let failed_names: Vec<_> = outcome
            .failures
            .iter()
            .map(|f| f.source_name.as_str())
            .collect();
        assert_eq!(failed_names, ["b.png", "d.png"]);
    }

    #[test]
    fn test_no_valid_files_fails_fast() {
        let files = vec![SourceFile::new("doc.pdf", "application/pdf", vec![1, 2, 3])];
        let err = run_batch(&files, &ConversionSettings::default(), InputProfile::Basic)
            .unwrap_err();
        assert!(matches!(err, ConvertError::NoValidFiles { .. }));
    }

    #[test]
    fn test_empty_submission_fails_fast() {
        let err = run_batch(&[], &ConversionSettings::default(), InputProfile::Basic)
            .unwrap_err();
        assert!(matches!(err, ConvertError::NoValidFiles { .. }));
    }

    #[test]
    fn test_all_failed_summary() {
        let files = vec![corrupt_file("a.png"), corrupt_file("b.png")];
        let outcome =
            run_batch(&files, &ConversionSettings::default(), InputProfile::Basic).unwrap();
        assert_eq!(outcome.summary(), BatchSummary::AllFailed { attempted: 2 });
    }

    #[test]
    fn test_gif_excluded_by_basic_profile() {
        let files = vec![gif_file("anim.gif")];
        let err = run_batch(&files, &ConversionSettings::default(), InputProfile::Basic)
            .unwrap_err();
        assert!(matches!(err, ConvertError::NoValidFiles { .. }));
    }

    #[test]
    fn test_gif_accepted_by_advanced_profile() {
        let files = vec![gif_file("anim.gif")];
        let outcome =
            run_batch(&files, &ConversionSettings::default(), InputProfile::Advanced).unwrap();
        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.summary(), BatchSummary::AllSucceeded { count: 1 });
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let files = vec![
            png_file("a.png", 4, 4),
            corrupt_file("b.png"),
            png_file("c.png", 4, 4),
            png_file("d.png", 4, 4),
        ];
        let mut fractions = Vec::new();
        run_batch_with_progress(
            &files,
            &ConversionSettings::default(),
            InputProfile::Basic,
            |f| fractions.push(f),
        )
        .unwrap();

        assert_eq!(fractions.len(), 4);
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        assert!((fractions[0] - 0.25).abs() < 1e-6);
        assert!((fractions[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_ratio_bootstrapped_from_first_file() {
        let files = vec![png_file("first.png", 100, 50), png_file("second.png", 30, 30)];
        let outcome =
            run_batch(&files, &ConversionSettings::default(), InputProfile::Basic).unwrap();
        // Both results carry the snapshot derived from the first file
        for result in &outcome.succeeded {
            assert_eq!(result.settings_used.original_aspect_ratio, Some(2.0));
        }
    }

    #[test]
    fn test_existing_aspect_ratio_is_kept() {
        let settings = ConversionSettings {
            original_aspect_ratio: Some(1.5),
            ..Default::default()
        };
        let files = vec![png_file("a.png", 100, 50)];
        let outcome = run_batch(&files, &settings, InputProfile::Basic).unwrap();
        assert_eq!(
            outcome.succeeded[0].settings_used.original_aspect_ratio,
            Some(1.5)
        );
    }

    #[test]
    fn test_oversized_target_fails_items_without_aborting() {
        let settings = ConversionSettings {
            resize: true,
            width: Some(u32::MAX),
            height: Some(u32::MAX),
            ..Default::default()
        };
        let files = vec![png_file("a.png", 4, 4), png_file("b.png", 4, 4)];
        let outcome = run_batch(&files, &settings, InputProfile::Basic).unwrap();
        assert_eq!(outcome.summary(), BatchSummary::AllFailed { attempted: 2 });
        assert!(outcome.failures.iter().all(|f| f.error.is_per_item()));
    }

    #[test]
    fn test_invalid_settings_rejected_before_processing() {
        let settings = ConversionSettings {
            quality: 2.0,
            ..Default::default()
        };
        let files = vec![png_file("a.png", 4, 4)];
        assert!(matches!(
            run_batch(&files, &settings, InputProfile::Basic),
            Err(ConvertError::InvalidQuality { .. })
        ));
    }
}
