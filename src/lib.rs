// lib.rs
//
// towebp: an in-memory raster -> WebP conversion engine
//
// Design goals:
// - Everything in memory: named byte buffers in, WebP byte buffers out
// - One conversion pipeline: decode -> geometry plan -> re-render -> encode
// - Batches skip broken files instead of aborting
// - ZIP export for one-shot download of a whole batch

pub mod engine;
pub mod error;
pub mod settings;

pub use engine::{
    archive_file_name, archive_file_name_for, convert_file, pack, run_batch,
    run_batch_with_progress, webp_file_name, BatchFailure, BatchOutcome, BatchSummary,
    CollisionPolicy, ConversionResult, InputProfile, SourceFile,
};
pub use error::{ConvertError, ErrorCategory};
pub use settings::{
    derive_complementary_dimension, Axis, CanvasColor, CanvasMode, ConversionSettings, SizePreset,
};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// MIME type of every produced output.
pub const OUTPUT_MIME_TYPE: &str = "image/webp";
