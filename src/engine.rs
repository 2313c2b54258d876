// src/engine.rs
//
// The core of towebp. A per-file conversion pipeline that:
// 1. Decodes input bytes into a pixel surface
// 2. Plans output geometry (direct resize vs. letterbox composition)
// 3. Re-renders and encodes to WebP at the requested quality
// plus the batch orchestrator and the ZIP archive exporter built on top.
//
// This file is a facade that delegates to the decomposed modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod archive;
mod batch;
mod converter;
mod decoder;
mod geometry;

pub use archive::{
    archive_file_name, archive_file_name_for, pack, webp_file_name, CollisionPolicy,
};
pub use batch::{
    run_batch, run_batch_with_progress, BatchFailure, BatchOutcome, BatchSummary, InputProfile,
    BASIC_ACCEPTED_TYPES,
};
pub use converter::{convert_file, ConversionResult, SourceFile};
pub use decoder::{check_dimensions, decode_image, detect_format, read_dimensions};
pub use geometry::{resolve_geometry, RenderPlan};
