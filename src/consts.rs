//! Shared numeric constants for the overlay engine.
//!
//! Values a host may want to tune live in [`crate::config::EditorConfig`];
//! the ones here are fixed geometry.

// ── Resize ──────────────────────────────────────────────────────

/// Smallest scale factor a single resize gesture may apply.
pub const RESIZE_SCALE_MIN: f64 = 0.2;

/// Largest scale factor a single resize gesture may apply.
pub const RESIZE_SCALE_MAX: f64 = 5.0;

/// Floor for normalized item width/height after a resize.
pub const MIN_ITEM_SIZE: f64 = 0.02;

/// Lower bound for the start-of-gesture pointer distance, in pixels.
pub const MIN_RESIZE_RADIUS_PX: f64 = 0.0001;

// ── Rotate ──────────────────────────────────────────────────────

/// Interactive rotation is clamped to `[-ROTATE_LIMIT_DEG, ROTATE_LIMIT_DEG]`.
pub const ROTATE_LIMIT_DEG: f64 = 180.0;

// ── Placement boxes ─────────────────────────────────────────────

/// Normalized width of text and checkbox chips.
pub const CHIP_WIDTH: f64 = 0.25;

/// Normalized height of text and checkbox chips.
pub const CHIP_HEIGHT: f64 = 0.08;

/// Normalized width of signature, initials, and date marks.
pub const MARK_WIDTH: f64 = 0.125;

/// Normalized height of signature, initials, and date marks.
pub const MARK_HEIGHT: f64 = 0.04;

/// Typed initials are cut to this many characters.
pub const MAX_INITIALS_CHARS: usize = 4;

// ── Payload defaults ────────────────────────────────────────────

/// Text size for items that carry no usable size.
pub const FALLBACK_SIZE_PT: f64 = 18.0;

/// Default ink for every tool.
pub const DEFAULT_INK: &str = "#111827";

/// Editing-time highlight behind freshly placed chips.
pub const DEFAULT_HIGHLIGHT: &str = "rgba(22,163,74,0.15)";

pub const TEXT_SIZE_PT: f64 = 12.0;
pub const DATE_SIZE_PT: f64 = 12.0;
pub const CHECKBOX_SIZE_PT: f64 = 20.0;
pub const TYPED_MARK_SIZE_PT: f64 = 28.0;

// ── Rasterization ───────────────────────────────────────────────

/// CSS pixels per PDF point.
pub const PX_PER_PT: f64 = 96.0 / 72.0;

/// Oversampling factor for rasterized marks.
pub const RASTER_SCALE: f64 = 2.0;

/// Pixels with alpha at or below this are treated as transparent when trimming.
pub const ALPHA_TRIM_THRESHOLD: u8 = 5;
