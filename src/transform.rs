//! Coordinate transform between screen pixels and normalized page space.
//!
//! Screen space is the host's client coordinate system: origin top-left, y
//! grows downward, units are CSS pixels at the current zoom. Normalized space
//! is a fraction of the page: origin bottom-left, y grows upward, both axes in
//! `[0, 1]`. Overlay geometry is only ever stored normalized, so it survives
//! zoom changes untouched and maps onto PDF user space by plain scaling.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

/// A point in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A point in normalized page space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormPoint {
    pub x: f64,
    pub y: f64,
}

impl NormPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen rectangle of one rendered page at the active zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PageRect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// A rect with zero or negative extent cannot map coordinates.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Page-edge margin expressed in normalized units for one page rect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Inset {
    pub x: f64,
    pub y: f64,
}

/// An item box in normalized page space, anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NormBox {
    #[must_use]
    pub fn center(&self) -> NormPoint {
        NormPoint { x: self.x + self.w / 2.0, y: self.y + self.h / 2.0 }
    }

    /// Clamp the position so the whole box stays inside the inset margin.
    #[must_use]
    pub fn clamped(self, inset: Inset) -> Self {
        Self {
            x: clamp_span(self.x, inset.x, 1.0 - inset.x - self.w),
            y: clamp_span(self.y, inset.y, 1.0 - inset.y - self.h),
            ..self
        }
    }
}

/// Clamp `value` into `[lo, hi]`, collapsing to `lo` when the span is inverted.
///
/// Used wherever the upper bound depends on an item's own extent, which can
/// exceed the available room on very small renders.
#[must_use]
pub fn clamp_span(value: f64, lo: f64, hi: f64) -> f64 {
    if hi < lo { lo } else { value.max(lo).min(hi) }
}

/// Pure screen ↔ normalized conversions for a fixed inset and grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub inset_px: f64,
    pub grid_px: f64,
}

impl Transform {
    #[must_use]
    pub fn new(inset_px: f64, grid_px: f64) -> Self {
        Self { inset_px, grid_px }
    }

    /// The inset margin converted to normalized units for `rect`.
    #[must_use]
    pub fn inset(&self, rect: &PageRect) -> Inset {
        if rect.is_degenerate() {
            return Inset::default();
        }
        Inset { x: self.inset_px / rect.width, y: self.inset_px / rect.height }
    }

    /// Map a screen point to normalized page space, flipping the vertical axis
    /// and clamping both axes to the inset margin.
    #[must_use]
    pub fn to_normalized(&self, screen: Point, rect: &PageRect) -> NormPoint {
        let fraction = self.pointer_fraction(screen, rect);
        let inset = self.inset(rect);
        NormPoint {
            x: clamp_span(fraction.x, inset.x, 1.0 - inset.x),
            y: clamp_span(fraction.y, inset.y, 1.0 - inset.y),
        }
    }

    /// Map a normalized point back to a screen point, with the same clamp.
    #[must_use]
    pub fn to_pixel(&self, norm: NormPoint, rect: &PageRect) -> Point {
        let inset = self.inset(rect);
        let x = clamp_span(norm.x, inset.x, 1.0 - inset.x);
        let y = clamp_span(norm.y, inset.y, 1.0 - inset.y);
        Point { x: rect.left + x * rect.width, y: rect.top + (1.0 - y) * rect.height }
    }

    /// Pointer position as a page fraction clamped to `[0, 1]`, without the
    /// inset. Drag math works from this so the grab offset stays stable.
    #[must_use]
    pub fn pointer_fraction(&self, screen: Point, rect: &PageRect) -> NormPoint {
        if rect.is_degenerate() {
            return NormPoint::default();
        }
        NormPoint {
            x: ((screen.x - rect.left) / rect.width).clamp(0.0, 1.0),
            y: (1.0 - (screen.y - rect.top) / rect.height).clamp(0.0, 1.0),
        }
    }

    /// Round a screen point to the nearest grid intersection, measured from
    /// the page's top-left corner.
    #[must_use]
    pub fn snap_to_grid(&self, screen: Point, rect: &PageRect) -> Point {
        let grid = self.grid_px;
        let local_x = screen.x - rect.left;
        let local_y = screen.y - rect.top;
        Point {
            x: rect.left + (local_x / grid).round() * grid,
            y: rect.top + (local_y / grid).round() * grid,
        }
    }

    /// Normalized position for a placement click: grid snap, then normalize.
    #[must_use]
    pub fn placement_point(&self, screen: Point, rect: &PageRect) -> NormPoint {
        self.to_normalized(self.snap_to_grid(screen, rect), rect)
    }
}
