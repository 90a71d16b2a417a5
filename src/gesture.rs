//! Drag, resize, and rotate math.
//!
//! Every function here is total: inputs from continuous pointer math are
//! clamped into range, never rejected.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use crate::consts::{MIN_ITEM_SIZE, MIN_RESIZE_RADIUS_PX, RESIZE_SCALE_MAX, RESIZE_SCALE_MIN, ROTATE_LIMIT_DEG};
use crate::transform::{Inset, NormBox, NormPoint, PageRect, Point, clamp_span};

/// Screen position of a box center.
#[must_use]
pub fn center_px(b: NormBox, rect: &PageRect) -> Point {
    let c = b.center();
    Point::new(rect.left + c.x * rect.width, rect.top + (1.0 - c.y) * rect.height)
}

/// Unclamped box for a drag: the pointer fraction minus the grab offset.
#[must_use]
pub fn drag_candidate(pointer: NormPoint, grab: NormPoint, w: f64, h: f64) -> NormBox {
    NormBox { x: pointer.x - grab.x, y: pointer.y - grab.y, w, h }
}

/// Scale `orig` about its center by the ratio of the pointer's current
/// distance from that center to `start_radius`.
///
/// The ratio is held to `[0.2, 5]`, each side is floored at the minimum item
/// size and capped at the room inside the insets, and the result is clamped
/// back inside the page. That last clamp can shift the center.
#[must_use]
pub fn resize(orig: NormBox, start_radius: f64, pointer: Point, rect: &PageRect, inset: Inset) -> NormBox {
    let radius = pointer.distance(center_px(orig, rect));
    let scale = (radius / start_radius.max(MIN_RESIZE_RADIUS_PX)).clamp(RESIZE_SCALE_MIN, RESIZE_SCALE_MAX);
    let max_w = (1.0 - 2.0 * inset.x).max(MIN_ITEM_SIZE);
    let max_h = (1.0 - 2.0 * inset.y).max(MIN_ITEM_SIZE);
    let w = clamp_span(orig.w * scale, MIN_ITEM_SIZE, max_w);
    let h = clamp_span(orig.h * scale, MIN_ITEM_SIZE, max_h);
    let c = orig.center();
    NormBox { x: c.x - w / 2.0, y: c.y - h / 2.0, w, h }.clamped(inset)
}

/// Rotation after one wheel tick. Scrolling down turns clockwise.
#[must_use]
pub fn rotate_step(current: f64, wheel_dy: f64, step_deg: f64) -> f64 {
    let delta = if wheel_dy > 0.0 {
        step_deg
    } else if wheel_dy < 0.0 {
        -step_deg
    } else {
        0.0
    };
    (current + delta).clamp(-ROTATE_LIMIT_DEG, ROTATE_LIMIT_DEG)
}
