//! Center alignment snapping against sibling items while dragging.

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use crate::doc::{ItemId, OverlayStore};
use crate::transform::{NormBox, PageRect};

/// Guide lines to draw during a drag, in pixels from the page's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Guides {
    pub page: u32,
    /// Shared center x of a horizontal-axis snap.
    pub vertical: Option<f64>,
    /// Shared center y of a vertical-axis snap.
    pub horizontal: Option<f64>,
}

impl Guides {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }
}

/// Align `candidate`'s center with the nearest sibling center on each axis.
///
/// Each axis snaps independently, to the closest sibling whose center lies
/// within `snap_px` screen pixels. The snapped axis is set so the centers are
/// exactly equal in normalized space.
#[must_use]
pub fn align_centers(
    candidate: NormBox,
    moving_id: ItemId,
    page: u32,
    store: &OverlayStore,
    rect: &PageRect,
    snap_px: f64,
) -> (NormBox, Guides) {
    let mut out = candidate;
    let mut guides = Guides { page, ..Guides::default() };
    if rect.is_degenerate() {
        return (out, guides);
    }

    let center = candidate.center();
    let mut best_x: Option<(f64, f64)> = None;
    let mut best_y: Option<(f64, f64)> = None;

    for sibling in store.on_page(page).filter(|item| item.id != moving_id) {
        let sc = sibling.bounds().center();
        let dx = (sc.x - center.x).abs() * rect.width;
        let dy = (sc.y - center.y).abs() * rect.height;
        if dx <= snap_px && best_x.is_none_or(|(d, _)| dx < d) {
            best_x = Some((dx, sc.x));
        }
        if dy <= snap_px && best_y.is_none_or(|(d, _)| dy < d) {
            best_y = Some((dy, sc.y));
        }
    }

    if let Some((_, cx)) = best_x {
        out.x = cx - candidate.w / 2.0;
        guides.vertical = Some(cx * rect.width);
    }
    if let Some((_, cy)) = best_y {
        out.y = cy - candidate.h / 2.0;
        guides.horizontal = Some((1.0 - cy) * rect.height);
    }
    (out, guides)
}
