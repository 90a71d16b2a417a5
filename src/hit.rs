//! Hit-testing pointer positions against overlay items on one page.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::config::EditorConfig;
use crate::doc::{ItemId, OverlayItem, OverlayStore};
use crate::transform::{PageRect, Point};

/// Resize handle position, named by screen compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthEast,
    SouthWest,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::NorthWest, Corner::NorthEast, Corner::SouthEast, Corner::SouthWest];
}

/// Which part of an item was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Handle(Corner),
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub item_id: ItemId,
    pub part: HitPart,
}

/// An item's unrotated box in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise degrees about the center.
    pub rotate: f64,
}

impl PixelBox {
    /// Screen box of `item` inside `rect`. Normalized y is bottom-up, so the
    /// box top sits at `1 - y - h` of the page height.
    #[must_use]
    pub fn of(item: &OverlayItem, rect: &PageRect) -> Self {
        Self {
            left: rect.left + item.x * rect.width,
            top: rect.top + (1.0 - item.y - item.h) * rect.height,
            width: item.w * rect.width,
            height: item.h * rect.height,
            rotate: item.rotate,
        }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Screen position of a corner handle, following the box rotation.
    #[must_use]
    pub fn corner(&self, corner: Corner) -> Point {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let (dx, dy) = match corner {
            Corner::NorthWest => (-hw, -hh),
            Corner::NorthEast => (hw, -hh),
            Corner::SouthEast => (hw, hh),
            Corner::SouthWest => (-hw, hh),
        };
        let c = self.center();
        let (sin, cos) = self.rotate.to_radians().sin_cos();
        Point::new(c.x + dx * cos - dy * sin, c.y + dx * sin + dy * cos)
    }

    /// Whether `p` lies inside the box grown by `margin` on every side.
    #[must_use]
    pub fn contains(&self, p: Point, margin: f64) -> bool {
        let c = self.center();
        let (sin, cos) = (-self.rotate).to_radians().sin_cos();
        let (dx, dy) = (p.x - c.x, p.y - c.y);
        let local_x = dx * cos - dy * sin;
        let local_y = dx * sin + dy * cos;
        local_x.abs() <= self.width / 2.0 + margin && local_y.abs() <= self.height / 2.0 + margin
    }
}

/// Find the item under `pos` on `page`.
///
/// The selected item's corner handles win over any body. Bodies are tested
/// topmost-first with the forgiveness margin.
#[must_use]
pub fn hit_test(
    pos: Point,
    page: u32,
    rect: &PageRect,
    store: &OverlayStore,
    selected_id: Option<ItemId>,
    config: &EditorConfig,
) -> Option<Hit> {
    if rect.is_degenerate() {
        return None;
    }
    if let Some(selected) = selected_id.and_then(|id| store.get(&id)).filter(|item| item.page == page) {
        let bx = PixelBox::of(selected, rect);
        for corner in Corner::ALL {
            if bx.corner(corner).distance(pos) <= config.handle_radius_px {
                return Some(Hit { item_id: selected.id, part: HitPart::Handle(corner) });
            }
        }
    }
    store
        .on_page(page)
        .rev()
        .find(|item| PixelBox::of(item, rect).contains(pos, config.forgiveness_px))
        .map(|item| Hit { item_id: item.id, part: HitPart::Body })
}

/// Whether `pos` falls within the forgiveness zone of any item on `page`.
#[must_use]
pub fn near_item(pos: Point, page: u32, rect: &PageRect, store: &OverlayStore, forgiveness_px: f64) -> bool {
    !rect.is_degenerate() && store.on_page(page).any(|item| PixelBox::of(item, rect).contains(pos, forgiveness_px))
}
