//! Input model: event records, modifier keys, and the gesture state machine.
//!
//! The host translates DOM events into these records. `InputState` is the
//! gesture tracked between pointer-down and pointer-up; `UiState` is the
//! longer-lived editor state (mode, selection, guides, cooldowns) that the
//! engine threads through every handler explicitly.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::doc::ItemId;
use crate::hit::Corner;
use crate::placement::Mode;
use crate::snap::Guides;
use crate::transform::{NormPoint, PageRect, Point};

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key name as reported by the browser (`"Escape"`, `"Delete"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape"
    }

    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.0 == "Delete" || self.0 == "Backspace"
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive scrolls down.
    pub dy: f64,
}

/// A pointer event over a rendered page.
#[derive(Debug, Clone, Copy)]
pub struct Pointer {
    /// 1-based page under the pointer (or the page a gesture started on).
    pub page: u32,
    /// Client-space position.
    pub pos: Point,
    /// Current on-screen rect of `page`.
    pub rect: PageRect,
    /// Event timestamp in milliseconds, monotonic.
    pub at_ms: u64,
}

/// Persistent UI state visible to the host renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub mode: Mode,
    /// At most one selected item.
    pub selected_id: Option<ItemId>,
    /// Text chip whose content is being edited in place.
    pub editing_id: Option<ItemId>,
    /// Alignment guides of the drag in progress.
    pub guides: Option<Guides>,
    /// Placement clicks before this instant are ignored.
    pub quiet_until_ms: u64,
    /// Time of the last successful placement.
    pub last_place_ms: Option<u64>,
}

/// Gesture tracked between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Pressed on an item body; becomes a drag once the pointer travels far
    /// enough, otherwise the release counts as a click.
    Armed {
        id: ItemId,
        /// Screen position of the press.
        start: Point,
        /// Pointer minus item origin, in normalized units.
        grab: NormPoint,
    },
    /// Moving an item.
    Dragging { id: ItemId, grab: NormPoint },
    /// Scaling an item about its center from one corner handle.
    Resizing {
        id: ItemId,
        corner: Corner,
        /// Pointer distance from the item center at the start, in pixels.
        start_radius: f64,
        orig_x: f64,
        orig_y: f64,
        orig_w: f64,
        orig_h: f64,
    },
}

impl InputState {
    /// Id of the item the gesture is acting on.
    #[must_use]
    pub fn target(&self) -> Option<ItemId> {
        match self {
            Self::Idle => None,
            Self::Armed { id, .. } | Self::Dragging { id, .. } | Self::Resizing { id, .. } => Some(*id),
        }
    }
}
