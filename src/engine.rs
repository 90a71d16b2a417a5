//! Interaction engine: turns input event records into store mutations.
//!
//! `EngineCore` owns the overlay store and all editor state. Each handler
//! takes one event record and returns the [`Action`]s the host must apply
//! (re-render, persist, open the capture modal, rasterize a mark). Nothing
//! here touches the DOM or does I/O, so the whole interaction surface is
//! testable with plain values.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use tracing::debug;

use crate::config::EditorConfig;
use crate::doc::{DocError, ItemContent, ItemId, OverlayItem, OverlayStore, PartialOverlayItem};
use crate::gesture::{center_px, drag_candidate, resize, rotate_step};
use crate::hit::{HitPart, hit_test, near_item};
use crate::input::{Button, InputState, Key, Modifiers, Pointer, UiState, WheelDelta};
use crate::placement::{MarkKind, Mode, PlacePayload, SignatureCapture, Tool, ToolOutcome, press_tool, today_label};
use crate::snap::{Guides, align_centers};
use crate::transform::{NormBox, NormPoint, Transform};

/// A typed mark waiting to be turned into a PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterJob {
    pub item_id: ItemId,
    pub text: String,
    pub font_key: Option<String>,
    pub size_pt: f64,
    pub color: String,
}

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ItemCreated(OverlayItem),
    ItemUpdated { id: ItemId, fields: PartialOverlayItem },
    ItemDeleted { id: ItemId },
    SelectionChanged(Option<ItemId>),
    /// The tool being placed, or `None` for select mode.
    ModeChanged(Option<Tool>),
    GuidesChanged(Option<Guides>),
    EditTextRequested { id: ItemId, text: String },
    RasterizeRequested(RasterJob),
    OpenSignatureModal(MarkKind),
    StoreCleared,
    RenderNeeded,
}

/// Core engine state.
pub struct EngineCore {
    pub doc: OverlayStore,
    pub ui: UiState,
    pub input: InputState,
    pub config: EditorConfig,
    pub transform: Transform,
    /// Pages in the loaded document, as reported by the page renderer.
    pub page_count: u32,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            doc: OverlayStore::new(),
            ui: UiState::default(),
            input: InputState::default(),
            transform: Transform::new(config.page_inset_px, config.grid_px),
            config,
            page_count: 0,
        }
    }

    // --- Data inputs ---

    /// Restore a persisted overlay list.
    pub fn load_snapshot(&mut self, items: Vec<OverlayItem>) {
        self.doc.load_snapshot(items);
        self.ui.selected_id = None;
        self.ui.editing_id = None;
        self.input = InputState::Idle;
    }

    /// Restore an overlay list persisted with [`OverlayStore::to_json`].
    ///
    /// # Errors
    ///
    /// [`DocError`] if `json` does not parse; the current items are kept.
    pub fn load_json(&mut self, json: &str) -> Result<(), DocError> {
        let items: Vec<OverlayItem> = serde_json::from_str(json)?;
        self.load_snapshot(items);
        Ok(())
    }

    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = page_count;
    }

    // --- Tools ---

    /// Handle a toolbar button press.
    ///
    /// Any gesture in flight is dropped and the selection is cleared.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let outcome = press_tool(&self.ui.mode, tool, &today_label());
        let mut actions = self.reset_transient();
        actions.extend(self.select(None));
        match outcome {
            ToolOutcome::Mode(mode) => actions.extend(self.set_mode(mode)),
            ToolOutcome::Capture(kind) => {
                actions.extend(self.set_mode(Mode::Select));
                actions.push(Action::OpenSignatureModal(kind));
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// The signature modal was saved. Blank typed input places nothing.
    pub fn modal_saved(&mut self, kind: MarkKind, capture: SignatureCapture) -> Vec<Action> {
        let Some(payload) = PlacePayload::from_capture(kind, capture) else {
            debug!(?kind, "empty capture rejected");
            return Vec::new();
        };
        self.set_mode(Mode::Place(payload))
    }

    // --- Item edits ---

    /// Commit in-place edited text back into a text chip.
    pub fn set_text(&mut self, id: &ItemId, text: String) -> Option<Action> {
        if !matches!(self.doc.get(id).map(|item| &item.content), Some(ItemContent::Text { .. })) {
            return None;
        }
        let fields = PartialOverlayItem { text: Some(text), ..Default::default() };
        self.doc.update(id, &fields);
        if self.ui.editing_id == Some(*id) {
            self.ui.editing_id = None;
        }
        Some(Action::ItemUpdated { id: *id, fields })
    }

    /// Swap a literal mark for its rasterized PNG.
    pub fn commit_raster(&mut self, id: &ItemId, data_url: String) -> Option<Action> {
        let fields = PartialOverlayItem { data_url: Some(data_url), ..Default::default() };
        if self.doc.update(id, &fields) { Some(Action::ItemUpdated { id: *id, fields }) } else { None }
    }

    /// Delete an item and start the delete cooldown.
    pub fn delete(&mut self, id: &ItemId, at_ms: u64) -> Vec<Action> {
        if self.doc.remove(id).is_none() {
            return Vec::new();
        }
        let mut actions = vec![Action::ItemDeleted { id: *id }];
        if self.input.target() == Some(*id) {
            actions.extend(self.reset_transient());
        }
        if self.ui.selected_id == Some(*id) {
            actions.extend(self.select(None));
        }
        if self.ui.editing_id == Some(*id) {
            self.ui.editing_id = None;
        }
        self.ui.quiet_until_ms = at_ms.saturating_add(self.config.delete_cooldown_ms);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Empty the store.
    pub fn clear_all(&mut self) -> Vec<Action> {
        let mut actions = self.reset_transient();
        actions.extend(self.select(None));
        self.ui.editing_id = None;
        self.doc.clear();
        actions.push(Action::StoreCleared);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Copy an item onto every other page.
    pub fn duplicate_to_all_pages(&mut self, id: &ItemId) -> Vec<Action> {
        let clones = self.doc.duplicate_to_all_pages(id, self.page_count);
        if clones.is_empty() {
            return Vec::new();
        }
        let mut actions: Vec<Action> = clones.into_iter().map(Action::ItemCreated).collect();
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, p: Pointer, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary || p.rect.is_degenerate() || self.ui.mode.is_placing() {
            return Vec::new();
        }
        let hit = hit_test(p.pos, p.page, &p.rect, &self.doc, self.ui.selected_id, &self.config);
        let Some(hit) = hit else {
            let mut actions = self.select(None);
            if self.ui.editing_id.take().is_some() || !actions.is_empty() {
                actions.push(Action::RenderNeeded);
            }
            return actions;
        };
        let Some(item) = self.doc.get(&hit.item_id) else {
            return Vec::new();
        };
        let bounds = item.bounds();

        match hit.part {
            HitPart::Handle(corner) => {
                self.input = InputState::Resizing {
                    id: hit.item_id,
                    corner,
                    start_radius: p.pos.distance(center_px(bounds, &p.rect)),
                    orig_x: bounds.x,
                    orig_y: bounds.y,
                    orig_w: bounds.w,
                    orig_h: bounds.h,
                };
                Vec::new()
            }
            HitPart::Body => {
                let mut actions = self.select(Some(hit.item_id));
                if self.ui.editing_id == Some(hit.item_id) {
                    return actions;
                }
                let fraction = self.transform.pointer_fraction(p.pos, &p.rect);
                self.input = InputState::Armed {
                    id: hit.item_id,
                    start: p.pos,
                    grab: NormPoint::new(fraction.x - bounds.x, fraction.y - bounds.y),
                };
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    pub fn on_pointer_move(&mut self, p: Pointer, _modifiers: Modifiers) -> Vec<Action> {
        if p.rect.is_degenerate() {
            return Vec::new();
        }
        if let InputState::Armed { id, start, grab } = self.input {
            if p.pos.distance(start) <= self.config.drag_threshold_px {
                return Vec::new();
            }
            self.input = InputState::Dragging { id, grab };
        }

        match self.input.clone() {
            InputState::Dragging { id, grab } => self.drag_to(id, grab, &p),
            InputState::Resizing { id, start_radius, orig_x, orig_y, orig_w, orig_h, .. } => {
                let orig = NormBox { x: orig_x, y: orig_y, w: orig_w, h: orig_h };
                let next = resize(orig, start_radius, p.pos, &p.rect, self.transform.inset(&p.rect));
                let fields = PartialOverlayItem::bounds(next.x, next.y, next.w, next.h);
                if !self.doc.update(&id, &fields) {
                    self.input = InputState::Idle;
                    return Vec::new();
                }
                vec![Action::ItemUpdated { id, fields }, Action::RenderNeeded]
            }
            InputState::Idle | InputState::Armed { .. } => Vec::new(),
        }
    }

    pub fn on_pointer_up(&mut self, p: Pointer, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => {
                if button == Button::Primary && self.ui.mode.is_placing() {
                    self.place(&p)
                } else {
                    Vec::new()
                }
            }
            InputState::Armed { id, .. } => {
                self.start_release_cooldown(p.at_ms);
                match self.doc.get(&id).map(|item| &item.content) {
                    Some(ItemContent::Text { text, .. }) => {
                        self.ui.editing_id = Some(id);
                        vec![Action::EditTextRequested { id, text: text.clone() }]
                    }
                    _ => Vec::new(),
                }
            }
            InputState::Dragging { .. } | InputState::Resizing { .. } => {
                self.start_release_cooldown(p.at_ms);
                let mut actions = self.set_guides(None);
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    /// Shift + wheel rotates the item under the pointer, or the selection.
    pub fn on_wheel(&mut self, p: Pointer, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if !modifiers.shift {
            return Vec::new();
        }
        let under = hit_test(p.pos, p.page, &p.rect, &self.doc, None, &self.config).map(|hit| hit.item_id);
        let Some(id) = under.or(self.ui.selected_id) else {
            return Vec::new();
        };
        let Some(item) = self.doc.get(&id) else {
            return Vec::new();
        };
        let rotate = rotate_step(item.rotate, delta.dy, self.config.rotate_step_deg);
        if (rotate - item.rotate).abs() < f64::EPSILON {
            return Vec::new();
        }
        let fields = PartialOverlayItem { rotate: Some(rotate), ..Default::default() };
        self.doc.update(&id, &fields);
        vec![Action::ItemUpdated { id, fields }, Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: &Key, _modifiers: Modifiers, at_ms: u64) -> Vec<Action> {
        if key.is_escape() {
            return self.cancel();
        }
        if key.is_delete() && self.ui.editing_id.is_none() {
            if let Some(id) = self.ui.selected_id {
                return self.delete(&id, at_ms);
            }
        }
        Vec::new()
    }

    /// Drop to select mode and discard every transient gesture state.
    /// No item is touched.
    pub fn cancel(&mut self) -> Vec<Action> {
        let mut actions = self.reset_transient();
        self.ui.editing_id = None;
        actions.extend(self.set_mode(Mode::Select));
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> Option<ItemId> {
        self.ui.selected_id
    }

    #[must_use]
    pub fn mode(&self) -> &Mode {
        &self.ui.mode
    }

    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&OverlayItem> {
        self.doc.get(id)
    }

    // --- Internals ---

    fn drag_to(&mut self, id: ItemId, grab: NormPoint, p: &Pointer) -> Vec<Action> {
        let Some(item) = self.doc.get(&id) else {
            self.input = InputState::Idle;
            return Vec::new();
        };
        let fraction = self.transform.pointer_fraction(p.pos, &p.rect);
        let candidate = drag_candidate(fraction, grab, item.w, item.h);
        let (snapped, guides) = align_centers(candidate, id, item.page, &self.doc, &p.rect, self.config.snap_px);
        let next = snapped.clamped(self.transform.inset(&p.rect));

        let fields = PartialOverlayItem::position(next.x, next.y);
        self.doc.update(&id, &fields);
        let mut actions = vec![Action::ItemUpdated { id, fields }];
        actions.extend(self.set_guides(if guides.is_empty() { None } else { Some(guides) }));
        actions.push(Action::RenderNeeded);
        actions
    }

    fn place(&mut self, p: &Pointer) -> Vec<Action> {
        let Mode::Place(payload) = &self.ui.mode else {
            return Vec::new();
        };
        if p.at_ms < self.ui.quiet_until_ms {
            debug!(at_ms = p.at_ms, "placement suppressed by cooldown");
            return Vec::new();
        }
        if self.ui.last_place_ms.is_some_and(|last| p.at_ms.saturating_sub(last) < self.config.place_debounce_ms) {
            debug!(at_ms = p.at_ms, "placement debounced");
            return Vec::new();
        }
        // Any release that gets past the cooldowns restarts the debounce window.
        self.ui.last_place_ms = Some(p.at_ms);
        if p.rect.is_degenerate() || p.page == 0 || p.page > self.page_count {
            debug!(page = p.page, page_count = self.page_count, "placement outside document");
            return Vec::new();
        }
        if near_item(p.pos, p.page, &p.rect, &self.doc, self.config.forgiveness_px) {
            debug!(page = p.page, "placement suppressed near existing item");
            return Vec::new();
        }

        let at = self.transform.placement_point(p.pos, &p.rect);
        let item = payload.instantiate(p.page, at, self.transform.inset(&p.rect));
        let id = self.doc.add(item.clone());

        let follow_up = match &item.content {
            ItemContent::Text { text, .. } => {
                self.ui.editing_id = Some(id);
                Some(Action::EditTextRequested { id, text: text.clone() })
            }
            ItemContent::Signature(_) | ItemContent::Initials(_) | ItemContent::Date(_) => {
                item.content.literal().map(|(text, font_key)| {
                    Action::RasterizeRequested(RasterJob {
                        item_id: id,
                        text: text.to_owned(),
                        font_key: font_key.map(str::to_owned),
                        size_pt: item.size_pt,
                        color: item.color.clone(),
                    })
                })
            }
            ItemContent::Checkbox | ItemContent::Image { .. } => None,
        };

        let mut actions = vec![Action::ItemCreated(item)];
        actions.extend(follow_up);
        actions.push(Action::RenderNeeded);
        actions
    }

    fn select(&mut self, id: Option<ItemId>) -> Vec<Action> {
        if self.ui.selected_id == id {
            return Vec::new();
        }
        self.ui.selected_id = id;
        vec![Action::SelectionChanged(id)]
    }

    fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        let before = self.ui.mode.tool();
        self.ui.mode = mode;
        let after = self.ui.mode.tool();
        if before == after {
            return Vec::new();
        }
        debug!(?before, ?after, "mode changed");
        vec![Action::ModeChanged(after)]
    }

    fn set_guides(&mut self, guides: Option<Guides>) -> Vec<Action> {
        if self.ui.guides == guides {
            return Vec::new();
        }
        self.ui.guides = guides;
        vec![Action::GuidesChanged(guides)]
    }

    fn reset_transient(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        self.set_guides(None)
    }

    fn start_release_cooldown(&mut self, at_ms: u64) {
        self.ui.quiet_until_ms = self.ui.quiet_until_ms.max(at_ms.saturating_add(self.config.release_cooldown_ms));
    }
}
