//! Overlay model: placed items, their type-specific content, and the store.
//!
//! `OverlayItem` is the record a host persists or transmits; geometry is kept
//! in normalized page space (see [`crate::transform`]) and the content is a
//! tagged variant per item type so every consumer has to handle each type
//! explicitly. `PartialOverlayItem` carries sparse edits, and `OverlayStore`
//! owns the ordered list (order is z-order on screen only).

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{CHIP_HEIGHT, CHIP_WIDTH, FALLBACK_SIZE_PT};
use crate::error::ErrorCode;
use crate::transform::NormBox;

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("overlay list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for DocError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Json(_) => "E_DOC_JSON",
        }
    }
}

/// Unique identifier for an overlay item.
pub type ItemId = Uuid;

/// The kind of an overlay item, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Signature,
    Initials,
    Date,
    Checkbox,
    Image,
}

/// Content of a signature, initials, or date mark.
///
/// Marks are either a raster (typed-then-rasterized, drawn, or uploaded) or a
/// literal string drawn with a font at export time. A record that carries
/// both reads as a raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Mark {
    Raster {
        #[serde(alias = "imageDataUrl")]
        data_url: String,
    },
    Literal {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_key: Option<String>,
    },
}

/// Type-specific content of an overlay item. Serialized under a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ItemContent {
    /// Editable text chip.
    Text {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_key: Option<String>,
    },
    Signature(Mark),
    Initials(Mark),
    Date(Mark),
    /// Check mark glyph.
    Checkbox,
    /// Uploaded picture.
    Image {
        #[serde(alias = "imageDataUrl")]
        data_url: String,
    },
}

impl ItemContent {
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Text { .. } => ItemKind::Text,
            Self::Signature(_) => ItemKind::Signature,
            Self::Initials(_) => ItemKind::Initials,
            Self::Date(_) => ItemKind::Date,
            Self::Checkbox => ItemKind::Checkbox,
            Self::Image { .. } => ItemKind::Image,
        }
    }

    /// The embedded raster payload, if this content is drawn as an image.
    #[must_use]
    pub fn raster(&self) -> Option<&str> {
        match self {
            Self::Image { data_url }
            | Self::Signature(Mark::Raster { data_url })
            | Self::Initials(Mark::Raster { data_url })
            | Self::Date(Mark::Raster { data_url }) => Some(data_url),
            _ => None,
        }
    }

    /// Literal text and optional font key, if this content is drawn as text.
    #[must_use]
    pub fn literal(&self) -> Option<(&str, Option<&str>)> {
        match self {
            Self::Text { text, font_key }
            | Self::Signature(Mark::Literal { text, font_key })
            | Self::Initials(Mark::Literal { text, font_key })
            | Self::Date(Mark::Literal { text, font_key }) => Some((text, font_key.as_deref())),
            _ => None,
        }
    }
}

/// A placed mark on one page of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayItem {
    pub id: ItemId,
    /// 1-based page number.
    pub page: u32,
    /// Left edge, as a fraction of page width.
    pub x: f64,
    /// Bottom edge, as a fraction of page height (y grows upward).
    pub y: f64,
    /// Inline text chips may omit the box; it then defaults to the chip box.
    #[serde(default = "default_w")]
    pub w: f64,
    #[serde(default = "default_h")]
    pub h: f64,
    /// Clockwise degrees about the box center.
    #[serde(default)]
    pub rotate: f64,
    /// Ink color as `#rrggbb`.
    pub color: String,
    /// Editing-time highlight. Never exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    /// Font size in points for text-rendered content.
    #[serde(alias = "size", default = "default_size_pt")]
    pub size_pt: f64,
    #[serde(flatten)]
    pub content: ItemContent,
}

fn default_w() -> f64 {
    CHIP_WIDTH
}

fn default_h() -> f64 {
    CHIP_HEIGHT
}

fn default_size_pt() -> f64 {
    FALLBACK_SIZE_PT
}

impl OverlayItem {
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.content.kind()
    }

    #[must_use]
    pub fn bounds(&self) -> NormBox {
        NormBox { x: self.x, y: self.y, w: self.w, h: self.h }
    }
}

/// Sparse update for an overlay item. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialOverlayItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(alias = "size", skip_serializing_if = "Option::is_none")]
    pub size_pt: Option<f64>,
    /// New text. Only applies to text chips.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// New raster payload. Turns a literal mark into a raster mark; ignored by
    /// text chips and checkboxes.
    #[serde(alias = "imageDataUrl", skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

impl PartialOverlayItem {
    /// Position-only update.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }

    /// Position and size update.
    #[must_use]
    pub fn bounds(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x: Some(x), y: Some(y), w: Some(w), h: Some(h), ..Default::default() }
    }
}

/// Ordered collection of overlay items. Later items draw above earlier ones.
#[derive(Debug, Clone, Default)]
pub struct OverlayStore {
    items: Vec<OverlayItem>,
}

impl OverlayStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, assigning a fresh id when it has none (nil uuid).
    /// Returns the id the item was stored under.
    pub fn add(&mut self, mut item: OverlayItem) -> ItemId {
        if item.id.is_nil() {
            item.id = Uuid::new_v4();
        }
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Merge `partial` into the item with `id`. Returns false for a stale id.
    pub fn update(&mut self, id: &ItemId, partial: &PartialOverlayItem) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == *id) else {
            return false;
        };
        if let Some(x) = partial.x {
            item.x = x;
        }
        if let Some(y) = partial.y {
            item.y = y;
        }
        if let Some(w) = partial.w {
            item.w = w;
        }
        if let Some(h) = partial.h {
            item.h = h;
        }
        if let Some(rotate) = partial.rotate {
            item.rotate = rotate;
        }
        if let Some(color) = &partial.color {
            item.color.clone_from(color);
        }
        if let Some(bg) = &partial.bg_color {
            item.bg_color = Some(bg.clone());
        }
        if let Some(size_pt) = partial.size_pt {
            item.size_pt = size_pt;
        }
        if let (Some(new_text), ItemContent::Text { text, .. }) = (&partial.text, &mut item.content) {
            text.clone_from(new_text);
        }
        if let Some(url) = &partial.data_url {
            match &mut item.content {
                ItemContent::Signature(mark) | ItemContent::Initials(mark) | ItemContent::Date(mark) => {
                    *mark = Mark::Raster { data_url: url.clone() };
                }
                ItemContent::Image { data_url } => data_url.clone_from(url),
                ItemContent::Text { .. } | ItemContent::Checkbox => {}
            }
        }
        true
    }

    /// Remove an item, returning it if it was present.
    pub fn remove(&mut self, id: &ItemId) -> Option<OverlayItem> {
        let idx = self.items.iter().position(|i| i.id == *id)?;
        Some(self.items.remove(idx))
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Clone the item onto every other page of a `page_count`-page document,
    /// each clone with a new id. Returns the clones that were added.
    pub fn duplicate_to_all_pages(&mut self, id: &ItemId, page_count: u32) -> Vec<OverlayItem> {
        if page_count == 0 {
            return Vec::new();
        }
        let Some(source) = self.get(id).cloned() else {
            return Vec::new();
        };
        let clones: Vec<OverlayItem> = (1..=page_count)
            .filter(|&page| page != source.page)
            .map(|page| OverlayItem { id: Uuid::new_v4(), page, ..source.clone() })
            .collect();
        self.items.extend(clones.iter().cloned());
        clones
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&OverlayItem> {
        self.items.iter().find(|i| i.id == *id)
    }

    /// Items on `page`, bottom-most first.
    pub fn on_page(&self, page: u32) -> impl DoubleEndedIterator<Item = &OverlayItem> {
        self.items.iter().filter(move |i| i.page == page)
    }

    /// All items in z-order.
    #[must_use]
    pub fn items(&self) -> &[OverlayItem] {
        &self.items
    }

    /// Owned copy of the item list, detached from later edits.
    #[must_use]
    pub fn snapshot(&self) -> Vec<OverlayItem> {
        self.items.clone()
    }

    /// Replace the whole list, e.g. when restoring a persisted session.
    pub fn load_snapshot(&mut self, items: Vec<OverlayItem>) {
        self.items = items;
    }

    /// The item list as a JSON array of camelCase records.
    ///
    /// # Errors
    ///
    /// [`DocError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DocError> {
        Ok(serde_json::to_string(&self.items)?)
    }

    /// Parse a JSON array written by [`Self::to_json`]. The store is left
    /// untouched on error.
    ///
    /// # Errors
    ///
    /// [`DocError::Json`] if `json` is not a valid overlay list.
    pub fn load_json(&mut self, json: &str) -> Result<(), DocError> {
        self.items = serde_json::from_str(json)?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
