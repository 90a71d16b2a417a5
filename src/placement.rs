//! Placement mode: which tool is armed and what the next click creates.
//!
//! The editor is either in `Select` (clicks pick and drag existing items) or
//! in `Place(payload)` (clicks instantiate a new item from the payload). The
//! payload survives each placement so the same mark can be stamped repeatedly
//! until the user cancels or switches tools.

#[cfg(test)]
#[path = "placement_test.rs"]
mod placement_test;

use uuid::Uuid;

use crate::consts::{
    CHECKBOX_SIZE_PT, CHIP_HEIGHT, CHIP_WIDTH, DATE_SIZE_PT, DEFAULT_HIGHLIGHT, DEFAULT_INK, MARK_HEIGHT, MARK_WIDTH,
    MAX_INITIALS_CHARS, TEXT_SIZE_PT, TYPED_MARK_SIZE_PT,
};
use crate::doc::{ItemContent, ItemKind, Mark, OverlayItem};
use crate::transform::{Inset, NormBox, NormPoint};

/// Toolbar buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Signature,
    Initials,
    Text,
    Date,
    Checkbox,
}

/// Which mark the signature modal is capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Signature,
    Initials,
}

/// What the signature modal hands back on save.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureCapture {
    /// Typed name drawn with a handwriting font, rasterized after placement.
    Typed { value: String, font_key: Option<String>, color: String },
    /// Freehand drawing exported from the pad as a PNG data URL.
    Drawn { data_url: String },
    /// User-supplied picture.
    Upload { data_url: String },
    /// Typed name the modal already rasterized itself.
    TypedImage { data_url: String, color: String },
}

/// Content source of a pending signature or initials mark.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkSource {
    Image { data_url: String },
    Typed { value: String, font_key: Option<String> },
}

/// Everything needed to create one item on click.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacePayload {
    Text { color: String, size_pt: f64 },
    Date { value: String, color: String, size_pt: f64 },
    Checkbox { color: String, size_pt: f64 },
    Signature { source: MarkSource, color: String, size_pt: f64 },
    Initials { source: MarkSource, color: String, size_pt: f64 },
}

impl PlacePayload {
    /// Default payload for a tool that places without a capture step.
    /// Returns `None` for signature and initials.
    #[must_use]
    pub fn defaults(tool: Tool, today: &str) -> Option<Self> {
        match tool {
            Tool::Text => Some(Self::Text { color: DEFAULT_INK.into(), size_pt: TEXT_SIZE_PT }),
            Tool::Date => Some(Self::Date { value: today.into(), color: DEFAULT_INK.into(), size_pt: DATE_SIZE_PT }),
            Tool::Checkbox => Some(Self::Checkbox { color: DEFAULT_INK.into(), size_pt: CHECKBOX_SIZE_PT }),
            Tool::Signature | Tool::Initials => None,
        }
    }

    /// Build the payload for a saved modal capture.
    ///
    /// Typed values are trimmed; initials are cut to four characters. Blank
    /// typed input yields `None` so no empty mark can be placed.
    #[must_use]
    pub fn from_capture(kind: MarkKind, capture: SignatureCapture) -> Option<Self> {
        let (source, color) = match capture {
            SignatureCapture::Typed { value, font_key, color } => {
                let trimmed = value.trim();
                let value: String = match kind {
                    MarkKind::Initials => trimmed.chars().take(MAX_INITIALS_CHARS).collect(),
                    MarkKind::Signature => trimmed.to_owned(),
                };
                if value.is_empty() {
                    return None;
                }
                (MarkSource::Typed { value, font_key }, color)
            }
            SignatureCapture::Drawn { data_url } | SignatureCapture::Upload { data_url } => {
                if data_url.is_empty() {
                    return None;
                }
                (MarkSource::Image { data_url }, DEFAULT_INK.to_owned())
            }
            SignatureCapture::TypedImage { data_url, color } => {
                if data_url.is_empty() {
                    return None;
                }
                (MarkSource::Image { data_url }, color)
            }
        };
        let size_pt = TYPED_MARK_SIZE_PT;
        Some(match kind {
            MarkKind::Signature => Self::Signature { source, color, size_pt },
            MarkKind::Initials => Self::Initials { source, color, size_pt },
        })
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        match self {
            Self::Text { .. } => Tool::Text,
            Self::Date { .. } => Tool::Date,
            Self::Checkbox { .. } => Tool::Checkbox,
            Self::Signature { .. } => Tool::Signature,
            Self::Initials { .. } => Tool::Initials,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Text { .. } => ItemKind::Text,
            Self::Date { .. } => ItemKind::Date,
            Self::Checkbox { .. } => ItemKind::Checkbox,
            Self::Signature { .. } => ItemKind::Signature,
            Self::Initials { .. } => ItemKind::Initials,
        }
    }

    /// Normalized box a freshly placed item of this payload occupies.
    #[must_use]
    pub fn default_box(&self) -> (f64, f64) {
        match self {
            Self::Text { .. } | Self::Checkbox { .. } => (CHIP_WIDTH, CHIP_HEIGHT),
            Self::Date { .. } | Self::Signature { .. } | Self::Initials { .. } => (MARK_WIDTH, MARK_HEIGHT),
        }
    }

    /// Create the item for a click at `at` on `page`.
    ///
    /// The click marks the box's bottom-left corner. The box is clamped so it
    /// sits wholly inside the inset margin.
    #[must_use]
    pub fn instantiate(&self, page: u32, at: NormPoint, inset: Inset) -> OverlayItem {
        let (w, h) = self.default_box();
        let NormBox { x, y, .. } = NormBox { x: at.x, y: at.y, w, h }.clamped(inset);
        let (color, size_pt, content) = match self {
            Self::Text { color, size_pt } => (color, *size_pt, ItemContent::Text { text: String::new(), font_key: None }),
            Self::Date { value, color, size_pt } => (color, *size_pt, ItemContent::Date(literal(value, None))),
            Self::Checkbox { color, size_pt } => (color, *size_pt, ItemContent::Checkbox),
            Self::Signature { source, color, size_pt } => (color, *size_pt, ItemContent::Signature(source.to_mark())),
            Self::Initials { source, color, size_pt } => (color, *size_pt, ItemContent::Initials(source.to_mark())),
        };
        OverlayItem {
            id: Uuid::new_v4(),
            page,
            x,
            y,
            w,
            h,
            rotate: 0.0,
            color: color.clone(),
            bg_color: Some(DEFAULT_HIGHLIGHT.to_owned()),
            size_pt,
            content,
        }
    }
}

impl MarkSource {
    fn to_mark(&self) -> Mark {
        match self {
            Self::Image { data_url } => Mark::Raster { data_url: data_url.clone() },
            Self::Typed { value, font_key } => literal(value, font_key.as_deref()),
        }
    }
}

fn literal(text: &str, font_key: Option<&str>) -> Mark {
    Mark::Literal { text: text.to_owned(), font_key: font_key.map(str::to_owned) }
}

/// Editor interaction mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Select,
    Place(PlacePayload),
}

impl Mode {
    /// The tool being placed, if any.
    #[must_use]
    pub fn tool(&self) -> Option<Tool> {
        match self {
            Self::Select => None,
            Self::Place(payload) => Some(payload.tool()),
        }
    }

    #[must_use]
    pub fn is_placing(&self) -> bool {
        matches!(self, Self::Place(_))
    }
}

/// Result of pressing a tool button.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Switch to this mode.
    Mode(Mode),
    /// Drop back to `Select` and open the capture modal for this mark.
    Capture(MarkKind),
}

/// Transition for a tool button press while in `current`.
///
/// Pressing the tool that is already being placed toggles back to `Select`.
#[must_use]
pub fn press_tool(current: &Mode, tool: Tool, today: &str) -> ToolOutcome {
    if current.tool() == Some(tool) {
        return ToolOutcome::Mode(Mode::Select);
    }
    match tool {
        Tool::Signature => ToolOutcome::Capture(MarkKind::Signature),
        Tool::Initials => ToolOutcome::Capture(MarkKind::Initials),
        Tool::Text | Tool::Date | Tool::Checkbox => match PlacePayload::defaults(tool, today) {
            Some(payload) => ToolOutcome::Mode(Mode::Place(payload)),
            None => ToolOutcome::Mode(Mode::Select),
        },
    }
}

/// Today's date as `M/D/YYYY`, the label the date tool stamps.
#[must_use]
pub fn today_label() -> String {
    let today = time::OffsetDateTime::now_utc().date();
    format!("{}/{}/{}", u8::from(today.month()), today.day(), today.year())
}
