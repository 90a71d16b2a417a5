//! Export — flattens overlay items into a copy of the master PDF.
//!
//! DESIGN
//! ======
//! `flatten` is a pure function of the master bytes and the item list, plus
//! the font side channel. The master is parsed fresh on every call and never
//! written, so repeated or concurrent exports are independent. Each page's
//! original content is wrapped in `q`/`Q` and the overlays are appended as a
//! separate stream, so nothing the page leaves in the graphics state can
//! leak into the overlays.
//!
//! FAILURE ISOLATION
//! =================
//! Only an unreadable master or a failed serialization aborts an export.
//! Anything that goes wrong with a single item (bad data URL, undecodable
//! image, missing font) is logged and that item alone is skipped or drawn
//! with a fallback font.

mod embed;
mod page;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lopdf::content::Operation;
use lopdf::{Document, Object, StringFormat};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::color::Rgb;
use crate::doc::{ItemContent, OverlayItem};
use crate::error::ErrorCode;
use crate::consts::FALLBACK_SIZE_PT;
use crate::fonts::FontSource;
use crate::raster::{RasterError, decode_data_url};
use embed::{CHECK_GLYPH, FontRegistry, embed_image, win_ansi};
use page::{PageCanvas, page_box};

// =============================================================================
// ERRORS
// =============================================================================

/// Errors that abort a whole export. The overlay store is never touched, so
/// every variant is safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("master PDF unreadable: {0}")]
    MasterUnreadable(String),

    #[error("PDF serialization failed: {0}")]
    Serialize(String),
}

impl ErrorCode for ExportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MasterUnreadable(_) => "E_EXPORT_MASTER",
            Self::Serialize(_) => "E_EXPORT_SERIALIZE",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// Failure confined to a single item.
#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error(transparent)]
    Payload(#[from] RasterError),

    #[error("image decode failed: {0}")]
    Image(String),

    #[error("stream encode failed: {0}")]
    Encode(String),

    #[error("font unusable: {0}")]
    Font(String),
}

// =============================================================================
// FLATTEN
// =============================================================================

fn load(master: &[u8]) -> Result<Document, ExportError> {
    Document::load_mem(master).map_err(|e| ExportError::MasterUnreadable(e.to_string()))
}

/// Draw `items` onto a copy of `master` and return the new PDF bytes.
///
/// Items are drawn in list order. Items addressing pages the document does
/// not have are skipped.
///
/// # Errors
///
/// [`ExportError::MasterUnreadable`] if `master` does not parse as a PDF,
/// [`ExportError::Serialize`] if the result cannot be written.
pub async fn flatten(master: &[u8], items: &[OverlayItem], fonts: &dyn FontSource) -> Result<Vec<u8>, ExportError> {
    let mut doc = load(master)?;
    let pages = doc.get_pages();
    info!(items = items.len(), pages = pages.len(), "export started");

    let mut by_page: BTreeMap<u32, Vec<&OverlayItem>> = BTreeMap::new();
    for item in items {
        if pages.contains_key(&item.page) {
            by_page.entry(item.page).or_default().push(item);
        } else {
            warn!(id = %item.id, page = item.page, pages = pages.len(), "overlay item on missing page skipped");
        }
    }

    let mut registry = FontRegistry::new(fonts);
    let mut skipped = 0_usize;
    for (page_no, page_items) in &by_page {
        let Some(&page_id) = pages.get(page_no) else {
            continue;
        };
        let mut canvas = PageCanvas::open(&doc, page_id);
        for item in page_items {
            if let Err(e) = draw_item(&mut doc, &mut canvas, item, &mut registry).await {
                skipped += 1;
                warn!(id = %item.id, page = page_no, kind = ?item.kind(), error = %e, "overlay item skipped");
            }
        }
        canvas.commit(&mut doc)?;
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| ExportError::Serialize(e.to_string()))?;
    info!(bytes = out.len(), skipped, "export finished");
    Ok(out)
}

/// Item geometry in page points.
#[derive(Debug, Clone, Copy)]
struct Frame {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    rotate: f64,
}

impl Frame {
    fn of(item: &OverlayItem, canvas: &PageCanvas) -> Self {
        let (x, y) = canvas.bounds.point(item.x, item.y);
        Self {
            x,
            y,
            w: item.w * canvas.bounds.width,
            h: item.h * canvas.bounds.height,
            rotate: item.rotate,
        }
    }

    /// Rotation about the box center. Positive degrees turn clockwise as on
    /// screen, which is a negative angle in PDF's y-up space.
    fn rotation(&self) -> Option<Operation> {
        if self.rotate.abs() < 1e-9 {
            return None;
        }
        let theta = (-self.rotate).to_radians();
        let (sin, cos) = theta.sin_cos();
        let cx = self.x + self.w / 2.0;
        let cy = self.y + self.h / 2.0;
        Some(cm([cos, sin, -sin, cos, cx - cos * cx + sin * cy, cy - sin * cx - cos * cy]))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn real(v: f64) -> Object {
    Object::Real(v as _)
}

fn cm(m: [f64; 6]) -> Operation {
    Operation::new("cm", m.iter().map(|&v| real(v)).collect())
}

fn image_ops(frame: &Frame, name: Vec<u8>) -> Vec<Operation> {
    let mut ops = vec![Operation::new("q", vec![])];
    ops.extend(frame.rotation());
    ops.push(cm([frame.w, 0.0, 0.0, frame.h, frame.x, frame.y]));
    ops.push(Operation::new("Do", vec![Object::Name(name)]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

fn text_ops(frame: &Frame, font: Vec<u8>, size_pt: f64, color: Rgb, text: Object) -> Vec<Operation> {
    let (r, g, b) = color.unit();
    let mut ops = vec![Operation::new("q", vec![])];
    ops.extend(frame.rotation());
    ops.extend([
        Operation::new("rg", vec![real(r), real(g), real(b)]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font), real(size_pt)]),
        Operation::new("Td", vec![real(frame.x), real(frame.y)]),
        Operation::new("Tj", vec![text]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);
    ops
}

async fn draw_item(
    doc: &mut Document,
    canvas: &mut PageCanvas,
    item: &OverlayItem,
    fonts: &mut FontRegistry<'_>,
) -> Result<(), ItemError> {
    let frame = Frame::of(item, canvas);

    if let Some(url) = item.content.raster() {
        let bytes = decode_data_url(url)?;
        let image = embed_image(doc, &bytes)?;
        let name = canvas.image_name(image);
        canvas.push(image_ops(&frame, name));
        return Ok(());
    }

    let size_pt = if item.size_pt.is_finite() && item.size_pt > 0.0 { item.size_pt } else { FALLBACK_SIZE_PT };
    let color = Rgb::from_hex_or_black(&item.color);

    if matches!(item.content, ItemContent::Checkbox) {
        let font = fonts.dingbats(doc);
        let name = canvas.font_name(font);
        let glyph = Object::String(vec![CHECK_GLYPH], StringFormat::Hexadecimal);
        canvas.push(text_ops(&frame, name, size_pt, color, glyph));
        return Ok(());
    }

    let Some((text, font_key)) = item.content.literal() else {
        return Ok(());
    };
    if text.trim().is_empty() {
        debug!(id = %item.id, "empty text item not drawn");
        return Ok(());
    }
    let font = fonts.text_font(doc, font_key).await;
    let name = canvas.font_name(font);
    canvas.push(text_ops(&frame, name, size_pt, color, win_ansi(text)));
    Ok(())
}

// =============================================================================
// PAGE SIZES
// =============================================================================

/// Size of one page in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Page sizes of `master`, in page order.
///
/// # Errors
///
/// [`ExportError::MasterUnreadable`] if `master` does not parse as a PDF.
pub fn page_sizes(master: &[u8]) -> Result<Vec<PageSize>, ExportError> {
    let doc = load(master)?;
    Ok(doc
        .get_pages()
        .values()
        .map(|&id| {
            let b = page_box(&doc, id);
            PageSize { width: b.width, height: b.height }
        })
        .collect())
}

// =============================================================================
// GATE / JOB
// =============================================================================

/// Allows one export in flight at a time.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    busy: Arc<AtomicBool>,
}

impl ExportGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. Returns `None` while another export holds it.
    #[must_use]
    pub fn try_begin(&self) -> Option<ExportGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| ExportGuard { busy: Arc::clone(&self.busy) })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped.
#[derive(Debug)]
pub struct ExportGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// An export captured by value: later store edits do not affect it.
pub struct ExportJob {
    master: Arc<[u8]>,
    items: Vec<OverlayItem>,
    fonts: Arc<dyn FontSource>,
    _guard: ExportGuard,
}

impl ExportJob {
    #[must_use]
    pub fn new(master: Arc<[u8]>, items: Vec<OverlayItem>, fonts: Arc<dyn FontSource>, guard: ExportGuard) -> Self {
        Self { master, items, fonts, _guard: guard }
    }

    #[must_use]
    pub fn items(&self) -> &[OverlayItem] {
        &self.items
    }

    /// Run the export; the gate is released when this returns.
    ///
    /// # Errors
    ///
    /// See [`flatten`].
    pub async fn run(self) -> Result<Vec<u8>, ExportError> {
        flatten(&self.master, &self.items, self.fonts.as_ref()).await
    }
}
