//! Editor session: the engine plus the document and the async services it
//! needs (fonts, rasterization, export).
//!
//! DESIGN
//! ======
//! `EngineCore` stays synchronous and I/O free. `Editor` sits beside it and
//! resolves the actions that need I/O: typed marks are rasterized (fetching
//! their font, falling back to the bundled default), and exports are handed
//! out as self-contained [`ExportJob`]s behind a single in-flight gate.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::engine::{Action, EngineCore, RasterJob};
use crate::export::{ExportError, ExportGate, ExportJob, PageSize, page_sizes};
use crate::fonts::FontSource;
use crate::placement::{MarkKind, SignatureCapture};
use crate::raster::{RasterError, Rasterizer, decode_data_url, parse_font, png_data_url, trim_transparent};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RasterKey {
    text: String,
    font_key: Option<String>,
    size_bits: u64,
    color: String,
}

impl RasterKey {
    fn of(job: &RasterJob) -> Self {
        Self {
            text: job.text.clone(),
            font_key: job.font_key.clone(),
            size_bits: job.size_pt.to_bits(),
            color: job.color.clone(),
        }
    }
}

/// One open document.
pub struct Editor {
    pub engine: EngineCore,
    master: Arc<[u8]>,
    pages: Vec<PageSize>,
    fonts: Arc<dyn FontSource>,
    rasterizer: Rasterizer,
    raster_cache: HashMap<RasterKey, String>,
    gate: ExportGate,
}

impl Editor {
    /// Open `master` for editing.
    ///
    /// # Errors
    ///
    /// [`ExportError::MasterUnreadable`] if the bytes are not a PDF.
    pub fn open(
        master: impl Into<Arc<[u8]>>,
        config: EditorConfig,
        fonts: Arc<dyn FontSource>,
        rasterizer: Rasterizer,
    ) -> Result<Self, ExportError> {
        let master = master.into();
        let pages = page_sizes(&master)?;
        let mut engine = EngineCore::new(config);
        engine.set_page_count(u32::try_from(pages.len()).unwrap_or(u32::MAX));
        Ok(Self {
            engine,
            master,
            pages,
            fonts,
            rasterizer,
            raster_cache: HashMap::new(),
            gate: ExportGate::new(),
        })
    }

    /// Page sizes of the master, in points.
    #[must_use]
    pub fn pages(&self) -> &[PageSize] {
        &self.pages
    }

    /// Forward a saved capture to the engine, trimming drawn and uploaded
    /// images to their visible pixels first.
    pub fn modal_saved(&mut self, kind: MarkKind, capture: SignatureCapture) -> Vec<Action> {
        let capture = match capture {
            SignatureCapture::Drawn { data_url } => SignatureCapture::Drawn { data_url: trimmed(data_url) },
            SignatureCapture::Upload { data_url } => SignatureCapture::Upload { data_url: trimmed(data_url) },
            other => other,
        };
        self.engine.modal_saved(kind, capture)
    }

    /// Resolve the I/O-bound actions in `actions`.
    ///
    /// Each `RasterizeRequested` is replaced by the resulting `ItemUpdated`.
    /// A mark that fails to rasterize keeps its literal text, which export
    /// can still draw with a font. Other actions pass through unchanged.
    pub async fn resolve(&mut self, actions: Vec<Action>) -> Vec<Action> {
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            let Action::RasterizeRequested(job) = action else {
                out.push(action);
                continue;
            };
            match self.rasterize(&job).await {
                Ok(data_url) => out.extend(self.engine.commit_raster(&job.item_id, data_url)),
                Err(e) => warn!(id = %job.item_id, error = %e, "rasterization rejected, keeping literal"),
            }
        }
        out
    }

    /// Render a typed mark to a PNG data URL.
    ///
    /// # Errors
    ///
    /// Returns a [`RasterError`] if nothing visible can be drawn.
    pub async fn rasterize(&mut self, job: &RasterJob) -> Result<String, RasterError> {
        let key = RasterKey::of(job);
        if let Some(hit) = self.raster_cache.get(&key) {
            return Ok(hit.clone());
        }

        let font_bytes = match &job.font_key {
            Some(font_key) => match self.fonts.fetch(font_key).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(font_key = %font_key, error = %e, "font fetch dropped, using default");
                    None
                }
            },
            None => None,
        };
        let font = match font_bytes.as_deref().map(parse_font) {
            Some(Ok(font)) => Some(font),
            Some(Err(e)) => {
                warn!(font_key = ?job.font_key, error = %e, "font unreadable, using default");
                None
            }
            None => None,
        };

        let image = self.rasterizer.render(&job.text, font.as_ref(), job.size_pt, &job.color)?;
        let data_url = image.data_url();
        debug!(id = %job.item_id, width = image.width, height = image.height, "mark rasterized");
        self.raster_cache.insert(key, data_url.clone());
        Ok(data_url)
    }

    /// Snapshot the master and the current items into an export job.
    /// Returns `None` while another export is in flight.
    #[must_use]
    pub fn begin_export(&self) -> Option<ExportJob> {
        let guard = self.gate.try_begin()?;
        Some(ExportJob::new(Arc::clone(&self.master), self.engine.doc.snapshot(), Arc::clone(&self.fonts), guard))
    }

    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.gate.is_busy()
    }
}

/// Trim a PNG data URL, keeping the original when it cannot be processed.
fn trimmed(data_url: String) -> String {
    match decode_data_url(&data_url).and_then(|bytes| trim_transparent(&bytes)) {
        Ok(png) => png_data_url(&png),
        Err(e) => {
            warn!(error = %e, "capture not trimmed");
            data_url
        }
    }
}
