//! Per-page access: geometry, inherited resources, and content bracketing.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::ExportError;

/// US Letter, used when neither the page nor its ancestors carry a `MediaBox`.
const FALLBACK_PAGE_PT: (f64, f64) = (612.0, 792.0);

/// Closes the `q` that opens the page's own content.
const RESTORE_PREFIX: &[u8] = b"\nQ\n";

/// Page geometry in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PageBox {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// Map a normalized point to page space. Both spaces share a
    /// bottom-left origin, so no flip is needed.
    pub fn point(&self, x: f64, y: f64) -> (f64, f64) {
        (self.left + x * self.width, self.bottom + y * self.height)
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(target) => Some(target),
            Err(_) => None,
        },
        other => Some(other),
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f64> {
    match resolve(doc, obj)? {
        Object::Integer(i) => {
            #[allow(clippy::cast_precision_loss)]
            let v = *i as f64;
            Some(v)
        }
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

fn page_dict(doc: &Document, id: ObjectId) -> Option<&Dictionary> {
    match doc.get_object(id) {
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    }
}

/// Look up `key` on the page, then up the `Parent` chain.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    // Bounded walk in case of a cyclic Parent chain.
    for _ in 0..64 {
        let dict = page_dict(doc, current?)?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => Some(*parent),
            _ => None,
        };
    }
    None
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<PageBox> {
    let arr = match inherited(doc, page_id, b"MediaBox")? {
        Object::Array(arr) if arr.len() == 4 => arr,
        _ => return None,
    };
    let llx = number(doc, &arr[0])?;
    let lly = number(doc, &arr[1])?;
    let urx = number(doc, &arr[2])?;
    let ury = number(doc, &arr[3])?;
    let (width, height) = ((urx - llx).abs(), (ury - lly).abs());
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(PageBox { left: llx.min(urx), bottom: lly.min(ury), width, height })
}

/// Page geometry, falling back to US Letter when the box is missing or degenerate.
pub(super) fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    media_box(doc, page_id).unwrap_or(PageBox {
        left: 0.0,
        bottom: 0.0,
        width: FALLBACK_PAGE_PT.0,
        height: FALLBACK_PAGE_PT.1,
    })
}

/// Owned copy of a dictionary-valued entry, resolving one reference.
fn owned_dict(doc: &Document, dict: &Dictionary, key: &[u8]) -> Dictionary {
    match dict.get(key).map(|obj| resolve(doc, obj)) {
        Ok(Some(Object::Dictionary(d))) => d.clone(),
        _ => Dictionary::new(),
    }
}

/// Existing content streams of the page, as a flat list of objects.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Some(dict) = page_dict(doc, page_id) else {
        return Vec::new();
    };
    let Ok(contents) = dict.get(b"Contents") else {
        return Vec::new();
    };
    match contents {
        Object::Array(arr) => arr.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            // Indirect array of streams.
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    }
}

/// Pick a resource name with `prefix` that `dict` does not use yet.
fn fresh_name(dict: &Dictionary, prefix: &str) -> Vec<u8> {
    let mut n = 1_u32;
    loop {
        let name = format!("{prefix}{n}").into_bytes();
        if !dict.has(&name) {
            return name;
        }
        n += 1;
    }
}

/// Accumulates overlay drawing for one page and writes it back on commit.
///
/// The page's resources are copied into the page dictionary so additions
/// never leak into siblings that inherit the same `Resources`.
pub(super) struct PageCanvas {
    pub id: ObjectId,
    pub bounds: PageBox,
    resources: Dictionary,
    fonts: Dictionary,
    xobjects: Dictionary,
    font_names: HashMap<ObjectId, Vec<u8>>,
    ops: Vec<Operation>,
}

impl PageCanvas {
    pub fn open(doc: &Document, id: ObjectId) -> Self {
        let resources = match inherited(doc, id, b"Resources") {
            Some(Object::Dictionary(d)) => d.clone(),
            _ => Dictionary::new(),
        };
        let fonts = owned_dict(doc, &resources, b"Font");
        let xobjects = owned_dict(doc, &resources, b"XObject");
        Self {
            id,
            bounds: page_box(doc, id),
            resources,
            fonts,
            xobjects,
            font_names: HashMap::new(),
            ops: Vec::new(),
        }
    }

    /// Resource name for `font`, registering it on first use.
    pub fn font_name(&mut self, font: ObjectId) -> Vec<u8> {
        if let Some(name) = self.font_names.get(&font) {
            return name.clone();
        }
        let name = fresh_name(&self.fonts, "SgF");
        self.fonts.set(name.clone(), Object::Reference(font));
        self.font_names.insert(font, name.clone());
        name
    }

    pub fn image_name(&mut self, image: ObjectId) -> Vec<u8> {
        let name = fresh_name(&self.xobjects, "SgIm");
        self.xobjects.set(name.clone(), Object::Reference(image));
        name
    }

    pub fn push(&mut self, ops: Vec<Operation>) {
        self.ops.extend(ops);
    }

    /// Bracket the page's original content with `q`/`Q`, append the overlay
    /// stream, and install the merged resources.
    pub fn commit(self, doc: &mut Document) -> Result<(), ExportError> {
        if self.ops.is_empty() {
            return Ok(());
        }
        let encoded = Content { operations: self.ops }
            .encode()
            .map_err(|e| ExportError::Serialize(e.to_string()))?;
        let mut overlay = RESTORE_PREFIX.to_vec();
        overlay.extend(encoded);

        let mut contents = existing_contents(doc, self.id);
        let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let overlay_id = doc.add_object(Stream::new(dictionary! {}, overlay));
        contents.insert(0, Object::Reference(open_id));
        contents.push(Object::Reference(overlay_id));

        let mut resources = self.resources;
        if !self.fonts.is_empty() {
            resources.set("Font", Object::Dictionary(self.fonts));
        }
        if !self.xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(self.xobjects));
        }

        let page = doc
            .get_object_mut(self.id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| ExportError::MasterUnreadable(format!("page dictionary: {e}")))?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }
}
