//! Embedding of overlay payloads: raster images and fonts.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ColorType, ImageFormat};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use rusttype::Font;
use tracing::warn;

use super::ItemError;
use crate::fonts::FontSource;
use crate::raster::em_scale;

/// Text space units per em in PDF font metrics.
const GLYPH_UNITS: f32 = 1000.0;

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;

/// `ZapfDingbats` code for a check mark.
pub(super) const CHECK_GLYPH: u8 = b'3';

fn deflate(bytes: &[u8]) -> Result<Vec<u8>, ItemError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).map_err(|e| ItemError::Encode(e.to_string()))?;
    encoder.finish().map_err(|e| ItemError::Encode(e.to_string()))
}

fn int(v: u32) -> Object {
    Object::Integer(i64::from(v))
}

// =============================================================================
// IMAGES
// =============================================================================

/// Embed PNG bytes, or JPEG bytes when PNG decoding fails.
///
/// PNGs are re-encoded as Flate RGB with a `DeviceGray` soft mask when any
/// pixel is translucent. JPEGs are passed through as `DCTDecode`.
pub(super) fn embed_image(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, ItemError> {
    match image::load_from_memory_with_format(bytes, ImageFormat::Png) {
        Ok(img) => embed_rgba(doc, &img.to_rgba8()),
        Err(png_err) => {
            let jpeg = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
                .map_err(|e| ItemError::Image(format!("png: {png_err}; jpeg: {e}")))?;
            let color_space = if jpeg.color() == ColorType::L8 { "DeviceGray" } else { "DeviceRGB" };
            let (width, height) = jpeg.to_rgb8().dimensions();
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => int(width),
                    "Height" => int(height),
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                bytes.to_vec(),
            );
            Ok(doc.add_object(stream))
        }
    }
}

fn embed_rgba(doc: &mut Document, img: &image::RgbaImage) -> Result<ObjectId, ItemError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(ItemError::Image("empty image".into()));
    }
    let mut rgb = Vec::with_capacity(img.as_raw().len() / 4 * 3);
    let mut alpha = Vec::with_capacity(img.as_raw().len() / 4);
    for px in img.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }
    let rgb = deflate(&rgb)?;
    let smask = if alpha.iter().any(|&a| a < u8::MAX) { Some(deflate(&alpha)?) } else { None };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => int(w),
        "Height" => int(h),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(mask) = smask {
        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => int(w),
                "Height" => int(h),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            mask,
        ));
        dict.set("SMask", mask_id);
    }
    Ok(doc.add_object(Stream::new(dict, rgb)))
}

// =============================================================================
// TEXT ENCODING
// =============================================================================

/// Encode `text` for a simple font with `WinAnsiEncoding`.
///
/// Latin-1 characters map to themselves; anything else becomes `?`.
pub(super) fn win_ansi(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(b) if (0x20..0x7f).contains(&b) || b >= 0xa0 => b,
            _ => b'?',
        })
        .collect();
    Object::String(bytes, StringFormat::Hexadecimal)
}

// =============================================================================
// FONTS
// =============================================================================

/// Document-wide font objects, created on first use.
///
/// Remote fonts are fetched once per key; failed keys are remembered so the
/// fallback is chosen without refetching.
pub(super) struct FontRegistry<'s> {
    source: &'s dyn FontSource,
    helvetica: Option<ObjectId>,
    dingbats: Option<ObjectId>,
    embedded: HashMap<String, Option<ObjectId>>,
}

impl<'s> FontRegistry<'s> {
    pub fn new(source: &'s dyn FontSource) -> Self {
        Self { source, helvetica: None, dingbats: None, embedded: HashMap::new() }
    }

    pub fn helvetica(&mut self, doc: &mut Document) -> ObjectId {
        *self.helvetica.get_or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }

    pub fn dingbats(&mut self, doc: &mut Document) -> ObjectId {
        *self.dingbats.get_or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "ZapfDingbats",
            })
        })
    }

    /// Font for a text item: the named font if it can be fetched and
    /// embedded, Helvetica otherwise.
    pub async fn text_font(&mut self, doc: &mut Document, key: Option<&str>) -> ObjectId {
        let Some(key) = key else {
            return self.helvetica(doc);
        };
        if let Some(&cached) = self.embedded.get(key) {
            return match cached {
                Some(id) => id,
                None => self.helvetica(doc),
            };
        }
        let embedded = match self.source.fetch(key).await {
            Ok(bytes) => match embed_truetype(doc, key, &bytes) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(font_key = key, error = %e, "font embed failed, using Helvetica");
                    None
                }
            },
            Err(e) => {
                warn!(font_key = key, error = %e, "font fetch failed, using Helvetica");
                None
            }
        };
        self.embedded.insert(key.to_owned(), embedded);
        match embedded {
            Some(id) => id,
            None => self.helvetica(doc),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn units(v: f32) -> i64 {
    v.round() as i64
}

/// Embed TrueType bytes as a simple `WinAnsiEncoding` font with measured widths.
fn embed_truetype(doc: &mut Document, key: &str, bytes: &Arc<[u8]>) -> Result<ObjectId, ItemError> {
    let font = Font::try_from_bytes(bytes).ok_or_else(|| ItemError::Font(format!("{key}: not a TrueType font")))?;
    let scale = em_scale(&font, GLYPH_UNITS);
    let v = font.v_metrics(scale);

    let widths: Vec<Object> = (FIRST_CHAR..=LAST_CHAR)
        .map(|code| {
            let advance = font.glyph(char::from(code)).scaled(scale).h_metrics().advance_width;
            Object::Integer(units(advance))
        })
        .collect();

    let file = deflate(bytes)?;
    let file_id = doc.add_object(Stream::new(
        dictionary! {
            "Length1" => Object::Integer(i64::try_from(bytes.len()).unwrap_or(i64::MAX)),
            "Filter" => "FlateDecode",
        },
        file,
    ));

    let base_font = format!("Signet-{key}");
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(base_font.clone().into_bytes()),
        "Flags" => 32,
        "FontBBox" => vec![
            Object::Integer(0),
            Object::Integer(units(v.descent)),
            Object::Integer(units(GLYPH_UNITS)),
            Object::Integer(units(v.ascent)),
        ],
        "ItalicAngle" => 0,
        "Ascent" => Object::Integer(units(v.ascent)),
        "Descent" => Object::Integer(units(v.descent)),
        "CapHeight" => Object::Integer(units(v.ascent)),
        "StemV" => 80,
        "FontFile2" => file_id,
    });

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => Object::Name(base_font.into_bytes()),
        "FirstChar" => i64::from(FIRST_CHAR),
        "LastChar" => i64::from(LAST_CHAR),
        "Widths" => widths,
        "Encoding" => "WinAnsiEncoding",
        "FontDescriptor" => descriptor_id,
    }))
}
