//! Rasterization of typed marks into tightly cropped transparent PNGs.
//!
//! Output is deterministic for identical inputs: glyph coverage is computed
//! by `rusttype` without hinting, and the PNG encoder is run with fixed
//! settings, so the same text/font/size/color always yields the same bytes.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use rusttype::{Font, Scale, point};

use crate::color::Rgb;
use crate::consts::{ALPHA_TRIM_THRESHOLD, PX_PER_PT, RASTER_SCALE};
use crate::error::ErrorCode;

/// Errors produced while rasterizing or decoding raster payloads.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// Nothing visible to draw.
    #[error("nothing to rasterize")]
    Empty,

    #[error("font data is not a usable TrueType/OpenType font")]
    FontUnreadable,

    #[error("png encode failed: {0}")]
    Encode(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("malformed data url: {0}")]
    DataUrl(String),
}

impl ErrorCode for RasterError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "E_RASTER_EMPTY",
            Self::FontUnreadable => "E_RASTER_FONT",
            Self::Encode(_) => "E_RASTER_ENCODE",
            Self::Decode(_) => "E_RASTER_DECODE",
            Self::DataUrl(_) => "E_DATA_URL",
        }
    }
}

/// A rendered mark.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub png: Vec<u8>,
    /// Pixel width of the PNG (oversampled).
    pub width: u32,
    pub height: u32,
    /// Display width in CSS pixels.
    pub natural_width: f64,
    pub natural_height: f64,
}

impl RasterImage {
    #[must_use]
    pub fn data_url(&self) -> String {
        png_data_url(&self.png)
    }
}

/// Parse font bytes.
///
/// # Errors
///
/// Returns [`RasterError::FontUnreadable`] when the bytes are not a font.
pub fn parse_font(bytes: &[u8]) -> Result<Font<'_>, RasterError> {
    Font::try_from_bytes(bytes).ok_or(RasterError::FontUnreadable)
}

/// Scale at which one em spans `em_px` pixels.
///
/// `rusttype` scales relative to the ascent-descent height, not the em box.
pub(crate) fn em_scale(font: &Font<'_>, em_px: f32) -> Scale {
    let v = font.v_metrics_unscaled();
    let height = v.ascent - v.descent;
    let units = f32::from(font.units_per_em());
    if height <= 0.0 || units <= 0.0 {
        return Scale::uniform(em_px);
    }
    Scale::uniform(em_px * height / units)
}

/// Renders typed marks with a default font or a caller-supplied one.
pub struct Rasterizer {
    default_font: Font<'static>,
}

impl Rasterizer {
    /// # Errors
    ///
    /// Returns [`RasterError::FontUnreadable`] when `default_font` is not a font.
    pub fn new(default_font: Vec<u8>) -> Result<Self, RasterError> {
        let default_font = Font::try_from_vec(default_font).ok_or(RasterError::FontUnreadable)?;
        Ok(Self { default_font })
    }

    /// Render `text` at `size_pt` in `color`, using `font` when given.
    ///
    /// The canvas is sized to the measured glyph bounds at twice the CSS pixel
    /// size, then trimmed to the visible alpha.
    ///
    /// # Errors
    ///
    /// [`RasterError::Empty`] for blank text or text without visible glyphs,
    /// [`RasterError::Encode`] if PNG encoding fails.
    pub fn render(&self, text: &str, font: Option<&Font<'_>>, size_pt: f64, color: &str) -> Result<RasterImage, RasterError> {
        if text.trim().is_empty() || size_pt.is_nan() || size_pt <= 0.0 {
            return Err(RasterError::Empty);
        }
        let font = font.unwrap_or(&self.default_font);
        #[allow(clippy::cast_possible_truncation)]
        let em_px = (size_pt * PX_PER_PT * RASTER_SCALE) as f32;
        let scale = em_scale(font, em_px);
        let ascent = font.v_metrics(scale).ascent;
        let glyphs: Vec<_> = font.layout(text, scale, point(0.0, ascent)).collect();

        let bounds = glyphs.iter().filter_map(rusttype::PositionedGlyph::pixel_bounding_box).reduce(|a, b| {
            rusttype::Rect {
                min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
                max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
            }
        });
        let Some(bounds) = bounds else {
            return Err(RasterError::Empty);
        };
        let width = u32::try_from(bounds.width()).map_err(|_| RasterError::Empty)?;
        let height = u32::try_from(bounds.height()).map_err(|_| RasterError::Empty)?;
        if width == 0 || height == 0 {
            return Err(RasterError::Empty);
        }

        let ink = Rgb::from_hex_or_black(color);
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([ink.r, ink.g, ink.b, 0]));
        for glyph in &glyphs {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            let off_x = i64::from(bb.min.x - bounds.min.x);
            let off_y = i64::from(bb.min.y - bounds.min.y);
            glyph.draw(|gx, gy, coverage| {
                let x = off_x + i64::from(gx);
                let y = off_y + i64::from(gy);
                let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                    return;
                };
                if x >= width || y >= height {
                    return;
                }
                let alpha = coverage_alpha(coverage);
                let px = canvas.get_pixel_mut(x, y);
                px.0[3] = px.0[3].max(alpha);
            });
        }

        let trimmed = crop_to_alpha(&canvas).ok_or(RasterError::Empty)?;
        let png = encode_png(&trimmed)?;
        Ok(RasterImage {
            width: trimmed.width(),
            height: trimmed.height(),
            natural_width: f64::from(trimmed.width()) / RASTER_SCALE,
            natural_height: f64::from(trimmed.height()) / RASTER_SCALE,
            png,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn coverage_alpha(coverage: f32) -> u8 {
    (coverage.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Crop to the bounding box of pixels whose alpha exceeds the trim threshold.
/// Returns `None` when nothing is visible.
fn crop_to_alpha(img: &RgbaImage) -> Option<RgbaImage> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut any = false;
    for (x, y, px) in img.enumerate_pixels() {
        if px.0[3] > ALPHA_TRIM_THRESHOLD {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if !any {
        return None;
    }
    Some(image::imageops::crop_imm(img, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image())
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, RasterError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Trim the transparent border off a drawn or uploaded PNG.
///
/// # Errors
///
/// [`RasterError::Decode`] if the bytes are not an image,
/// [`RasterError::Empty`] if nothing is visible.
pub fn trim_transparent(png: &[u8]) -> Result<Vec<u8>, RasterError> {
    let img = image::load_from_memory(png).map_err(|e| RasterError::Decode(e.to_string()))?.to_rgba8();
    let trimmed = crop_to_alpha(&img).ok_or(RasterError::Empty)?;
    encode_png(&trimmed)
}

/// Wrap PNG bytes as a `data:image/png;base64,` URL.
#[must_use]
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Decode the payload of a `data:` URL, base64 or percent-encoded.
///
/// # Errors
///
/// [`RasterError::DataUrl`] when the URL is not a `data:` URL or the payload
/// does not decode.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, RasterError> {
    let rest = url.trim().strip_prefix("data:").ok_or_else(|| RasterError::DataUrl("missing data: scheme".into()))?;
    let (meta, payload) = rest.split_once(',').ok_or_else(|| RasterError::DataUrl("missing payload separator".into()))?;
    if meta.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact.as_bytes()).map_err(|e| RasterError::DataUrl(e.to_string()))
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}
