#![allow(clippy::float_cmp)]

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Stream, dictionary};
use uuid::Uuid;

use super::*;
use crate::doc::Mark;
use crate::fonts::StaticFontSource;
use crate::raster::png_data_url;

const FONT: &[u8] = include_bytes!("../../tests/fixtures/DejaVuSans.ttf");

/// Build a PDF with `pages` blank pages. The `MediaBox` and an existing
/// `Resources` font live on the `Pages` node so pages inherit them.
fn blank_master(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let base_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content = doc.add_object(Stream::new(dictionary! {}, b"1 0 0 RG 0 0 m 100 100 l S".to_vec()));
            let page = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content,
            });
            Object::Reference(page)
        })
        .collect();
    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => base_font } },
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn tiny_png() -> String {
    let mut img = RgbaImage::from_pixel(4, 2, Rgba([17, 24, 39, 255]));
    img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    let mut buf = Cursor::new(Vec::new());
    PngEncoder::new(&mut buf).write_image(img.as_raw(), 4, 2, image::ColorType::Rgba8).unwrap();
    png_data_url(buf.get_ref())
}

fn item(page: u32, content: ItemContent) -> OverlayItem {
    OverlayItem {
        id: Uuid::new_v4(),
        page,
        x: 0.1,
        y: 0.1,
        w: 0.125,
        h: 0.04,
        rotate: 0.0,
        color: "#111827".into(),
        bg_color: Some("rgba(22,163,74,0.15)".into()),
        size_pt: 18.0,
        content,
    }
}

fn text(page: u32, s: &str) -> OverlayItem {
    item(page, ItemContent::Text { text: s.into(), font_key: None })
}

fn raster(page: u32, data_url: &str) -> OverlayItem {
    item(page, ItemContent::Signature(Mark::Raster { data_url: data_url.into() }))
}

/// Parsed output: the document plus one page's decoded operations and resources.
fn inspect(pdf: &[u8], page: u32) -> (Document, Vec<Operation>, Dictionary) {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&page];
    let content = doc.get_page_content(page_id).unwrap();
    let ops = Content::decode(&content).unwrap().operations;
    // Resolve `Resources` through the `Parent` chain: untouched pages inherit it.
    let mut node = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = loop {
        if let Ok(res) = node.get(b"Resources") {
            break res.as_dict().unwrap().clone();
        }
        let parent = node.get(b"Parent").unwrap().as_reference().unwrap();
        node = doc.get_object(parent).unwrap().as_dict().unwrap();
    };
    (doc, ops, resources)
}

fn count(ops: &[Operation], operator: &str) -> usize {
    ops.iter().filter(|op| op.operator == operator).count()
}

fn no_fonts() -> StaticFontSource {
    StaticFontSource::new()
}

// =============================================================
// flatten
// =============================================================

#[tokio::test]
async fn export_is_idempotent() {
    let master = blank_master(1);
    let items = vec![text(1, "Alice")];
    let first = flatten(&master, &items, &no_fonts()).await.unwrap();
    let second = flatten(&master, &items, &no_fonts()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn text_item_drawn_at_scaled_position() {
    let master = blank_master(1);
    let out = flatten(&master, &[text(1, "Alice")], &no_fonts()).await.unwrap();
    let (doc, ops, resources) = inspect(&out, 1);

    let tj = ops.iter().find(|op| op.operator == "Tj").unwrap();
    assert_eq!(tj.operands[0].as_str().unwrap(), b"Alice");
    let td = ops.iter().find(|op| op.operator == "Td").unwrap();
    assert!((td.operands[0].as_float().unwrap() - 61.2).abs() < 0.01);
    assert!((td.operands[1].as_float().unwrap() - 79.2).abs() < 0.01);
    let tf = ops.iter().find(|op| op.operator == "Tf").unwrap();
    assert_eq!(tf.operands[1].as_float().unwrap(), 18.0);

    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    assert!(fonts.has(b"F1"), "inherited font kept");
    let helv_id = fonts.get(b"SgF1").unwrap().as_reference().unwrap();
    let helv = doc.get_object(helv_id).unwrap().as_dict().unwrap();
    assert_eq!(helv.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
}

#[tokio::test]
async fn page_content_is_bracketed() {
    let out = flatten(&blank_master(1), &[text(1, "x")], &no_fonts()).await.unwrap();
    let (_, ops, _) = inspect(&out, 1);
    let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
    assert_eq!(operators[0], "q");
    let stroke = operators.iter().position(|&o| o == "S").unwrap();
    assert_eq!(operators[stroke + 1], "Q");
    assert!(operators[stroke + 2..].contains(&"Tj"));
}

#[tokio::test]
async fn bad_middle_item_does_not_blank_the_rest() {
    let png = tiny_png();
    let items = vec![
        raster(1, &png),
        raster(1, "data:image/png;base64,bm90IGFuIGltYWdl"),
        raster(1, &png),
    ];
    let out = flatten(&blank_master(1), &items, &no_fonts()).await.unwrap();
    let (_, ops, resources) = inspect(&out, 1);
    assert_eq!(count(&ops, "Do"), 2);
    assert_eq!(resources.get(b"XObject").unwrap().as_dict().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_data_url_is_skipped() {
    let items = vec![raster(1, "data:image/png;base64,@@@"), text(1, "kept")];
    let out = flatten(&blank_master(1), &items, &no_fonts()).await.unwrap();
    let (_, ops, _) = inspect(&out, 1);
    assert_eq!(count(&ops, "Do"), 0);
    assert_eq!(count(&ops, "Tj"), 1);
}

#[tokio::test]
async fn translucent_png_gets_soft_mask() {
    let out = flatten(&blank_master(1), &[raster(1, &tiny_png())], &no_fonts()).await.unwrap();
    let (doc, _, resources) = inspect(&out, 1);
    let image_id = resources.get(b"XObject").unwrap().as_dict().unwrap().get(b"SgIm1").unwrap().as_reference().unwrap();
    let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
    assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
    assert!(image.dict.has(b"SMask"));
}

#[tokio::test]
async fn rotation_pivots_on_center() {
    let mut rotated = raster(1, &tiny_png());
    rotated.rotate = 90.0;
    let out = flatten(&blank_master(1), &[rotated], &no_fonts()).await.unwrap();
    let (_, ops, _) = inspect(&out, 1);
    let cms: Vec<_> = ops.iter().filter(|op| op.operator == "cm").collect();
    assert_eq!(cms.len(), 2);
    let m: Vec<f32> = cms[0].operands.iter().map(|o| o.as_float().unwrap()).collect();
    // Clockwise quarter turn in y-up space.
    assert!(m[0].abs() < 1e-5 && (m[1] + 1.0).abs() < 1e-5);
    let (cx, cy) = (0.1 * 612.0 + 0.0625 * 612.0, 0.1 * 792.0 + 0.02 * 792.0);
    // The pivot maps to itself.
    let px = f64::from(m[0]) * cx + f64::from(m[2]) * cy + f64::from(m[4]);
    let py = f64::from(m[1]) * cx + f64::from(m[3]) * cy + f64::from(m[5]);
    assert!((px - cx).abs() < 0.01 && (py - cy).abs() < 0.01);
}

#[tokio::test]
async fn checkbox_uses_dingbats_check() {
    let out = flatten(&blank_master(1), &[item(1, ItemContent::Checkbox)], &no_fonts()).await.unwrap();
    let (doc, ops, resources) = inspect(&out, 1);
    let tj = ops.iter().find(|op| op.operator == "Tj").unwrap();
    assert_eq!(tj.operands[0].as_str().unwrap(), b"3");
    let font_id = resources.get(b"Font").unwrap().as_dict().unwrap().get(b"SgF1").unwrap().as_reference().unwrap();
    let font = doc.get_object(font_id).unwrap().as_dict().unwrap();
    assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"ZapfDingbats");
}

#[tokio::test]
async fn literal_mark_embeds_fetched_font() {
    let fonts = StaticFontSource::new().with("kalam", FONT.to_vec());
    let mark = item(1, ItemContent::Initials(Mark::Literal { text: "AB".into(), font_key: Some("kalam".into()) }));
    let out = flatten(&blank_master(1), &[mark], &fonts).await.unwrap();
    let (doc, _, resources) = inspect(&out, 1);
    let font_id = resources.get(b"Font").unwrap().as_dict().unwrap().get(b"SgF1").unwrap().as_reference().unwrap();
    let font = doc.get_object(font_id).unwrap().as_dict().unwrap();
    assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"TrueType");
    assert_eq!(font.get(b"Widths").unwrap().as_array().unwrap().len(), 224);
}

#[tokio::test]
async fn unknown_font_falls_back_to_helvetica() {
    let mark = item(1, ItemContent::Date(Mark::Literal { text: "1/2/2025".into(), font_key: Some("nope".into()) }));
    let out = flatten(&blank_master(1), &[mark], &no_fonts()).await.unwrap();
    let (doc, ops, resources) = inspect(&out, 1);
    assert_eq!(count(&ops, "Tj"), 1);
    let font_id = resources.get(b"Font").unwrap().as_dict().unwrap().get(b"SgF1").unwrap().as_reference().unwrap();
    let font = doc.get_object(font_id).unwrap().as_dict().unwrap();
    assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
}

#[tokio::test]
async fn items_on_missing_pages_are_skipped() {
    let items = vec![text(5, "ghost"), text(2, "real")];
    let out = flatten(&blank_master(2), &items, &no_fonts()).await.unwrap();
    let (_, page1, _) = inspect(&out, 1);
    let (_, page2, _) = inspect(&out, 2);
    assert_eq!(count(&page1, "Tj"), 0);
    assert_eq!(count(&page2, "Tj"), 1);
}

#[tokio::test]
async fn empty_text_chip_draws_nothing() {
    let out = flatten(&blank_master(1), &[text(1, "  ")], &no_fonts()).await.unwrap();
    let (_, ops, _) = inspect(&out, 1);
    assert_eq!(count(&ops, "BT"), 0);
}

#[tokio::test]
async fn unreadable_master_is_fatal_and_retryable() {
    let err = flatten(b"%PDF-garbage", &[text(1, "x")], &no_fonts()).await.unwrap_err();
    assert!(matches!(err, ExportError::MasterUnreadable(_)));
    assert!(err.retryable());
    assert_eq!(err.error_code(), "E_EXPORT_MASTER");
}

#[test]
fn win_ansi_replaces_unmappable_chars() {
    assert_eq!(win_ansi("Café ✓"), Object::String(b"Caf\xe9 ?".to_vec(), StringFormat::Hexadecimal));
}

// =============================================================
// page_sizes
// =============================================================

#[test]
fn page_sizes_follow_inherited_media_box() {
    let sizes = page_sizes(&blank_master(2)).unwrap();
    assert_eq!(sizes, vec![PageSize { width: 612.0, height: 792.0 }; 2]);
    assert!(page_sizes(b"nope").is_err());
}

// =============================================================
// Gate / job
// =============================================================

#[test]
fn gate_allows_one_export_at_a_time() {
    let gate = ExportGate::new();
    let guard = gate.try_begin().unwrap();
    assert!(gate.is_busy());
    assert!(gate.try_begin().is_none());
    drop(guard);
    assert!(!gate.is_busy());
    assert!(gate.try_begin().is_some());
}

#[tokio::test]
async fn job_runs_against_its_snapshot_and_releases_gate() {
    let gate = ExportGate::new();
    let master: Arc<[u8]> = blank_master(1).into();
    let mut items = vec![text(1, "Alice")];
    let job = ExportJob::new(Arc::clone(&master), items.clone(), Arc::new(no_fonts()), gate.try_begin().unwrap());
    items.push(text(1, "Bob"));

    assert!(gate.is_busy());
    let out = job.run().await.unwrap();
    assert!(!gate.is_busy());
    let (_, ops, _) = inspect(&out, 1);
    assert_eq!(count(&ops, "Tj"), 1);
}
