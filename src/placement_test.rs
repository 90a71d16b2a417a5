#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const TODAY: &str = "3/14/2025";

fn inset() -> Inset {
    Inset { x: 0.01, y: 0.01 }
}

fn typed(value: &str) -> SignatureCapture {
    SignatureCapture::Typed { value: value.into(), font_key: Some("dancing".into()), color: "#1d4ed8".into() }
}

// =============================================================
// press_tool
// =============================================================

#[test]
fn text_tool_enters_place_with_defaults() {
    let outcome = press_tool(&Mode::Select, Tool::Text, TODAY);
    assert_eq!(
        outcome,
        ToolOutcome::Mode(Mode::Place(PlacePayload::Text { color: "#111827".into(), size_pt: 12.0 }))
    );
}

#[test]
fn date_tool_carries_today() {
    let ToolOutcome::Mode(Mode::Place(PlacePayload::Date { value, size_pt, .. })) =
        press_tool(&Mode::Select, Tool::Date, TODAY)
    else {
        panic!("expected date payload");
    };
    assert_eq!(value, TODAY);
    assert_eq!(size_pt, 12.0);
}

#[test]
fn checkbox_tool_uses_larger_glyph() {
    let ToolOutcome::Mode(Mode::Place(PlacePayload::Checkbox { size_pt, .. })) =
        press_tool(&Mode::Select, Tool::Checkbox, TODAY)
    else {
        panic!("expected checkbox payload");
    };
    assert_eq!(size_pt, 20.0);
}

#[test]
fn signature_and_initials_open_capture() {
    assert_eq!(press_tool(&Mode::Select, Tool::Signature, TODAY), ToolOutcome::Capture(MarkKind::Signature));
    assert_eq!(press_tool(&Mode::Select, Tool::Initials, TODAY), ToolOutcome::Capture(MarkKind::Initials));
}

#[test]
fn pressing_active_tool_toggles_to_select() {
    let placing = Mode::Place(PlacePayload::defaults(Tool::Checkbox, TODAY).unwrap());
    assert_eq!(press_tool(&placing, Tool::Checkbox, TODAY), ToolOutcome::Mode(Mode::Select));

    let signing = Mode::Place(PlacePayload::from_capture(MarkKind::Signature, typed("Alice")).unwrap());
    assert_eq!(press_tool(&signing, Tool::Signature, TODAY), ToolOutcome::Mode(Mode::Select));
}

#[test]
fn switching_tools_replaces_payload() {
    let placing = Mode::Place(PlacePayload::defaults(Tool::Text, TODAY).unwrap());
    let outcome = press_tool(&placing, Tool::Checkbox, TODAY);
    assert!(matches!(outcome, ToolOutcome::Mode(Mode::Place(PlacePayload::Checkbox { .. }))));
}

// =============================================================
// from_capture
// =============================================================

#[test]
fn empty_typed_signature_is_rejected() {
    assert!(PlacePayload::from_capture(MarkKind::Signature, typed("")).is_none());
    assert!(PlacePayload::from_capture(MarkKind::Signature, typed("   ")).is_none());
}

#[test]
fn initials_are_trimmed_and_cut_to_four() {
    let payload = PlacePayload::from_capture(MarkKind::Initials, typed("  ABCDEF ")).unwrap();
    let PlacePayload::Initials { source: MarkSource::Typed { value, font_key }, size_pt, .. } = payload else {
        panic!("expected typed initials");
    };
    assert_eq!(value, "ABCD");
    assert_eq!(font_key.as_deref(), Some("dancing"));
    assert_eq!(size_pt, 28.0);
}

#[test]
fn drawn_capture_uses_default_ink() {
    let payload =
        PlacePayload::from_capture(MarkKind::Signature, SignatureCapture::Drawn { data_url: "data:image/png;base64,AA".into() })
            .unwrap();
    let PlacePayload::Signature { source, color, .. } = payload else {
        panic!("expected signature");
    };
    assert_eq!(source, MarkSource::Image { data_url: "data:image/png;base64,AA".into() });
    assert_eq!(color, "#111827");
}

#[test]
fn typed_image_keeps_its_color() {
    let capture = SignatureCapture::TypedImage { data_url: "data:x".into(), color: "#ff0000".into() };
    let payload = PlacePayload::from_capture(MarkKind::Initials, capture).unwrap();
    assert!(matches!(payload, PlacePayload::Initials { ref color, .. } if color == "#ff0000"));
}

#[test]
fn empty_upload_is_rejected() {
    let capture = SignatureCapture::Upload { data_url: String::new() };
    assert!(PlacePayload::from_capture(MarkKind::Signature, capture).is_none());
}

// =============================================================
// instantiate
// =============================================================

#[test]
fn text_chip_starts_empty_with_chip_box() {
    let payload = PlacePayload::defaults(Tool::Text, TODAY).unwrap();
    let item = payload.instantiate(2, NormPoint::new(0.3, 0.5), inset());
    assert_eq!(item.page, 2);
    assert_eq!((item.w, item.h), (0.25, 0.08));
    assert!((item.x - 0.3).abs() < 1e-12);
    assert!((item.y - 0.5).abs() < 1e-12);
    assert_eq!(item.content, ItemContent::Text { text: String::new(), font_key: None });
    assert_eq!(item.bg_color.as_deref(), Some("rgba(22,163,74,0.15)"));
}

#[test]
fn date_places_literal_label() {
    let payload = PlacePayload::defaults(Tool::Date, TODAY).unwrap();
    let item = payload.instantiate(1, NormPoint::new(0.5, 0.5), inset());
    assert_eq!(item.kind(), ItemKind::Date);
    assert_eq!(item.content.literal(), Some((TODAY, None)));
}

#[test]
fn image_signature_places_raster_mark() {
    let payload = PlacePayload::from_capture(MarkKind::Signature, SignatureCapture::Drawn { data_url: "data:z".into() })
        .unwrap();
    let item = payload.instantiate(1, NormPoint::new(0.3, 0.3), inset());
    assert_eq!((item.w, item.h), (0.125, 0.04));
    assert_eq!(item.content.raster(), Some("data:z"));
}

#[test]
fn click_anchors_bottom_left_corner() {
    let payload = PlacePayload::from_capture(MarkKind::Signature, SignatureCapture::Drawn { data_url: "data:z".into() })
        .unwrap();
    let item = payload.instantiate(1, NormPoint::new(0.3, 0.3), inset());
    assert_eq!((item.x, item.y), (0.3, 0.3));
}

#[test]
fn checkbox_uses_chip_box() {
    let payload = PlacePayload::defaults(Tool::Checkbox, TODAY).unwrap();
    assert_eq!(payload.default_box(), (0.25, 0.08));
    let item = payload.instantiate(1, NormPoint::new(0.2, 0.2), inset());
    assert_eq!((item.w, item.h), (0.25, 0.08));
}

#[test]
fn click_near_top_edge_slides_box_down() {
    let payload = PlacePayload::defaults(Tool::Text, TODAY).unwrap();
    let item = payload.instantiate(1, NormPoint::new(0.3, 0.95), inset());
    assert!((item.y + item.h - 0.99).abs() < 1e-12);
}

#[test]
fn placement_near_edge_is_clamped_inside_inset() {
    let payload = PlacePayload::defaults(Tool::Text, TODAY).unwrap();
    let item = payload.instantiate(1, NormPoint::new(0.99, 0.02), inset());
    assert!(item.x >= 0.01);
    assert!(item.x + item.w <= 0.99 + 1e-12);
    assert!(item.y >= 0.01);
    assert!(item.y + item.h <= 0.99 + 1e-12);
}

#[test]
fn each_instantiation_gets_new_id() {
    let payload = PlacePayload::defaults(Tool::Checkbox, TODAY).unwrap();
    let a = payload.instantiate(1, NormPoint::new(0.5, 0.5), inset());
    let b = payload.instantiate(1, NormPoint::new(0.5, 0.5), inset());
    assert_ne!(a.id, b.id);
}

// =============================================================
// today_label
// =============================================================

#[test]
fn today_label_is_month_day_year() {
    let label = today_label();
    let parts: Vec<&str> = label.split('/').collect();
    assert_eq!(parts.len(), 3);
    let month: u8 = parts[0].parse().unwrap();
    let day: u8 = parts[1].parse().unwrap();
    assert!((1..=12).contains(&month));
    assert!((1..=31).contains(&day));
    assert_eq!(parts[2].len(), 4);
}
