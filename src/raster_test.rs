#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const FONT: &[u8] = include_bytes!("../tests/fixtures/DejaVuSans.ttf");

fn rasterizer() -> Rasterizer {
    Rasterizer::new(FONT.to_vec()).unwrap()
}

fn decode(png: &[u8]) -> RgbaImage {
    image::load_from_memory(png).unwrap().to_rgba8()
}

// =============================================================
// render
// =============================================================

#[test]
fn renders_visible_png_with_ink_color() {
    let img = rasterizer().render("Alice", None, 28.0, "#ff0000").unwrap();
    assert!(img.width > 0 && img.height > 0);
    let decoded = decode(&img.png);
    assert_eq!((decoded.width(), decoded.height()), (img.width, img.height));
    let solid = decoded.pixels().find(|p| p.0[3] == 255).unwrap();
    assert_eq!(&solid.0[..3], &[255, 0, 0]);
}

#[test]
fn output_is_trimmed_to_visible_alpha() {
    let decoded = decode(&rasterizer().render("Alice", None, 28.0, "#111827").unwrap().png);
    let (w, h) = (decoded.width(), decoded.height());
    let visible = |x: u32, y: u32| decoded.get_pixel(x, y).0[3] > ALPHA_TRIM_THRESHOLD;
    assert!((0..h).any(|y| visible(0, y)), "left column empty");
    assert!((0..h).any(|y| visible(w - 1, y)), "right column empty");
    assert!((0..w).any(|x| visible(x, 0)), "top row empty");
    assert!((0..w).any(|x| visible(x, h - 1)), "bottom row empty");
}

#[test]
fn natural_size_is_half_the_oversampled_size() {
    let img = rasterizer().render("AB", None, 12.0, "#000000").unwrap();
    assert_eq!(img.natural_width, f64::from(img.width) / 2.0);
    assert_eq!(img.natural_height, f64::from(img.height) / 2.0);
}

#[test]
fn larger_size_gives_larger_image() {
    let r = rasterizer();
    let small = r.render("Sign", None, 12.0, "#000000").unwrap();
    let large = r.render("Sign", None, 28.0, "#000000").unwrap();
    assert!(large.width > small.width);
    assert!(large.height > small.height);
}

#[test]
fn rendering_is_deterministic() {
    let r = rasterizer();
    let a = r.render("Jane Q. Public", None, 28.0, "#1d4ed8").unwrap();
    let b = r.render("Jane Q. Public", None, 28.0, "#1d4ed8").unwrap();
    assert_eq!(a, b);
}

#[test]
fn explicit_font_is_used() {
    let r = rasterizer();
    let font = parse_font(FONT).unwrap();
    let with_font = r.render("Hi", Some(&font), 20.0, "#000000").unwrap();
    let default = r.render("Hi", None, 20.0, "#000000").unwrap();
    assert_eq!(with_font.png, default.png);
}

#[test]
fn blank_text_is_rejected() {
    let r = rasterizer();
    assert!(matches!(r.render("", None, 28.0, "#000000"), Err(RasterError::Empty)));
    assert!(matches!(r.render("   ", None, 28.0, "#000000"), Err(RasterError::Empty)));
}

#[test]
fn non_positive_size_is_rejected() {
    let r = rasterizer();
    assert!(matches!(r.render("A", None, 0.0, "#000000"), Err(RasterError::Empty)));
    assert!(matches!(r.render("A", None, f64::NAN, "#000000"), Err(RasterError::Empty)));
}

#[test]
fn bad_color_falls_back_to_black() {
    let img = rasterizer().render("X", None, 20.0, "not-a-color").unwrap();
    let decoded = decode(&img.png);
    let solid = decoded.pixels().find(|p| p.0[3] == 255).unwrap();
    assert_eq!(&solid.0[..3], &[0, 0, 0]);
}

#[test]
fn garbage_font_bytes_are_rejected() {
    assert!(matches!(Rasterizer::new(vec![0, 1, 2, 3]), Err(RasterError::FontUnreadable)));
    assert!(parse_font(b"nope").is_err());
}

// =============================================================
// trim_transparent
// =============================================================

#[test]
fn trim_transparent_crops_border() {
    let mut img = RgbaImage::new(20, 10);
    img.put_pixel(5, 3, Rgba([0, 0, 0, 255]));
    img.put_pixel(8, 6, Rgba([0, 0, 0, 200]));
    // At the threshold: treated as transparent.
    img.put_pixel(19, 9, Rgba([0, 0, 0, ALPHA_TRIM_THRESHOLD]));
    let png = encode_png(&img).unwrap();

    let trimmed = decode(&trim_transparent(&png).unwrap());
    assert_eq!((trimmed.width(), trimmed.height()), (4, 4));
    assert_eq!(trimmed.get_pixel(0, 0).0[3], 255);
}

#[test]
fn trim_transparent_rejects_blank_and_garbage() {
    let png = encode_png(&RgbaImage::new(4, 4)).unwrap();
    assert!(matches!(trim_transparent(&png), Err(RasterError::Empty)));
    assert!(matches!(trim_transparent(b"not a png"), Err(RasterError::Decode(_))));
}

// =============================================================
// data URLs
// =============================================================

#[test]
fn data_url_round_trip() {
    let img = rasterizer().render("Q", None, 12.0, "#000000").unwrap();
    let url = img.data_url();
    assert!(url.starts_with("data:image/png;base64,"));
    assert_eq!(decode_data_url(&url).unwrap(), img.png);
}

#[test]
fn percent_encoded_data_url() {
    assert_eq!(decode_data_url("data:text/plain,a%20b%2Cc").unwrap(), b"a b,c".to_vec());
}

#[test]
fn base64_payload_may_contain_whitespace() {
    assert_eq!(decode_data_url("data:image/png;base64,QU\nJD").unwrap(), b"ABC".to_vec());
}

#[test]
fn malformed_data_urls() {
    assert!(matches!(decode_data_url("https://x/y.png"), Err(RasterError::DataUrl(_))));
    assert!(matches!(decode_data_url("data:image/png;base64"), Err(RasterError::DataUrl(_))));
    assert!(matches!(decode_data_url("data:image/png;base64,@@@"), Err(RasterError::DataUrl(_))));
}

#[test]
fn error_codes() {
    assert_eq!(RasterError::Empty.error_code(), "E_RASTER_EMPTY");
    assert_eq!(RasterError::DataUrl(String::new()).error_code(), "E_DATA_URL");
    assert!(!RasterError::Empty.retryable());
}
