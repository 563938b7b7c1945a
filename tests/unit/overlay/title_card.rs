use super::*;

const SMALL: Canvas = Canvas {
    width: 64,
    height: 36,
};

#[test]
fn background_fills_whole_card() {
    let card = TitleCardRenderer::without_fonts()
        .render("Trip", "", Rgba8::rgb(200, 10, 20), SMALL)
        .unwrap();
    assert_eq!((card.width, card.height), (64, 36));
    let px = card.premul_rgba8();
    assert_eq!(px.len(), 64 * 36 * 4);
    assert_eq!(&px[..4], &[200, 10, 20, 255]);
    let last = px.len() - 4;
    assert_eq!(&px[last..], &[200, 10, 20, 255]);
}

#[test]
fn svg_centers_title_and_shifts_for_subtitle() {
    let canvas = Canvas {
        width: 1920,
        height: 1080,
    };
    let only = title_card_svg("Summer", "", Rgba8::BLACK, canvas);
    assert!(only.contains(r#"y="540.0""#));
    assert!(only.contains(r#"font-size="86.4""#));
    assert!(!only.contains(r#"font-size="43.2""#));

    let both = title_card_svg("Summer", "2026", Rgba8::BLACK, canvas);
    assert!(both.contains(r#"y="480.0""#));
    assert!(both.contains(r#"font-size="43.2""#));
    assert!(both.contains(r#"fill-opacity="0.8""#));
    // 480 + 43.2 + 20 + 21.6
    assert!(both.contains(r#"y="564.8""#));
}

#[test]
fn whitespace_subtitle_still_shifts_the_title() {
    let canvas = Canvas {
        width: 1920,
        height: 1080,
    };
    let svg = title_card_svg("Summer", " ", Rgba8::BLACK, canvas);
    assert!(svg.contains(r#"y="480.0""#));
    assert!(svg.contains(r#"font-size="43.2""#));
}

#[test]
fn svg_escapes_markup_in_text() {
    let svg = title_card_svg("Tom & <Jerry>", "", Rgba8::BLACK, SMALL);
    assert!(svg.contains("Tom &amp; &lt;Jerry&gt;"));
}

#[test]
fn long_titles_are_condensed_to_margins() {
    let canvas = Canvas {
        width: 1080,
        height: 1920,
    };
    let svg = title_card_svg(&"W".repeat(80), "", Rgba8::BLACK, canvas);
    assert!(svg.contains(r#"textLength="1000.0""#));
    let short = title_card_svg("Hi", "", Rgba8::BLACK, canvas);
    assert!(!short.contains("textLength"));
}

#[test]
fn zero_canvas_is_an_image_error() {
    let flat = Canvas {
        width: 0,
        height: 10,
    };
    let err = TitleCardRenderer::without_fonts()
        .render("x", "", Rgba8::BLACK, flat)
        .unwrap_err();
    assert!(matches!(err, CompileError::ImageLoadFailed(_)));
}

#[test]
fn png_export_round_trips_straight_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("title.png");
    let half_red = Rgba8 {
        r: 255,
        g: 0,
        b: 0,
        a: 128,
    };
    let card = TitleCardRenderer::without_fonts()
        .render("x", "", half_red, SMALL)
        .unwrap();
    card.write_png(&path).unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (64, 36));
    let p = img.get_pixel(0, 0).0;
    assert_eq!(p[3], 128);
    assert!(p[0] >= 253, "{p:?}");
}

#[test]
fn demultiply_restores_straight_channels() {
    assert_eq!(demultiply(&[64, 0, 0, 128]), vec![128, 0, 0, 128]);
    assert_eq!(demultiply(&[0, 0, 0, 0]), vec![0, 0, 0, 0]);
}
