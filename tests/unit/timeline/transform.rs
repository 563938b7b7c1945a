use super::*;
use crate::foundation::core::Point;

fn video(width: u32, height: u32, rotation_deg: u16) -> VideoStreamInfo {
    VideoStreamInfo {
        width,
        height,
        rotation_deg,
    }
}

const LANDSCAPE: Canvas = Canvas {
    width: 1920,
    height: 1080,
};
const PORTRAIT: Canvas = Canvas {
    width: 1080,
    height: 1920,
};

#[test]
fn matching_aspect_fills_canvas() {
    let t = ClipTransform::aspect_fit(video(1280, 720, 0), LANDSCAPE);
    assert_eq!(t.scale, 1.5);
    assert_eq!(t.translate, Vec2::ZERO);
    assert_eq!(
        t.placement(),
        PixelPlacement {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080
        }
    );
}

#[test]
fn portrait_clip_is_pillarboxed_on_landscape_canvas() {
    let t = ClipTransform::aspect_fit(video(1080, 1920, 0), LANDSCAPE);
    assert_eq!(t.scale, 0.5625);
    let scaled = t.scaled_size();
    assert_eq!(scaled.height, 1080.0);
    assert_eq!(scaled.width, 607.5);
    assert_eq!(t.translate, Vec2::new((1920.0 - 607.5) / 2.0, 0.0));
}

#[test]
fn landscape_clip_is_letterboxed_on_portrait_canvas() {
    let t = ClipTransform::aspect_fit(video(1920, 1080, 0), PORTRAIT);
    assert_eq!(t.scale, 0.5625);
    assert_eq!(t.translate.x, 0.0);
    assert_eq!(t.translate.y, (1920.0 - 607.5) / 2.0);
}

#[test]
fn quarter_turn_swaps_display_dimensions() {
    let t = ClipTransform::aspect_fit(video(1920, 1080, 270), LANDSCAPE);
    assert_eq!(t.display_size, Size::new(1080.0, 1920.0));
    assert_eq!(t.scale, 0.5625);
    assert_eq!(t.translate, Vec2::new(656.25, 0.0));

    let t90 = ClipTransform::aspect_fit(video(1920, 1080, 90), PORTRAIT);
    assert_eq!(t90.scale, 1.0);
    assert_eq!(t90.translate, Vec2::ZERO);
}

#[test]
fn degenerate_sizes_fall_back_to_identity() {
    let t = ClipTransform::aspect_fit(video(0, 1080, 0), LANDSCAPE);
    assert_eq!(t, ClipTransform::identity(video(0, 1080, 0)));
    assert_eq!(t.scale, 1.0);
    assert_eq!(t.translate, Vec2::ZERO);
}

#[test]
fn full_affine_maps_encoded_corners_inside_canvas() {
    for rot in [0u16, 90, 180, 270] {
        let t = ClipTransform::aspect_fit(video(1920, 1080, rot), PORTRAIT);
        let a = t.to_affine();
        for corner in [
            Point::new(0.0, 0.0),
            Point::new(1920.0, 0.0),
            Point::new(0.0, 1080.0),
            Point::new(1920.0, 1080.0),
        ] {
            let p = a * corner;
            assert!(p.x >= -1e-9 && p.x <= 1080.0 + 1e-9, "rot {rot}: {p:?}");
            assert!(p.y >= -1e-9 && p.y <= 1920.0 + 1e-9, "rot {rot}: {p:?}");
        }
    }
}

#[test]
fn rotation_affine_makes_quarter_turn_upright() {
    let t = ClipTransform::aspect_fit(video(200, 100, 90), LANDSCAPE);
    let r = t.rotation_affine();
    let p = r * Point::new(200.0, 100.0);
    assert!((p.x - 0.0).abs() < 1e-9);
    assert!((p.y - 200.0).abs() < 1e-9);
}
