use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    px.repeat(w as usize * h as usize)
}

#[test]
fn over_opacity_0_is_noop() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over(dst, [200, 0, 0, 255], 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over(dst, [0, 0, 0, 0], 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    assert_eq!(over([10, 20, 30, 255], [1, 2, 3, 255], 1.0), [1, 2, 3, 255]);
}

#[test]
fn over_half_opacity_blends_evenly() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 255], 0.5);
    assert!(out[0] >= 127 && out[0] <= 128, "{out:?}");
    assert_eq!(out[3], 255);
}

#[test]
fn filled_frame_stores_premultiplied_color() {
    let half_red = Rgba8 {
        r: 255,
        g: 0,
        b: 0,
        a: 128,
    };
    let f = FrameRGBA::filled(2, 2, half_red);
    assert!(f.premultiplied);
    assert_eq!(f.pixel(1, 1), Some([128, 0, 0, 128]));
    assert_eq!(f.pixel(2, 0), None);
}

#[test]
fn blit_places_and_clips_source() {
    let mut f = FrameRGBA::filled(4, 3, Rgba8::BLACK);
    let src = solid(2, 2, [9, 9, 9, 255]);
    f.blit_opaque(
        &src,
        2,
        2,
        PixelPlacement {
            x: 3,
            y: -1,
            width: 2,
            height: 2,
        },
    )
    .unwrap();
    assert_eq!(f.pixel(3, 0), Some([9, 9, 9, 255]));
    assert_eq!(f.pixel(3, 1), Some([0, 0, 0, 255]));
    assert_eq!(f.pixel(2, 0), Some([0, 0, 0, 255]));
}

#[test]
fn blit_rejects_mis_sized_source() {
    let mut f = FrameRGBA::filled(4, 4, Rgba8::BLACK);
    let err = f.blit_opaque(
        &[0u8; 12],
        2,
        2,
        PixelPlacement {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        },
    );
    assert!(err.is_err());
}

#[test]
fn over_color_and_image_respect_opacity() {
    let mut f = FrameRGBA::filled(1, 1, Rgba8::WHITE);
    f.over_color(Rgba8::BLACK, 1.0);
    assert_eq!(f.pixel(0, 0), Some([0, 0, 0, 255]));

    let mut g = FrameRGBA::filled(1, 1, Rgba8::BLACK);
    g.over_image(&[255, 255, 255, 255], 0.0).unwrap();
    assert_eq!(g.pixel(0, 0), Some([0, 0, 0, 255]));
    assert!(g.over_image(&[0u8; 8], 1.0).is_err());
}
