use super::*;

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(255, 0), 0);
    assert_eq!(mul_div255_u16(128, 255), 128);
}

#[test]
fn opacity_to_u8_clamps() {
    assert_eq!(opacity_to_u8(-1.0), 0);
    assert_eq!(opacity_to_u8(2.0), 255);
    assert_eq!(opacity_to_u8(0.5), 128);
    assert_eq!(opacity_to_u8(f32::NAN), 0);
}

#[test]
fn add_sat_saturates() {
    assert_eq!(add_sat_u8(200, 100), 255);
    assert_eq!(add_sat_u8(1, 2), 3);
}
