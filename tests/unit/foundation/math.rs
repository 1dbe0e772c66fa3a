use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(100, 128), 50);
}

#[test]
fn round2_keeps_two_decimals() {
    assert_eq!(round2(2.0 + 11.0 * 0.1), 3.1);
    assert_eq!(round2(2.0 + 24.0 * 0.1), 4.4);
    assert_eq!(round2(1.005_1), 1.01);
    assert_eq!(round2(0.0), 0.0);
}
