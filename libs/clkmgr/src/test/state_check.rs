use super::topology::*;

#[test]
#[should_panic(expected = "clock spi mirror disagrees with hardware")]
fn clock_running_behind_the_mirror_is_fatal() {
    let b = board();
    assert!(!b.cm.is_on(SPI));
    b.port.poke(TOP_STA, b.port.peek(TOP_STA) & !(1 << 1));
    let _ = b.cm.enable(SPI, "test");
}

#[test]
#[should_panic(expected = "clock spi mirror disagrees with hardware")]
fn clock_gated_behind_the_mirror_is_fatal() {
    let b = board();
    b.cm.enable(SPI, "test").unwrap();
    b.port.poke(TOP_STA, b.port.peek(TOP_STA) | (1 << 1));
    let _ = b.cm.disable(SPI, "test");
}

#[test]
#[should_panic(expected = "domain DISP mirror disagrees with hardware")]
fn domain_lost_behind_the_mirror_is_fatal() {
    let b = board();
    assert!(b.cm.domain_is_on(DISP));
    b.port.poke(PS, b.port.peek(PS) & !(1 << 3));
    b.port.poke(PS_2ND, b.port.peek(PS_2ND) & !(1 << 3));
    let _ = b.cm.domain_disable_forced(DISP);
}

#[test]
#[should_panic(expected = "domain IMG mirror disagrees with hardware")]
fn domain_powered_behind_the_mirror_is_fatal() {
    let b = board();
    assert!(!b.cm.domain_is_on(IMG));
    b.port.poke(PS, b.port.peek(PS) | (1 << 5));
    b.port.poke(PS_2ND, b.port.peek(PS_2ND) | (1 << 5));
    let _ = b.cm.domain_enable(IMG);
}

#[test]
fn forced_teardown_does_not_trip_the_clock_check() {
    let b = board();
    b.cm.enable(DISP_OVL, "test").unwrap();
    b.cm.domain_disable_forced(DISP).unwrap();
    assert!(!b.cm.domain_is_on(DISP));
    assert!(b.cm.is_on(DISP_OVL));

    // the mirror still has the gate on while the island reads unpowered
    b.cm.disable(DISP_OVL, "test").unwrap();
    assert!(!b.cm.is_on(DISP_OVL));
    assert!(!b.cm.domain_is_on(DISP));

    b.cm.enable(DISP_COMMON, "test").unwrap();
    assert!(b.cm.domain_is_on(DISP));
    b.check_invariants();
}
