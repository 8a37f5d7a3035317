use std::time::{Duration, Instant};

use els_hardware::error::HwError;
use els_hardware::util::{check_pulse_timing, spin_for};
use rstest::rstest;

#[test]
fn spin_for_holds_at_least_the_requested_time() {
    let t0 = Instant::now();
    spin_for(Duration::from_micros(200));
    assert!(t0.elapsed() >= Duration::from_micros(200));
}

#[test]
fn spin_for_zero_returns_immediately() {
    let t0 = Instant::now();
    spin_for(Duration::ZERO);
    assert!(t0.elapsed() < Duration::from_millis(50));
}

#[rstest]
// stock: 6 counts of 500 ns inside 60 counts
#[case(3_000, 30_000, true)]
#[case(15_000, 30_000, true)]
#[case(15_001, 30_000, false)]
#[case(0, 30_000, false)]
fn pulse_must_leave_room_to_release(
    #[case] width_ns: u64,
    #[case] period_ns: u64,
    #[case] ok: bool,
) {
    let res = check_pulse_timing(
        Duration::from_nanos(width_ns),
        Duration::from_nanos(period_ns),
    );
    match (res, ok) {
        (Ok(()), true) => {}
        (Err(HwError::PulseTiming { width_ns: w, .. }), false) => assert_eq!(w, width_ns),
        (other, _) => panic!("width {width_ns} period {period_ns}: {other:?}"),
    }
}
