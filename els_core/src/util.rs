//! Common timer/rate helpers for els_core.

use crate::quadrature::STOPPED;

/// Number of nanoseconds in one second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Spindle RPM for a tick interval of `rate` spindle-timer counts.
/// `None` for the stopped sentinel.
#[inline]
pub fn rpm_from_rate(rate: u16, spindle_timer_hz: u32, spindle_cpr: u16) -> Option<u32> {
    if rate == STOPPED || rate == 0 {
        return None;
    }
    let counts_per_rev = u64::from(rate) * u64::from(spindle_cpr.max(1));
    u32::try_from(u64::from(spindle_timer_hz) * 60 / counts_per_rev).ok()
}

/// Timer counts between spindle ticks at `rpm`.
/// - Clamps `rpm` to at least 1 to avoid division by zero.
#[inline]
pub fn tick_interval_counts(rpm: u16, timer_hz: u32, spindle_cpr: u16) -> u32 {
    let ticks_per_min = u64::from(rpm.max(1)) * u64::from(spindle_cpr.max(1));
    u32::try_from(u64::from(timer_hz) * 60 / ticks_per_min).unwrap_or(u32::MAX)
}

/// Convert timer counts to nanoseconds.
#[inline]
pub fn counts_to_ns(counts: u64, timer_hz: u32) -> u64 {
    counts.saturating_mul(NANOS_PER_SEC) / u64::from(timer_hz.max(1))
}

/// Free-running 32-bit timer value at `ns` of virtual time.
#[inline]
pub fn ns_to_counts(ns: u64, timer_hz: u32) -> u32 {
    ((u128::from(ns) * u128::from(timer_hz)) / u128::from(NANOS_PER_SEC)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_round_trip_through_rate() {
        // 60 rpm at 800 cpr is 20_000 counts of a 16 MHz timer per tick
        assert_eq!(tick_interval_counts(60, 16_000_000, 800), 20_000);
        assert_eq!(rpm_from_rate(20_000, 16_000_000, 800), Some(60));
        assert_eq!(rpm_from_rate(STOPPED, 16_000_000, 800), None);
    }

    #[test]
    fn stopped_threshold_is_twenty_rpm() {
        assert_eq!(rpm_from_rate(60_000, 16_000_000, 800), Some(20));
    }

    #[test]
    fn count_conversions() {
        assert_eq!(counts_to_ns(60, 2_000_000), 30_000);
        assert_eq!(ns_to_counts(1_000_000_000, 16_000_000), 16_000_000);
    }
}
