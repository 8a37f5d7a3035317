use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Hold the calling thread for `d` without yielding. Step pulses are a few
/// microseconds wide, well below the scheduler's sleep granularity.
#[inline]
pub fn spin_for(d: Duration) {
    if d.is_zero() {
        return;
    }
    let deadline = Instant::now() + d;
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

/// Check that a pulse of `width` fits inside one minimum step period with
/// the line released for at least as long again.
pub fn check_pulse_timing(width: Duration, min_period: Duration) -> Result<()> {
    if width.is_zero() || width.saturating_mul(2) > min_period {
        return Err(HwError::PulseTiming {
            width_ns: width.as_nanos() as u64,
            period_ns: min_period.as_nanos() as u64,
        });
    }
    Ok(())
}
