//! Step/direction outputs and pulse timers for the leadscrew controller.
//!
//! The simulated parts run anywhere and back the CLI and tests. With the
//! `hardware` feature on Linux, `gpio::GpioStepper` drives a real stepper
//! driver through `rppal`.

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod util;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};

use els_traits::{PulseTimer, StepOutput};

#[derive(Debug, Default)]
struct StepperState {
    position: AtomicI64,
    pulses: AtomicU64,
    toward_headstock: AtomicBool,
    direction_changes: AtomicU32,
}

/// Simulated stepper driver: counts pulses on its own, independent of the
/// controller's position counter.
#[derive(Debug, Default)]
pub struct SimulatedStepper {
    state: Arc<StepperState>,
}

/// Read side of a `SimulatedStepper`, usable after the stepper has been
/// moved into a controller.
#[derive(Debug, Clone)]
pub struct StepperProbe {
    state: Arc<StepperState>,
}

impl SimulatedStepper {
    pub fn new() -> Self {
        tracing::debug!("simulated stepper ready");
        Self::default()
    }

    pub fn probe(&self) -> StepperProbe {
        StepperProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl StepOutput for SimulatedStepper {
    fn set_direction(&mut self, toward_headstock: bool) {
        let prev = self
            .state
            .toward_headstock
            .swap(toward_headstock, Ordering::AcqRel);
        if prev != toward_headstock {
            self.state.direction_changes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn pulse(&mut self) {
        let delta = if self.state.toward_headstock.load(Ordering::Acquire) {
            -1
        } else {
            1
        };
        self.state.position.fetch_add(delta, Ordering::AcqRel);
        self.state.pulses.fetch_add(1, Ordering::Relaxed);
    }
}

impl StepperProbe {
    /// Net steps: away from the headstock counts up.
    pub fn position(&self) -> i64 {
        self.state.position.load(Ordering::Acquire)
    }

    pub fn pulses(&self) -> u64 {
        self.state.pulses.load(Ordering::Relaxed)
    }

    pub fn toward_headstock(&self) -> bool {
        self.state.toward_headstock.load(Ordering::Acquire)
    }

    pub fn direction_changes(&self) -> u32 {
        self.state.direction_changes.load(Ordering::Relaxed)
    }
}

/// Compare timer with no clock behind it. Whoever owns the event loop
/// reads `armed_period` and calls the pulse handler when it is due.
#[derive(Debug, Default)]
pub struct SimulatedTimer {
    period: Option<u16>,
    arms: u64,
}

impl SimulatedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the timer was (re)armed.
    pub fn arms(&self) -> u64 {
        self.arms
    }
}

impl PulseTimer for SimulatedTimer {
    fn arm(&mut self, period: u16) {
        self.period = Some(period);
        self.arms += 1;
    }

    fn disarm(&mut self) {
        self.period = None;
    }

    fn armed_period(&self) -> Option<u16> {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_stepper_counts_both_ways() {
        let mut s = SimulatedStepper::new();
        let probe = s.probe();
        s.set_direction(false);
        s.pulse();
        s.pulse();
        s.set_direction(true);
        s.pulse();
        assert_eq!(probe.position(), 1);
        assert_eq!(probe.pulses(), 3);
        assert!(probe.toward_headstock());
        assert_eq!(probe.direction_changes(), 1);
    }

    #[test]
    fn simulated_timer_tracks_arming() {
        let mut t = SimulatedTimer::new();
        assert_eq!(t.armed_period(), None);
        t.arm(0x80);
        t.arm(0x100);
        assert_eq!(t.armed_period(), Some(0x100));
        t.disarm();
        assert_eq!(t.armed_period(), None);
        assert_eq!(t.arms(), 2);
    }
}
