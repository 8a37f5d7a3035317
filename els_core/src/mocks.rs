//! Test and helper doubles for the hardware seams.

use std::sync::{Arc, Mutex};

use els_traits::{PulseTimer, StepOutput};

/// What a `RecordingOutput` has seen so far.
#[derive(Debug, Default, Clone)]
pub struct OutputLog {
    pub pulses: u64,
    /// Pulses away from the headstock minus pulses toward it.
    pub net: i64,
    pub toward_headstock: bool,
    pub direction_writes: u32,
}

/// Step output that counts pulses per direction. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    log: Arc<Mutex<OutputLog>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> OutputLog {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn pulses(&self) -> u64 {
        self.log().pulses
    }

    pub fn net(&self) -> i64 {
        self.log().net
    }
}

impl StepOutput for RecordingOutput {
    fn set_direction(&mut self, toward_headstock: bool) {
        if let Ok(mut l) = self.log.lock() {
            l.toward_headstock = toward_headstock;
            l.direction_writes += 1;
        }
    }

    fn pulse(&mut self) {
        if let Ok(mut l) = self.log.lock() {
            l.pulses += 1;
            l.net += if l.toward_headstock { -1 } else { 1 };
        }
    }
}

/// Pulse timer that only remembers what it was asked to do; tests fire the
/// controller's pulse handler themselves.
#[derive(Debug, Default)]
pub struct ManualTimer {
    period: Option<u16>,
    arms: u32,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arms(&self) -> u32 {
        self.arms
    }
}

impl PulseTimer for ManualTimer {
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
