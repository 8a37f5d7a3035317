//! Runtime configuration for the synchronization engine.
//!
//! These are plain copies of the machine constants the controller works with.
//! They are separate from the TOML-deserialized config in `els_config`.

/// Mechanical constants of the spindle encoder and leadscrew drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineCfg {
    /// Spindle encoder counts per revolution after quadrature decoding (SCPR).
    pub spindle_cpr: u16,
    /// Leadscrew threads per inch.
    pub leadscrew_tpi: u32,
    /// Driver microsteps per motor revolution.
    pub microsteps: u32,
    /// Motor revolutions per leadscrew revolution.
    pub step_ratio: u32,
}

impl MachineCfg {
    /// Steps per leadscrew revolution (LSPR).
    #[inline]
    pub fn steps_per_leadscrew_rev(&self) -> u64 {
        u64::from(self.microsteps) * u64::from(self.step_ratio)
    }

    /// Steps per inch of carriage travel (LSPI).
    #[inline]
    pub fn steps_per_inch(&self) -> u64 {
        self.steps_per_leadscrew_rev() * u64::from(self.leadscrew_tpi)
    }
}

impl Default for MachineCfg {
    fn default() -> Self {
        Self {
            spindle_cpr: 800,
            leadscrew_tpi: 8,
            microsteps: 400,
            step_ratio: 8,
        }
    }
}

/// Timer clocks and pulse floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingCfg {
    /// Shortest step period in pulse-timer counts (STP_MIN).
    pub step_period_min: u16,
    /// Minimum step pulse width in pulse-timer counts (PUL_MIN).
    pub pulse_width_min: u16,
    pub spindle_timer_hz: u32,
    pub pulse_timer_hz: u32,
    /// Spindle-timer counts per tick beyond which the spindle is stopped.
    pub stopped_counts: u32,
    /// Ceiling on owed steps per spindle tick.
    pub max_steps_per_tick: u8,
}

impl TimingCfg {
    /// Minimum pulse width as wall time in nanoseconds.
    pub fn pulse_width_ns(&self) -> u64 {
        u64::from(self.pulse_width_min) * 1_000_000_000 / u64::from(self.pulse_timer_hz.max(1))
    }
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            step_period_min: 60,
            pulse_width_min: 6,
            spindle_timer_hz: 16_000_000,
            pulse_timer_hz: 2_000_000,
            stopped_counts: 60_000,
            max_steps_per_tick: 11,
        }
    }
}

/// Jog ramp bounds, all in pulse-timer counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JogCfg {
    pub period_max: u16,
    pub period_min: u16,
    pub accel: u16,
}

impl Default for JogCfg {
    fn default() -> Self {
        Self {
            period_max: 0x8000,
            period_min: 0x80,
            accel: 0x200,
        }
    }
}

/// Manual knob nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnobCfg {
    pub counts_per_rev: u16,
    /// Pulses queued per decoded knob count (26 steps is about 0.001").
    pub pulses_per_count: u16,
    pub period: u16,
    pub max_queued: u16,
}

impl Default for KnobCfg {
    fn default() -> Self {
        Self {
            counts_per_rev: 96,
            pulses_per_count: 26,
            period: 0x400,
            max_queued: 26 * 16,
        }
    }
}

/// Momentary input handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputCfg {
    /// Switch edges closer than this many spindle-timer counts are bounce.
    pub debounce_counts: u32,
}

impl Default for InputCfg {
    fn default() -> Self {
        Self {
            debounce_counts: 320_000,
        }
    }
}
