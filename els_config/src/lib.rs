#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and pitch-catalog parsing for the electronic leadscrew.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; defaults match the stock machine (800-count
//!   spindle encoder, 8 TPI leadscrew, 400 microsteps with an 8:1 reduction).
//! - Pitch catalog CSV loader enforces headers and per-row syntax.
use serde::Deserialize;

/// Feed mode names as written in TOML and CSV.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedModeName {
    #[default]
    Inch,
    Metric,
    Diametral,
    Module,
}

/// Pitch catalog CSV schema.
///
/// Expected headers:
/// mode,pitch
///
/// Example:
/// mode,pitch
/// inch,11.5
/// metric,1.25
#[derive(Debug, Deserialize, Clone)]
pub struct PitchRow {
    pub mode: FeedModeName,
    pub pitch: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Machine {
    /// Spindle encoder counts per revolution (after 4x quadrature decoding).
    pub spindle_cpr: u16,
    /// Leadscrew threads per inch.
    pub leadscrew_tpi: u32,
    /// Driver microsteps per motor revolution.
    pub microsteps: u32,
    /// Motor revolutions per leadscrew revolution.
    pub step_ratio: u32,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            spindle_cpr: 800,
            leadscrew_tpi: 8,
            microsteps: 400,
            step_ratio: 8,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Shortest step period in pulse-timer counts (jitter allowance included).
    pub step_period_min: u16,
    /// Shortest step pulse the driver accepts, in pulse-timer counts.
    pub pulse_width_min: u16,
    /// Free-running spindle timestamp clock.
    pub spindle_timer_hz: u32,
    /// Clock of the step pulse compare timer.
    pub pulse_timer_hz: u32,
    /// Spindle-timer counts between ticks beyond which the spindle counts as stopped.
    pub stopped_counts: u32,
    /// Ceiling on steps owed for a single spindle tick.
    pub max_steps_per_tick: u8,
}

impl Default for Timing {
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Jog {
    /// Starting (slowest) jog period in pulse-timer counts.
    pub period_max: u16,
    /// Cruising (fastest) jog period.
    pub period_min: u16,
    /// Period change per jog pulse while ramping.
    pub accel: u16,
}

impl Default for Jog {
    fn default() -> Self {
        Self {
            period_max: 0x8000,
            period_min: 0x80,
            accel: 0x200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Knob {
    /// Knob encoder counts per revolution (after decoding).
    pub counts_per_rev: u16,
    /// Step pulses requested per decoded knob count.
    pub pulses_per_count: u16,
    /// Pulse period used for knob nudges.
    pub period: u16,
    /// Upper bound on queued nudge pulses.
    pub max_queued: u16,
}

impl Default for Knob {
    fn default() -> Self {
        Self {
            counts_per_rev: 96,
            pulses_per_count: 26,
            period: 0x400,
            max_queued: 26 * 16,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Inputs {
    /// Direction switch edges closer than this (spindle-timer counts) are bounce.
    pub debounce_counts: u32,
}

impl Default for Inputs {
    fn default() -> Self {
        // 20 ms at 16 MHz
        Self {
            debounce_counts: 320_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Periods {
    /// Spindle speed ceilings, one per steps-per-tick bucket (fastest first).
    pub rpm_table: Vec<u16>,
    /// Tuned step period per bucket, in pulse-timer counts.
    pub period_list: Vec<u16>,
    /// Compute periods from `rpm_table` instead of using `period_list`.
    pub derive: bool,
    /// Share of the tick interval the pulses of one tick may occupy when deriving.
    pub headroom_pct: u8,
}

impl Default for Periods {
    fn default() -> Self {
        Self {
            rpm_table: vec![1450, 780, 620, 420, 334, 244, 179, 131, 104, 70, 56, 30],
            period_list: vec![60, 60, 60, 60, 60, 60, 60, 60, 83, 104, 155, 194],
            derive: false,
            headroom_pct: 80,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Feeds {
    /// Feed mode selected at power-up.
    pub mode: FeedModeName,
    /// Pitch selected at power-up, as a decimal string in the mode's unit.
    pub pitch: Option<String>,
    /// Optional replacement catalogs, decimal strings in each mode's unit.
    pub inch: Option<Vec<String>>,
    pub metric: Option<Vec<String>>,
    pub diametral: Option<Vec<String>>,
    pub module: Option<Vec<String>>,
}

impl Default for Feeds {
    fn default() -> Self {
        Self {
            mode: FeedModeName::Inch,
            pitch: Some("8".to_string()),
            inch: None,
            metric: None,
            diametral: None,
            module: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// Stepper PUL- line.
    pub pul: u8,
    /// Stepper DIR- line.
    pub dir: u8,
    /// PUL/DIR are active low (PUL+/DIR+ tied to +5V).
    pub active_low: bool,
    pub spindle_a: u8,
    pub spindle_b: u8,
    pub knob_a: u8,
    pub knob_b: u8,
    pub left_mom: u8,
    pub right_mom: u8,
    /// Driver alarm input (open collector), unused when absent.
    pub alarm: Option<u8>,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            pul: 6,
            dir: 7,
            active_low: true,
            spindle_a: 3,
            spindle_b: 2,
            knob_a: 21,
            knob_b: 20,
            left_mom: 18,
            right_mom: 19,
            alarm: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StatusCfg {
    /// Display refresh period in milliseconds.
    pub refresh_ms: u64,
}

impl Default for StatusCfg {
    fn default() -> Self {
        Self { refresh_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub machine: Machine,
    pub timing: Timing,
    pub jog: Jog,
    pub knob: Knob,
    pub inputs: Inputs,
    pub periods: Periods,
    pub feeds: Feeds,
    pub pins: Pins,
    pub status: StatusCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// True for strings like `8`, `11.5` or `0.75` with a non-zero value.
pub fn is_positive_decimal(s: &str) -> bool {
    let s = s.trim();
    let mut parts = s.splitn(2, '.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");
    if int.is_empty() && frac.is_empty() {
        return false;
    }
    let digits_ok = int.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
        && !(s.ends_with('.'));
    digits_ok && s.chars().any(|c| c.is_ascii_digit() && c != '0')
}

pub fn load_pitch_csv(path: &std::path::Path) -> eyre::Result<Vec<PitchRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open pitch CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["mode", "pitch"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "pitch CSV must have headers 'mode,pitch', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<PitchRow>().enumerate() {
        match rec {
            Ok(row) => {
                if !is_positive_decimal(&row.pitch) {
                    eyre::bail!(
                        "invalid CSV row {}: pitch '{}' is not a positive decimal",
                        idx + 2,
                        row.pitch
                    );
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("pitch CSV {:?} has no rows", path);
    }
    Ok(rows)
}

fn validate_catalog(name: &str, list: Option<&Vec<String>>) -> eyre::Result<()> {
    let Some(list) = list else {
        return Ok(());
    };
    if list.is_empty() {
        eyre::bail!("feeds.{name} must list at least one pitch");
    }
    for (i, p) in list.iter().enumerate() {
        if !is_positive_decimal(p) {
            eyre::bail!("feeds.{name}[{i}] = '{p}' is not a positive decimal");
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Machine
        if self.machine.spindle_cpr < 4 {
            eyre::bail!("machine.spindle_cpr must be >= 4");
        }
        if self.machine.leadscrew_tpi == 0 {
            eyre::bail!("machine.leadscrew_tpi must be > 0");
        }
        if self.machine.microsteps == 0 {
            eyre::bail!("machine.microsteps must be > 0");
        }
        if self.machine.step_ratio == 0 {
            eyre::bail!("machine.step_ratio must be > 0");
        }

        // Timing
        if self.timing.pulse_width_min == 0 {
            eyre::bail!("timing.pulse_width_min must be >= 1");
        }
        if self.timing.step_period_min <= self.timing.pulse_width_min {
            eyre::bail!("timing.step_period_min must be > timing.pulse_width_min");
        }
        if self.timing.spindle_timer_hz == 0 {
            eyre::bail!("timing.spindle_timer_hz must be > 0");
        }
        if self.timing.pulse_timer_hz == 0 {
            eyre::bail!("timing.pulse_timer_hz must be > 0");
        }
        if self.timing.stopped_counts == 0 {
            eyre::bail!("timing.stopped_counts must be >= 1");
        }
        if self.timing.max_steps_per_tick == 0 {
            eyre::bail!("timing.max_steps_per_tick must be >= 1");
        }

        // Jog
        if self.jog.period_min < self.timing.step_period_min {
            eyre::bail!("jog.period_min must be >= timing.step_period_min");
        }
        if self.jog.period_max < self.jog.period_min {
            eyre::bail!("jog.period_max must be >= jog.period_min");
        }
        if self.jog.accel == 0 {
            eyre::bail!("jog.accel must be > 0");
        }

        // Knob
        if self.knob.counts_per_rev < 4 {
            eyre::bail!("knob.counts_per_rev must be >= 4");
        }
        if self.knob.period < self.timing.step_period_min {
            eyre::bail!("knob.period must be >= timing.step_period_min");
        }
        if self.knob.max_queued < self.knob.pulses_per_count {
            eyre::bail!("knob.max_queued must be >= knob.pulses_per_count");
        }

        // Periods
        if self.periods.rpm_table.is_empty() {
            eyre::bail!("periods.rpm_table must not be empty");
        }
        if self.periods.rpm_table.contains(&0) {
            eyre::bail!("periods.rpm_table entries must be > 0");
        }
        if !self.periods.derive {
            if self.periods.period_list.len() != self.periods.rpm_table.len() {
                eyre::bail!("periods.period_list must have one entry per periods.rpm_table entry");
            }
            if self
                .periods
                .period_list
                .iter()
                .any(|p| *p < self.timing.step_period_min)
            {
                eyre::bail!("periods.period_list entries must be >= timing.step_period_min");
            }
        }
        if self.periods.headroom_pct == 0 || self.periods.headroom_pct > 100 {
            eyre::bail!("periods.headroom_pct must be in [1, 100]");
        }
        if usize::from(self.timing.max_steps_per_tick) > self.periods.rpm_table.len() {
            eyre::bail!("timing.max_steps_per_tick must not exceed the number of period buckets");
        }

        // Feeds
        if let Some(p) = &self.feeds.pitch
            && !is_positive_decimal(p)
        {
            eyre::bail!("feeds.pitch = '{p}' is not a positive decimal");
        }
        validate_catalog("inch", self.feeds.inch.as_ref())?;
        validate_catalog("metric", self.feeds.metric.as_ref())?;
        validate_catalog("diametral", self.feeds.diametral.as_ref())?;
        validate_catalog("module", self.feeds.module.as_ref())?;

        // Pins
        if self.pins.pul == self.pins.dir {
            eyre::bail!("pins.pul and pins.dir must differ");
        }

        // Status
        if self.status.refresh_ms == 0 {
            eyre::bail!("status.refresh_ms must be >= 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_stock_machine() {
        let cfg = load_toml("").expect("parse empty");
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.machine.spindle_cpr, 800);
        assert_eq!(cfg.jog.period_max, 0x8000);
        assert_eq!(cfg.periods.period_list.len(), 12);
    }

    #[test]
    fn decimal_syntax() {
        assert!(is_positive_decimal("8"));
        assert!(is_positive_decimal("11.5"));
        assert!(is_positive_decimal(".75"));
        assert!(!is_positive_decimal("0"));
        assert!(!is_positive_decimal("0.0"));
        assert!(!is_positive_decimal("1."));
        assert!(!is_positive_decimal("-2"));
        assert!(!is_positive_decimal("1.2.3"));
        assert!(!is_positive_decimal(""));
    }
}
