//! Type-state builder for `Els` and generic `build_els` constructor.
//!
//! The builder enforces at compile time that a step output and a pulse timer
//! are provided before `build()` is available. Everything else defaults to
//! the stock machine.

use els_traits::{PulseTimer, StepOutput};

use crate::catalog::FeedCatalog;
use crate::config::{InputCfg, JogCfg, KnobCfg, MachineCfg, TimingCfg};
use crate::controller::{Els, Parts};
use crate::error::{BuildError, Result};
use crate::period::PeriodTable;
use crate::ratio::{FeedSelection, StepTable};
use crate::status::MotionMode;
use crate::supervisor::DirectionState;
use crate::util::tick_interval_counts;

// ── Type-state marker ────────────────────────────────────────────────────────

/// Placeholder for a hardware seam not yet supplied.
#[derive(Debug, Default)]
pub struct Missing;

/// Builder for `Els`. All fields are validated on `build()`.
pub struct ElsBuilder<O, T> {
    output: O,
    timer: T,
    machine: Option<MachineCfg>,
    timing: Option<TimingCfg>,
    jog: Option<JogCfg>,
    knob: Option<KnobCfg>,
    inputs: Option<InputCfg>,
    periods: Option<PeriodTable>,
    catalog: Option<FeedCatalog>,
    feed: Option<FeedSelection>,
    direction: Option<DirectionState>,
    mode: Option<MotionMode>,
}

impl Default for ElsBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            output: Missing,
            timer: Missing,
            machine: None,
            timing: None,
            jog: None,
            knob: None,
            inputs: None,
            periods: None,
            catalog: None,
            feed: None,
            direction: None,
            mode: None,
        }
    }
}

impl Els<Missing, Missing> {
    /// Start building a controller.
    pub fn builder() -> ElsBuilder<Missing, Missing> {
        ElsBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate configuration and assemble the controller.
///
/// Single source of truth for validation, used by both `ElsBuilder::build()`
/// and `build_els()`.
#[allow(clippy::too_many_arguments)]
fn validate_and_build<O: StepOutput, T: PulseTimer>(
    output: O,
    timer: T,
    machine: MachineCfg,
    timing: TimingCfg,
    jog: JogCfg,
    knob: KnobCfg,
    inputs: InputCfg,
    periods: PeriodTable,
    catalog: FeedCatalog,
    feed: FeedSelection,
    direction: DirectionState,
    mode: MotionMode,
) -> Result<Els<O, T>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if machine.spindle_cpr < 4 {
        return Err(invalid("spindle_cpr must be >= 4"));
    }
    if machine.leadscrew_tpi == 0 || machine.microsteps == 0 || machine.step_ratio == 0 {
        return Err(invalid("leadscrew_tpi, microsteps and step_ratio must be > 0"));
    }
    if timing.pulse_width_min == 0 {
        return Err(invalid("pulse_width_min must be >= 1"));
    }
    if timing.step_period_min <= timing.pulse_width_min {
        return Err(invalid("step_period_min must exceed pulse_width_min"));
    }
    if timing.spindle_timer_hz == 0 || timing.pulse_timer_hz == 0 {
        return Err(invalid("timer clocks must be > 0"));
    }
    if timing.stopped_counts == 0 {
        return Err(invalid("stopped_counts must be >= 1"));
    }
    if timing.max_steps_per_tick == 0 {
        return Err(invalid("max_steps_per_tick must be >= 1"));
    }
    if usize::from(timing.max_steps_per_tick) > periods.len() {
        return Err(invalid("max_steps_per_tick exceeds the period table"));
    }
    if periods
        .entries()
        .any(|(_, p)| p < timing.step_period_min || p <= timing.pulse_width_min)
    {
        return Err(invalid("period table entries must be >= step_period_min"));
    }
    // k + 1 pulses at bucket k's period must fit one tick at its rpm ceiling
    let crowded = periods
        .entries()
        .take(usize::from(timing.max_steps_per_tick))
        .enumerate()
        .any(|(k, (rpm, period))| {
            let interval = tick_interval_counts(rpm, timing.pulse_timer_hz, machine.spindle_cpr);
            u64::from(period) * (k as u64 + 1) > u64::from(interval)
        });
    if crowded {
        return Err(invalid(
            "max_steps_per_tick pulses do not fit one spindle tick at the bucket rpm",
        ));
    }
    if jog.period_min < timing.step_period_min {
        return Err(invalid("jog period_min must be >= step_period_min"));
    }
    if jog.period_max < jog.period_min {
        return Err(invalid("jog period_max must be >= period_min"));
    }
    if jog.accel == 0 {
        return Err(invalid("jog accel must be > 0"));
    }
    if knob.counts_per_rev < 4 {
        return Err(invalid("knob counts_per_rev must be >= 4"));
    }
    if knob.pulses_per_count == 0 {
        return Err(invalid("knob pulses_per_count must be >= 1"));
    }
    if knob.period < timing.step_period_min {
        return Err(invalid("knob period must be >= step_period_min"));
    }
    if knob.max_queued < knob.pulses_per_count {
        return Err(invalid("knob max_queued must be >= pulses_per_count"));
    }

    // ── Precompute ───────────────────────────────────────────────────────────
    let table = StepTable::build(feed, &machine, &timing, &periods)
        .map_err(|e| eyre::Report::new(e).wrap_err(format!("initial feed {feed}")))?;
    tracing::debug!(
        feed = %feed,
        steps_per_rev = table.total(),
        max_steps = table.max_steps(),
        period = table.period(),
        "initial step table"
    );

    Ok(Els::assemble(Parts {
        output,
        timer,
        machine,
        timing,
        jog,
        knob,
        inputs,
        periods,
        catalog,
        table,
        direction,
        mode,
    }))
}

/// Chainable setters that do not affect type-state.
impl<O, T> ElsBuilder<O, T> {
    pub fn with_machine(mut self, machine: MachineCfg) -> Self {
        self.machine = Some(machine);
        self
    }
    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }
    pub fn with_jog(mut self, jog: JogCfg) -> Self {
        self.jog = Some(jog);
        self
    }
    pub fn with_knob(mut self, knob: KnobCfg) -> Self {
        self.knob = Some(knob);
        self
    }
    pub fn with_inputs(mut self, inputs: InputCfg) -> Self {
        self.inputs = Some(inputs);
        self
    }
    pub fn with_periods(mut self, periods: PeriodTable) -> Self {
        self.periods = Some(periods);
        self
    }
    pub fn with_catalog(mut self, catalog: FeedCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }
    /// Feed active at power-up; defaults to 8 TPI.
    pub fn with_feed(mut self, feed: FeedSelection) -> Self {
        self.feed = Some(feed);
        self
    }
    pub fn with_direction(mut self, direction: DirectionState) -> Self {
        self.direction = Some(direction);
        self
    }
    /// Motion mode at power-up; defaults to synced.
    pub fn with_mode(mut self, mode: MotionMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

// Setters that advance type-state
impl<T> ElsBuilder<Missing, T> {
    pub fn with_output<O: StepOutput>(self, output: O) -> ElsBuilder<O, T> {
        ElsBuilder {
            output,
            timer: self.timer,
            machine: self.machine,
            timing: self.timing,
            jog: self.jog,
            knob: self.knob,
            inputs: self.inputs,
            periods: self.periods,
            catalog: self.catalog,
            feed: self.feed,
            direction: self.direction,
            mode: self.mode,
        }
    }
}

impl<O> ElsBuilder<O, Missing> {
    pub fn with_timer<T: PulseTimer>(self, timer: T) -> ElsBuilder<O, T> {
        ElsBuilder {
            output: self.output,
            timer,
            machine: self.machine,
            timing: self.timing,
            jog: self.jog,
            knob: self.knob,
            inputs: self.inputs,
            periods: self.periods,
            catalog: self.catalog,
            feed: self.feed,
            direction: self.direction,
            mode: self.mode,
        }
    }
}

impl<O: StepOutput, T: PulseTimer> ElsBuilder<O, T> {
    /// Validate and build. Only available once output and timer are set.
    pub fn build(self) -> Result<Els<O, T>> {
        validate_and_build(
            self.output,
            self.timer,
            self.machine.unwrap_or_default(),
            self.timing.unwrap_or_default(),
            self.jog.unwrap_or_default(),
            self.knob.unwrap_or_default(),
            self.inputs.unwrap_or_default(),
            self.periods.unwrap_or_default(),
            self.catalog.unwrap_or_default(),
            self.feed.unwrap_or_default(),
            self.direction.unwrap_or_default(),
            self.mode.unwrap_or_default(),
        )
    }
}

/// Build a controller from concrete parts without the builder.
///
/// Delegates to the shared `validate_and_build`.
#[allow(clippy::too_many_arguments)]
pub fn build_els<O, T>(
    output: O,
    timer: T,
    machine: MachineCfg,
    timing: TimingCfg,
    jog: JogCfg,
    knob: KnobCfg,
    inputs: InputCfg,
    periods: Option<PeriodTable>,
    catalog: Option<FeedCatalog>,
    feed: Option<FeedSelection>,
) -> Result<Els<O, T>>
where
    O: StepOutput,
    T: PulseTimer,
{
    validate_and_build(
        output,
        timer,
        machine,
        timing,
        jog,
        knob,
        inputs,
        periods.unwrap_or_default(),
        catalog.unwrap_or_default(),
        feed.unwrap_or_default(),
        DirectionState::default(),
        MotionMode::default(),
    )
}
