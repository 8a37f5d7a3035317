//! The controller object shared between interrupt handlers and the
//! background loop.
//!
//! Interrupt-owned state lives in one `critical_section::Mutex<RefCell<_>>`.
//! Every handler body is a short state transition plus at most one pulse and
//! never logs. Position, spindle tick, rate and the fault flag are mirrored
//! into atomics so the background loop can read them without masking
//! interrupts. Step tables are built outside the critical section and
//! published by swapping an `Arc`.

use core::cell::RefCell;
use std::sync::Arc;

use critical_section::Mutex;
use els_traits::{PulseTimer, StepOutput};
use portable_atomic::{AtomicBool, AtomicI32, AtomicU16, Ordering};

use crate::catalog::FeedCatalog;
use crate::config::{InputCfg, JogCfg, KnobCfg, MachineCfg, TimingCfg};
use crate::error::ElsError;
use crate::jog::{JogController, JogPhase};
use crate::knob::KnobNudge;
use crate::period::PeriodTable;
use crate::quadrature::{Phases, QuadratureDecoder, RateMeter, Rotation, STOPPED};
use crate::ratio::{FeedMode, FeedSelection, StepTable};
use crate::scheduler::StepScheduler;
use crate::status::{MotionMode, Status, StatusMonitor};
use crate::supervisor::{DirectionState, LimitState, Side};
use crate::util::rpm_from_rate;

struct Engine<O, T> {
    output: O,
    timer: T,
    spindle: QuadratureDecoder,
    rate: RateMeter,
    knob_decoder: QuadratureDecoder,
    scheduler: StepScheduler,
    jog: JogController,
    knob: KnobNudge,
    limits: LimitState,
    direction: DirectionState,
    dir_line: Option<bool>,
    last_switch: Option<u32>,
    mode: MotionMode,
    table: Arc<StepTable>,
    catalog: FeedCatalog,
    selected: [usize; 4],
    position: i32,
    fault: bool,
    overruns: u32,
    limit_reached: Option<Side>,
}

impl<O: StepOutput, T: PulseTimer> Engine<O, T> {
    #[inline]
    fn set_dir(&mut self, toward_headstock: bool) {
        if self.dir_line != Some(toward_headstock) {
            self.output.set_direction(toward_headstock);
            self.dir_line = Some(toward_headstock);
        }
    }

    #[inline]
    fn emit(&mut self, toward_headstock: bool) {
        self.output.pulse();
        self.position = if toward_headstock {
            self.position.wrapping_sub(1)
        } else {
            self.position.wrapping_add(1)
        };
    }

    /// Stop whatever is being emitted, at a pulse boundary.
    fn halt_motion(&mut self) {
        self.scheduler.cancel();
        self.knob.cancel();
        self.jog.abort();
        self.timer.disarm();
        if self.mode == MotionMode::Jog {
            self.mode = MotionMode::Disengaged;
        }
    }

    fn on_spindle_tick(&mut self, rotation: Rotation, prev_tick: u16) {
        if self.fault || self.mode != MotionMode::Synced {
            return;
        }
        let index = match rotation {
            Rotation::Forward => self.spindle.tick(),
            Rotation::Reverse => prev_tick,
        };
        let owed = self.table.owed(index);
        let toward = self.direction.feeding_in();
        if self.scheduler.begin_tick(owed, toward).is_err() {
            self.fault = true;
            self.overruns = self.overruns.saturating_add(1);
            self.timer.disarm();
            return;
        }
        if owed == 0 {
            return;
        }
        if let Some(side) = self.limits.blocks(self.position, toward) {
            self.limit_reached = Some(side);
            self.scheduler.cancel();
            return;
        }
        self.set_dir(toward);
        self.timer.arm(self.table.period());
    }

    fn on_pulse_timer(&mut self) {
        if self.fault {
            self.timer.disarm();
            return;
        }
        match self.mode {
            MotionMode::Synced => {
                let toward = self.scheduler.toward_headstock();
                if self.scheduler.pending() == 0 {
                    self.timer.disarm();
                    return;
                }
                if let Some(side) = self.limits.blocks(self.position, toward) {
                    self.limit_reached = Some(side);
                    self.scheduler.cancel();
                    self.timer.disarm();
                    return;
                }
                self.scheduler.take();
                self.emit(toward);
                if self.scheduler.pending() == 0 {
                    self.timer.disarm();
                }
            }
            MotionMode::Jog => {
                let toward = self.jog.toward_headstock();
                if let Some(side) = self.limits.blocks(self.position, toward) {
                    self.limit_reached = Some(side);
                    self.halt_motion();
                    return;
                }
                match self.jog.advance() {
                    Some(next) => {
                        self.emit(toward);
                        self.timer.arm(next);
                    }
                    None => {
                        self.timer.disarm();
                        self.mode = MotionMode::Disengaged;
                    }
                }
            }
            MotionMode::Disengaged => {
                let toward = self.knob.toward_headstock();
                if self.knob.queued() == 0 {
                    self.timer.disarm();
                    return;
                }
                if let Some(side) = self.limits.blocks(self.position, toward) {
                    self.limit_reached = Some(side);
                    self.knob.cancel();
                    self.timer.disarm();
                    return;
                }
                self.knob.take();
                self.emit(toward);
                if self.knob.queued() == 0 {
                    self.timer.disarm();
                }
            }
        }
    }

    fn on_knob_edge(&mut self, rotation: Rotation) {
        if self.fault || self.mode != MotionMode::Disengaged {
            return;
        }
        let was_idle = self.knob.queued() == 0;
        let changed = self.knob.request(rotation);
        if was_idle || changed {
            let toward = self.knob.toward_headstock();
            self.set_dir(toward);
            self.timer.arm(self.knob.period());
        }
    }

    /// Feed changes are refused while the leadscrew follows a turning spindle.
    fn check_feed_change(&self) -> Result<(), ElsError> {
        if self.mode == MotionMode::Synced && self.rate.is_turning() {
            return Err(ElsError::InvalidCommand(
                "feed cannot change while engaged with the spindle turning",
            ));
        }
        Ok(())
    }
}

/// Electronic leadscrew controller.
///
/// Handlers (`spindle_edge`, `knob_edge`, `pulse_timer`, `direction_switch`)
/// are called from interrupt context; everything else is background work.
pub struct Els<O, T> {
    machine: MachineCfg,
    timing: TimingCfg,
    inputs: InputCfg,
    periods: PeriodTable,
    engine: Mutex<RefCell<Engine<O, T>>>,
    position: AtomicI32,
    tick: AtomicU16,
    rate: AtomicU16,
    fault: AtomicBool,
    monitor: std::sync::Mutex<StatusMonitor>,
}

impl<O, T> core::fmt::Debug for Els<O, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Els")
            .field("position", &self.position.load(Ordering::Acquire))
            .field("spindle_tick", &self.tick.load(Ordering::Acquire))
            .field("spindle_rate", &self.rate.load(Ordering::Acquire))
            .field("fault", &self.fault.load(Ordering::Acquire))
            .finish()
    }
}

/// Everything the builder has validated, ready to assemble.
pub(crate) struct Parts<O, T> {
    pub output: O,
    pub timer: T,
    pub machine: MachineCfg,
    pub timing: TimingCfg,
    pub jog: JogCfg,
    pub knob: KnobCfg,
    pub inputs: InputCfg,
    pub periods: PeriodTable,
    pub catalog: FeedCatalog,
    pub table: StepTable,
    pub direction: DirectionState,
    pub mode: MotionMode,
}

impl<O: StepOutput, T: PulseTimer> Els<O, T> {
    pub(crate) fn assemble(parts: Parts<O, T>) -> Self {
        let feed = parts.table.selection();
        let mut selected = [0usize; 4];
        selected[feed.mode.index()] = parts.catalog.position(&feed).unwrap_or(0);
        let engine = Engine {
            output: parts.output,
            timer: parts.timer,
            spindle: QuadratureDecoder::new(parts.machine.spindle_cpr, Phases::default()),
            rate: RateMeter::new(parts.timing.stopped_counts),
            knob_decoder: QuadratureDecoder::new(parts.knob.counts_per_rev, Phases::default()),
            scheduler: StepScheduler::new(),
            jog: JogController::new(parts.jog),
            knob: KnobNudge::new(parts.knob),
            limits: LimitState::default(),
            direction: parts.direction,
            dir_line: None,
            last_switch: None,
            mode: parts.mode,
            table: Arc::new(parts.table),
            catalog: parts.catalog,
            selected,
            position: 0,
            fault: false,
            overruns: 0,
            limit_reached: None,
        };
        Self {
            machine: parts.machine,
            timing: parts.timing,
            inputs: parts.inputs,
            periods: parts.periods,
            engine: Mutex::new(RefCell::new(engine)),
            position: AtomicI32::new(0),
            tick: AtomicU16::new(0),
            rate: AtomicU16::new(STOPPED),
            fault: AtomicBool::new(false),
            monitor: std::sync::Mutex::new(StatusMonitor::new()),
        }
    }

    #[inline]
    fn with_engine<R>(&self, f: impl FnOnce(&mut Engine<O, T>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.engine.borrow_ref_mut(cs)))
    }

    /// Refresh the lock-free mirrors. Called inside the critical section.
    #[inline]
    fn mirror(&self, e: &Engine<O, T>) {
        self.position.store(e.position, Ordering::Release);
        self.fault.store(e.fault, Ordering::Release);
    }

    // ── Interrupt handlers ───────────────────────────────────────────────────

    /// Spindle encoder edge with phases sampled at spindle-timer count `now`.
    #[inline]
    pub fn spindle_edge(&self, phases: Phases, now: u32) -> Option<Rotation> {
        self.with_engine(|e| {
            let prev_tick = e.spindle.tick();
            let rotation = e.spindle.edge(phases)?;
            let rate = e.rate.record(now);
            self.tick.store(e.spindle.tick(), Ordering::Release);
            self.rate.store(rate, Ordering::Release);
            e.direction.spin_ccw = rotation == Rotation::Forward;
            e.on_spindle_tick(rotation, prev_tick);
            self.mirror(e);
            Some(rotation)
        })
    }

    /// Manual knob encoder edge.
    #[inline]
    pub fn knob_edge(&self, phases: Phases) -> Option<Rotation> {
        self.with_engine(|e| {
            let rotation = e.knob_decoder.edge(phases)?;
            e.on_knob_edge(rotation);
            Some(rotation)
        })
    }

    /// Pulse-timer compare event.
    #[inline]
    pub fn pulse_timer(&self) {
        self.with_engine(|e| {
            e.on_pulse_timer();
            self.mirror(e);
        });
    }

    /// Momentary direction switch. Left asks to feed toward the headstock.
    /// Returns `Ok(false)` for an edge swallowed by the debounce window.
    pub fn direction_switch(&self, side: Side, now: u32) -> Result<bool, ElsError> {
        let debounce = self.inputs.debounce_counts;
        self.with_engine(|e| {
            if e.fault {
                return Err(ElsError::OverrunFault);
            }
            if e
                .last_switch
                .is_some_and(|t| now.wrapping_sub(t) < debounce)
            {
                return Ok(false);
            }
            e.last_switch = Some(now);
            e.direction.feed_in = side.toward_headstock();
            Ok(true)
        })
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Build and publish the table for `selection`. On error the previous
    /// table stays active.
    pub fn set_feed(&self, selection: FeedSelection) -> Result<(), ElsError> {
        self.with_engine(|e| e.check_feed_change())?;
        let table = Arc::new(StepTable::build(
            selection,
            &self.machine,
            &self.timing,
            &self.periods,
        )?);
        let (max_steps, period) = (table.max_steps(), table.period());
        let old = self.with_engine(|e| {
            e.check_feed_change()?;
            if let Some(i) = e.catalog.position(&selection) {
                e.selected[selection.mode.index()] = i;
            }
            Ok::<_, ElsError>(core::mem::replace(&mut e.table, table))
        })?;
        drop(old);
        tracing::debug!(feed = %selection, max_steps, period, "step table published");
        Ok(())
    }

    /// Switch mode, restoring the pitch last selected in that mode.
    pub fn set_feed_mode(&self, mode: FeedMode) -> Result<(), ElsError> {
        let selection = self
            .with_engine(|e| e.catalog.get(mode, e.selected[mode.index()]))
            .ok_or(ElsError::InvalidCommand("no pitches listed for this mode"))?;
        self.set_feed(selection)
    }

    /// Pick entry `index` of the active mode's catalog.
    pub fn select_pitch(&self, index: usize) -> Result<(), ElsError> {
        let selection = self
            .with_engine(|e| e.catalog.get(e.table.selection().mode, index))
            .ok_or(ElsError::InvalidCommand("pitch index out of range"))?;
        self.set_feed(selection)
    }

    /// Lock the leadscrew to the spindle.
    pub fn engage(&self) -> Result<(), ElsError> {
        self.with_engine(|e| {
            if e.fault {
                return Err(ElsError::OverrunFault);
            }
            match e.mode {
                MotionMode::Synced => Ok(()),
                MotionMode::Jog => Err(ElsError::InvalidCommand(
                    "stop the jog before engaging the feed",
                )),
                MotionMode::Disengaged => {
                    e.knob.cancel();
                    e.scheduler.cancel();
                    e.timer.disarm();
                    e.mode = MotionMode::Synced;
                    Ok(())
                }
            }
        })
    }

    /// Release the leadscrew from the spindle.
    pub fn disengage(&self) -> Result<(), ElsError> {
        self.with_engine(|e| match e.mode {
            MotionMode::Jog => Err(ElsError::InvalidCommand("jog in progress")),
            MotionMode::Disengaged => Ok(()),
            MotionMode::Synced => {
                e.scheduler.cancel();
                e.timer.disarm();
                e.mode = MotionMode::Disengaged;
                Ok(())
            }
        })
    }

    /// Latch the current position as the bound for `side`.
    pub fn set_limit(&self, side: Side) -> Result<i32, ElsError> {
        self.with_engine(|e| {
            let position = e.position;
            e.limits.set(side, position)?;
            Ok(position)
        })
    }

    pub fn clear_limit(&self, side: Side) {
        self.with_engine(|e| {
            e.limits.clear(side);
            if e.limit_reached == Some(side) {
                e.limit_reached = None;
            }
        });
    }

    /// Make the current position zero, moving enabled limits with it.
    pub fn zero_position(&self) {
        self.with_engine(|e| {
            let delta = 0i32.wrapping_sub(e.position);
            e.position = 0;
            e.limits.shift(delta);
            self.mirror(e);
        });
    }

    /// Start (or resume) a jog. Left jogs toward the headstock.
    pub fn start_jog(&self, side: Side) -> Result<(), ElsError> {
        self.with_engine(|e| {
            if e.fault {
                return Err(ElsError::OverrunFault);
            }
            let toward = side.toward_headstock();
            if let Some(s) = e.limits.blocks(e.position, toward) {
                e.limit_reached = Some(s);
                return Err(ElsError::LimitReached(s));
            }
            let was_idle = !e.jog.is_active();
            let period = e.jog.start(toward)?;
            if was_idle {
                e.scheduler.cancel();
                e.knob.cancel();
                e.mode = MotionMode::Jog;
                e.set_dir(toward);
                e.timer.arm(period);
            }
            Ok(())
        })
    }

    /// Release the jog; the ramp winds down on subsequent pulses.
    pub fn stop_jog(&self) {
        self.with_engine(|e| e.jog.stop());
    }

    /// Clear a latched overrun. Motion stays stopped until the next tick or
    /// command starts it again.
    pub fn acknowledge_fault(&self) -> Result<(), ElsError> {
        self.with_engine(|e| {
            if !e.fault {
                return Err(ElsError::InvalidCommand("no fault latched"));
            }
            e.fault = false;
            e.halt_motion();
            self.mirror(e);
            Ok(())
        })
    }

    // ── Background service ───────────────────────────────────────────────────

    /// Background pass: run the stopped-spindle watchdog, snapshot status and
    /// log any transitions since the previous pass.
    pub fn service(&self, now: u32) -> Status {
        let status = self.with_engine(|e| {
            if e.rate.check_stopped(now) {
                self.rate.store(STOPPED, Ordering::Release);
            }
            let status = self.snapshot(e);
            // a trip stays latched until one refresh has reported it and the
            // carriage has left the bound
            if let Some(side) = e.limit_reached
                && e.limits.blocks(e.position, side.toward_headstock()) != Some(side)
            {
                e.limit_reached = None;
            }
            status
        });
        if let Ok(mut monitor) = self.monitor.lock() {
            monitor.observe(&status);
        }
        status
    }

    fn snapshot(&self, e: &Engine<O, T>) -> Status {
        let rate = e.rate.rate();
        let spindle_rpm =
            rpm_from_rate(rate, self.timing.spindle_timer_hz, self.machine.spindle_cpr);
        let rpm_ceiling = e.table.rpm_ceiling();
        Status {
            position: e.position,
            spindle_tick: e.spindle.tick(),
            spindle_rate: rate,
            spindle_rpm,
            fault: e.fault,
            overruns: e.overruns,
            limit_reached: e.limit_reached,
            limits: e.limits,
            mode: e.mode,
            jog: e.jog.phase(),
            feed: e.table.selection(),
            steps_per_rev: e.table.total(),
            max_steps: e.table.max_steps(),
            period: e.table.period(),
            rpm_ceiling,
            over_speed: spindle_rpm.is_some_and(|r| r > u32::from(rpm_ceiling)),
            direction: e.direction,
            feeding_in: e.direction.feeding_in(),
            knob_queued: e.knob.queued(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Consistent snapshot without running the watchdog or logging.
    pub fn status(&self) -> Status {
        self.with_engine(|e| self.snapshot(e))
    }

    #[inline]
    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Acquire)
    }

    #[inline]
    pub fn spindle_tick(&self) -> u16 {
        self.tick.load(Ordering::Acquire)
    }

    /// Spindle-timer counts per tick, `0xFFFF` when stopped.
    #[inline]
    pub fn spindle_rate(&self) -> u16 {
        self.rate.load(Ordering::Acquire)
    }

    pub fn spindle_rpm(&self) -> Option<u32> {
        rpm_from_rate(
            self.spindle_rate(),
            self.timing.spindle_timer_hz,
            self.machine.spindle_cpr,
        )
    }

    #[inline]
    pub fn fault(&self) -> bool {
        self.fault.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> MotionMode {
        self.with_engine(|e| e.mode)
    }

    pub fn jog_phase(&self) -> JogPhase {
        self.with_engine(|e| e.jog.phase())
    }

    pub fn limits(&self) -> LimitState {
        self.with_engine(|e| e.limits)
    }

    pub fn limit_reached(&self) -> Option<Side> {
        self.with_engine(|e| e.limit_reached)
    }

    /// The published step table.
    pub fn table(&self) -> Arc<StepTable> {
        self.with_engine(|e| Arc::clone(&e.table))
    }

    pub fn catalog(&self) -> FeedCatalog {
        self.with_engine(|e| e.catalog.clone())
    }

    /// Period the pulse timer is armed with, `None` when idle.
    pub fn armed_period(&self) -> Option<u16> {
        self.with_engine(|e| e.timer.armed_period())
    }

    pub fn machine(&self) -> &MachineCfg {
        &self.machine
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    pub fn periods(&self) -> &PeriodTable {
        &self.periods
    }
}
