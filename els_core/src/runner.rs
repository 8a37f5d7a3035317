//! Drivers for a built controller: a discrete-event simulation that plays
//! the part of the interrupt hardware, and the background refresh loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use els_traits::clock::Clock;
use els_traits::{PulseTimer, StepOutput};

use crate::controller::Els;
use crate::quadrature::{Phases, Rotation};
use crate::status::{Status, StatusSink};
use crate::supervisor::Side;
use crate::util::{NANOS_PER_SEC, counts_to_ns, ns_to_counts};

/// Outcome of a simulation run.
#[derive(Debug, Clone)]
pub struct SimReport {
    pub ticks: u64,
    pub pulses: u64,
    pub elapsed_ns: u64,
    pub status: Status,
}

/// Virtual-time driver for a controller.
///
/// Spindle edges arrive at the requested speed as a legal quadrature
/// sequence, spindle timestamps are counts of the spindle timer, and pulse
/// compare events fire at whatever period the controller armed. The
/// background service pass runs every `service_interval` of virtual time.
pub struct Simulation<'a, O, T> {
    els: &'a Els<O, T>,
    spindle_hz: u32,
    pulse_hz: u32,
    spindle_cpr: u16,
    now_ns: u64,
    spindle_phases: Phases,
    knob_phases: Phases,
    next_pulse_ns: Option<u64>,
    service_interval_ns: u64,
    next_service_ns: u64,
    sink: Option<&'a mut dyn StatusSink>,
    ticks: u64,
    pulses: u64,
}

impl<'a, O: StepOutput, T: PulseTimer> Simulation<'a, O, T> {
    pub fn new(els: &'a Els<O, T>) -> Self {
        let timing = els.timing();
        Self {
            els,
            spindle_hz: timing.spindle_timer_hz,
            pulse_hz: timing.pulse_timer_hz,
            spindle_cpr: els.machine().spindle_cpr,
            now_ns: 0,
            spindle_phases: Phases::default(),
            knob_phases: Phases::default(),
            next_pulse_ns: None,
            service_interval_ns: 100_000_000,
            next_service_ns: 100_000_000,
            sink: None,
            ticks: 0,
            pulses: 0,
        }
    }

    /// Run the service pass (and publish to `sink`) every `interval`.
    pub fn with_refresh(mut self, interval: Duration, sink: &'a mut dyn StatusSink) -> Self {
        self.service_interval_ns = (interval.as_nanos() as u64).max(1);
        self.next_service_ns = self.now_ns + self.service_interval_ns;
        self.sink = Some(sink);
        self
    }

    fn spindle_counts(&self) -> u32 {
        ns_to_counts(self.now_ns, self.spindle_hz)
    }

    fn resync_timer(&mut self, after_pulse: bool) {
        match self.els.armed_period() {
            None => self.next_pulse_ns = None,
            Some(p) => {
                if after_pulse || self.next_pulse_ns.is_none() {
                    self.next_pulse_ns =
                        Some(self.now_ns + counts_to_ns(u64::from(p), self.pulse_hz).max(1));
                }
            }
        }
    }

    fn service(&mut self) {
        let status = self.els.service(self.spindle_counts());
        if let Some(sink) = self.sink.as_mut() {
            sink.publish(&status);
        }
    }

    /// Process pulse and service events up to `t_ns`, then move the clock there.
    fn advance_to(&mut self, t_ns: u64) {
        loop {
            let pulse_due = self.next_pulse_ns.filter(|at| *at <= t_ns);
            let service_due = (self.next_service_ns <= t_ns).then_some(self.next_service_ns);
            match (pulse_due, service_due) {
                (Some(p), Some(s)) if s < p => {
                    self.now_ns = s;
                    self.next_service_ns += self.service_interval_ns;
                    self.service();
                }
                (Some(p), _) => {
                    self.now_ns = p;
                    let before = self.els.position();
                    self.els.pulse_timer();
                    if self.els.position() != before {
                        self.pulses += 1;
                    }
                    self.resync_timer(true);
                }
                (None, Some(s)) => {
                    self.now_ns = s;
                    self.next_service_ns += self.service_interval_ns;
                    self.service();
                }
                (None, None) => break,
            }
        }
        self.now_ns = t_ns;
    }

    /// Turn the spindle through `ticks` encoder ticks at `rpm`.
    pub fn spin(&mut self, rotation: Rotation, rpm: u32, ticks: u32) {
        let per_min = u64::from(rpm.max(1)) * u64::from(self.spindle_cpr);
        let interval_ns = (60 * NANOS_PER_SEC / per_min).max(1);
        for _ in 0..ticks {
            self.advance_to(self.now_ns + interval_ns);
            self.spindle_phases = self.spindle_phases.advance(rotation);
            if self
                .els
                .spindle_edge(self.spindle_phases, self.spindle_counts())
                .is_some()
            {
                self.ticks += 1;
            }
            self.resync_timer(false);
        }
    }

    /// Turn the manual knob by `counts` decoded counts, `interval` apart.
    pub fn turn_knob(&mut self, rotation: Rotation, counts: u32, interval: Duration) {
        let step = (interval.as_nanos() as u64).max(1);
        for _ in 0..counts {
            self.advance_to(self.now_ns + step);
            self.knob_phases = self.knob_phases.advance(rotation);
            self.els.knob_edge(self.knob_phases);
            self.resync_timer(false);
        }
    }

    /// Press a direction switch at the current virtual time.
    pub fn press(&mut self, side: Side) -> Result<bool, crate::error::ElsError> {
        self.els.direction_switch(side, self.spindle_counts())
    }

    /// Let time pass with no encoder activity.
    pub fn dwell(&mut self, d: Duration) {
        let t = self.now_ns + d.as_nanos() as u64;
        self.advance_to(t);
    }

    /// Re-check the pulse timer after a command issued outside the simulation.
    pub fn poll(&mut self) {
        self.resync_timer(false);
    }

    /// Run until the pulse timer goes idle or `limit` of virtual time passes.
    /// Returns true when the timer went idle.
    pub fn settle(&mut self, limit: Duration) -> bool {
        self.resync_timer(false);
        let deadline = self.now_ns + limit.as_nanos() as u64;
        while let Some(at) = self.next_pulse_ns {
            if at > deadline {
                self.advance_to(deadline);
                return false;
            }
            self.advance_to(at);
        }
        true
    }

    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    pub fn report(&mut self) -> SimReport {
        let status = self.els.service(self.spindle_counts());
        SimReport {
            ticks: self.ticks,
            pulses: self.pulses,
            elapsed_ns: self.now_ns,
            status,
        }
    }
}

/// Background display loop: service the controller and publish a status
/// snapshot every `refresh` until `stop` is raised. `spindle_counts` reads
/// the free-running spindle timer. Returns the number of refreshes.
pub fn refresh_loop<O, T, S, C>(
    els: &Els<O, T>,
    sink: &mut S,
    clock: &C,
    refresh: Duration,
    stop: &AtomicBool,
    spindle_counts: impl Fn() -> u32,
) -> u64
where
    O: StepOutput,
    T: PulseTimer,
    S: StatusSink + ?Sized,
    C: Clock + ?Sized,
{
    let mut refreshes = 0u64;
    tracing::debug!(refresh_ms = refresh.as_millis() as u64, "status refresh start");
    while !stop.load(Ordering::Relaxed) {
        let status = els.service(spindle_counts());
        sink.publish(&status);
        refreshes += 1;
        clock.pause(refresh);
    }
    tracing::debug!(refreshes, "status refresh stop");
    refreshes
}
