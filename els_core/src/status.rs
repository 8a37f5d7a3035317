//! Status snapshots for the display surface and transition logging.

use crate::jog::JogPhase;
use crate::ratio::FeedSelection;
use crate::supervisor::{DirectionState, LimitState, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionMode {
    /// Leadscrew locked to the spindle.
    #[default]
    Synced,
    /// Jog ramp drives the leadscrew; spindle ticks are ignored.
    Jog,
    /// Nothing drives the leadscrew except knob nudges.
    Disengaged,
}

impl MotionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MotionMode::Synced => "synced",
            MotionMode::Jog => "jog",
            MotionMode::Disengaged => "disengaged",
        }
    }
}

/// Consistent snapshot of controller state, taken in one critical section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub position: i32,
    pub spindle_tick: u16,
    /// Spindle-timer counts per tick, `0xFFFF` when stopped.
    pub spindle_rate: u16,
    pub spindle_rpm: Option<u32>,
    pub fault: bool,
    /// Overruns seen since power-up.
    pub overruns: u32,
    pub limit_reached: Option<Side>,
    pub limits: LimitState,
    pub mode: MotionMode,
    pub jog: JogPhase,
    pub feed: FeedSelection,
    pub steps_per_rev: u32,
    pub max_steps: u8,
    pub period: u16,
    pub rpm_ceiling: u16,
    /// Spindle faster than the active feed's ceiling.
    pub over_speed: bool,
    pub direction: DirectionState,
    pub feeding_in: bool,
    pub knob_queued: u16,
}

/// Display seam: receives a status snapshot on every refresh.
pub trait StatusSink {
    fn publish(&mut self, status: &Status);
}

impl<F: FnMut(&Status)> StatusSink for F {
    fn publish(&mut self, status: &Status) {
        self(status)
    }
}

/// Logs transitions between consecutive snapshots.
#[derive(Debug, Default)]
pub struct StatusMonitor {
    last: Option<Status>,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, now: &Status) {
        let Some(prev) = self.last.replace(now.clone()) else {
            tracing::info!(
                feed = %now.feed,
                steps_per_rev = now.steps_per_rev,
                mode = now.mode.as_str(),
                "controller online"
            );
            return;
        };
        if now.fault && (!prev.fault || now.overruns != prev.overruns) {
            tracing::error!(
                position = now.position,
                tick = now.spindle_tick,
                overruns = now.overruns,
                "overrun fault latched; motion halted until acknowledged"
            );
        } else if prev.fault && !now.fault {
            tracing::info!("fault acknowledged");
        }
        if now.limit_reached != prev.limit_reached
            && let Some(side) = now.limit_reached
        {
            tracing::warn!(side = %side, position = now.position, "limit reached");
        }
        if now.over_speed && !prev.over_speed {
            tracing::warn!(
                rpm = now.spindle_rpm,
                ceiling = now.rpm_ceiling,
                feed = %now.feed,
                "spindle above the safe speed for this feed"
            );
        }
        if now.mode != prev.mode {
            tracing::info!(from = prev.mode.as_str(), to = now.mode.as_str(), "motion mode");
        }
        if now.feed != prev.feed {
            tracing::info!(feed = %now.feed, steps_per_rev = now.steps_per_rev, "feed changed");
        }
        if now.direction.feed_in != prev.direction.feed_in {
            tracing::info!(
                toward_headstock = now.direction.feed_in,
                "feed direction selected"
            );
        }
        if now.limits != prev.limits {
            tracing::info!(left = ?now.limits.left, right = ?now.limits.right, "limits changed");
        }
        if now.jog != prev.jog {
            tracing::debug!(phase = now.jog.as_str(), position = now.position, "jog");
        }
        if (now.spindle_rpm.is_none()) != (prev.spindle_rpm.is_none()) {
            tracing::debug!(rpm = now.spindle_rpm, "spindle");
        }
    }

    pub fn last(&self) -> Option<&Status> {
        self.last.as_ref()
    }
}
