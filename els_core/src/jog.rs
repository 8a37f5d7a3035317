//! Jog ramp state machine.
//!
//! Periods are pulse-timer counts: a larger period is slower. A jog starts at
//! `period_max`, shortens by `accel` per emitted pulse down to `period_min`,
//! and on release lengthens again by the same step until it is back at
//! `period_max`, where it stops.

use crate::config::JogCfg;
use crate::error::ElsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JogPhase {
    #[default]
    Idle,
    Accelerating,
    Cruising,
    Decelerating,
}

impl JogPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JogPhase::Idle => "idle",
            JogPhase::Accelerating => "accelerating",
            JogPhase::Cruising => "cruising",
            JogPhase::Decelerating => "decelerating",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JogController {
    cfg: JogCfg,
    phase: JogPhase,
    toward_headstock: bool,
    period: u16,
}

impl JogController {
    pub fn new(cfg: JogCfg) -> Self {
        Self {
            cfg,
            phase: JogPhase::Idle,
            toward_headstock: false,
            period: cfg.period_max,
        }
    }

    /// Begin or resume a jog. Returns the period to arm the timer with.
    ///
    /// Reversal needs a return to Idle first; a press in the same direction
    /// while slowing down ramps back up.
    pub fn start(&mut self, toward_headstock: bool) -> Result<u16, ElsError> {
        match self.phase {
            JogPhase::Idle => {
                self.toward_headstock = toward_headstock;
                self.period = self.cfg.period_max;
                self.phase = JogPhase::Accelerating;
            }
            _ if self.toward_headstock != toward_headstock => {
                return Err(ElsError::InvalidCommand(
                    "jog direction cannot change until the jog has stopped",
                ));
            }
            JogPhase::Decelerating => self.phase = JogPhase::Accelerating,
            JogPhase::Accelerating | JogPhase::Cruising => {}
        }
        Ok(self.period)
    }

    /// Release: ramp down toward a stop.
    pub fn stop(&mut self) {
        if matches!(self.phase, JogPhase::Accelerating | JogPhase::Cruising) {
            self.phase = JogPhase::Decelerating;
        }
    }

    /// Called on each pulse-timer event. `Some(period)` means emit a pulse
    /// now and re-arm with `period`; `None` means the jog has finished.
    #[inline]
    pub fn advance(&mut self) -> Option<u16> {
        match self.phase {
            JogPhase::Idle => None,
            JogPhase::Accelerating => {
                self.period = self
                    .period
                    .saturating_sub(self.cfg.accel)
                    .max(self.cfg.period_min);
                if self.period == self.cfg.period_min {
                    self.phase = JogPhase::Cruising;
                }
                Some(self.period)
            }
            JogPhase::Cruising => Some(self.period),
            JogPhase::Decelerating => {
                if self.period >= self.cfg.period_max {
                    self.phase = JogPhase::Idle;
                    return None;
                }
                self.period = self
                    .period
                    .saturating_add(self.cfg.accel)
                    .min(self.cfg.period_max);
                Some(self.period)
            }
        }
    }

    /// Drop straight to Idle (limit or fault).
    pub fn abort(&mut self) {
        self.phase = JogPhase::Idle;
        self.period = self.cfg.period_max;
    }

    pub fn phase(&self) -> JogPhase {
        self.phase
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn toward_headstock(&self) -> bool {
        self.toward_headstock
    }

    pub fn is_active(&self) -> bool {
        self.phase != JogPhase::Idle
    }
}
