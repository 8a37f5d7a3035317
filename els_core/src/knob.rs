//! Manual handwheel nudges while the feed is disengaged.

use crate::config::KnobCfg;
use crate::quadrature::Rotation;

#[derive(Debug, Clone)]
pub struct KnobNudge {
    cfg: KnobCfg,
    queued: u16,
    toward_headstock: bool,
}

impl KnobNudge {
    pub fn new(cfg: KnobCfg) -> Self {
        Self {
            cfg,
            queued: 0,
            toward_headstock: false,
        }
    }

    /// Queue the pulses for one decoded knob count. Forward rotation moves
    /// away from the headstock. A count against the queued direction drops
    /// the backlog first. Returns true when the direction changed.
    pub fn request(&mut self, rotation: Rotation) -> bool {
        let toward = rotation == Rotation::Reverse;
        let changed = toward != self.toward_headstock;
        if changed {
            self.queued = 0;
            self.toward_headstock = toward;
        }
        self.queued = self
            .queued
            .saturating_add(self.cfg.pulses_per_count)
            .min(self.cfg.max_queued);
        changed
    }

    /// Claim one queued pulse.
    #[inline]
    pub fn take(&mut self) -> bool {
        if self.queued == 0 {
            return false;
        }
        self.queued -= 1;
        true
    }

    pub fn cancel(&mut self) {
        self.queued = 0;
    }

    pub fn queued(&self) -> u16 {
        self.queued
    }

    pub fn toward_headstock(&self) -> bool {
        self.toward_headstock
    }

    pub fn period(&self) -> u16 {
        self.cfg.period
    }
}
