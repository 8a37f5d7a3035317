//! Quadrature decoding and spindle rate measurement.
//!
//! Phase pairs are treated as a two-bit gray code walked in the order
//! `00 -> 01 -> 11 -> 10 -> 00` for forward rotation. A step of one
//! position either way counts; a same-state repeat or a two-position jump
//! is noise and leaves the decoder untouched.

/// Sampled levels of the A and B phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Phases {
    pub a: bool,
    pub b: bool,
}

impl Phases {
    pub const fn new(a: bool, b: bool) -> Self {
        Self { a, b }
    }

    /// Position of this state in the forward gray sequence.
    #[inline]
    fn gray_index(self) -> u8 {
        match (self.a, self.b) {
            (false, false) => 0,
            (false, true) => 1,
            (true, true) => 2,
            (true, false) => 3,
        }
    }

    #[inline]
    fn from_gray_index(i: u8) -> Self {
        match i & 3 {
            0 => Self::new(false, false),
            1 => Self::new(false, true),
            2 => Self::new(true, true),
            _ => Self::new(true, false),
        }
    }

    /// The phases one legal transition away in the given direction.
    pub fn advance(self, rotation: Rotation) -> Self {
        let i = self.gray_index();
        match rotation {
            Rotation::Forward => Self::from_gray_index(i.wrapping_add(1)),
            Rotation::Reverse => Self::from_gray_index(i.wrapping_add(3)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Forward,
    Reverse,
}

/// Wrapping tick counter fed by phase edges.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    counts_per_rev: u16,
    tick: u16,
    last: Phases,
}

impl QuadratureDecoder {
    pub fn new(counts_per_rev: u16, initial: Phases) -> Self {
        Self {
            counts_per_rev: counts_per_rev.max(1),
            tick: 0,
            last: initial,
        }
    }

    /// Feed the phases sampled on an edge. Returns the rotation when the
    /// transition was legal.
    #[inline]
    pub fn edge(&mut self, phases: Phases) -> Option<Rotation> {
        let delta = phases
            .gray_index()
            .wrapping_sub(self.last.gray_index())
            & 3;
        let rotation = match delta {
            1 => Rotation::Forward,
            3 => Rotation::Reverse,
            _ => return None,
        };
        self.last = phases;
        self.tick = match rotation {
            Rotation::Forward => {
                if self.tick + 1 >= self.counts_per_rev {
                    0
                } else {
                    self.tick + 1
                }
            }
            Rotation::Reverse => {
                if self.tick == 0 {
                    self.counts_per_rev - 1
                } else {
                    self.tick - 1
                }
            }
        };
        Some(rotation)
    }

    #[inline]
    pub fn tick(&self) -> u16 {
        self.tick
    }

    pub fn counts_per_rev(&self) -> u16 {
        self.counts_per_rev
    }

    /// Last accepted phase state.
    pub fn phases(&self) -> Phases {
        self.last
    }
}

/// Rate value meaning the spindle is stopped.
pub const STOPPED: u16 = 0xFFFF;

/// Spindle-timer counts between consecutive ticks.
#[derive(Debug, Clone)]
pub struct RateMeter {
    stopped_counts: u32,
    last: Option<u32>,
    rate: u16,
    turning: bool,
}

impl RateMeter {
    pub fn new(stopped_counts: u32) -> Self {
        Self {
            stopped_counts,
            last: None,
            rate: STOPPED,
            turning: false,
        }
    }

    /// Record a tick at spindle-timer count `now` (free running, wrapping).
    #[inline]
    pub fn record(&mut self, now: u32) -> u16 {
        self.rate = match self.last {
            Some(prev) => {
                let elapsed = now.wrapping_sub(prev);
                if elapsed > self.stopped_counts {
                    STOPPED
                } else {
                    u16::try_from(elapsed).unwrap_or(STOPPED - 1).min(STOPPED - 1)
                }
            }
            None => STOPPED,
        };
        self.last = Some(now);
        self.turning = true;
        self.rate
    }

    /// Background check: no tick for longer than the threshold means stopped.
    /// Returns true when this call changed the rate to the sentinel.
    /// Also the only place `is_turning` is cleared.
    pub fn check_stopped(&mut self, now: u32) -> bool {
        if !self.turning {
            return false;
        }
        match self.last {
            Some(prev) if now.wrapping_sub(prev) > self.stopped_counts => {
                self.turning = false;
                let changed = self.rate != STOPPED;
                self.rate = STOPPED;
                changed
            }
            _ => false,
        }
    }

    /// A tick has arrived since the watchdog last confirmed a stop. Stays
    /// set for a spindle too slow to measure, whose rate reads `STOPPED`.
    #[inline]
    pub fn is_turning(&self) -> bool {
        self.turning
    }

    #[inline]
    pub fn rate(&self) -> u16 {
        self.rate
    }
}
