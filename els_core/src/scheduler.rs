//! Per-tick step bookkeeping for synchronized feed.
//!
//! A spindle tick hands the scheduler the steps it owes. The pulse timer then
//! drains them one per compare event. A tick that finds steps still pending
//! is an overrun: the leftover is discarded rather than carried into the next
//! tick, and the caller latches the fault.

use crate::error::ElsError;

#[derive(Debug, Clone, Default)]
pub struct StepScheduler {
    pending: u8,
    toward_headstock: bool,
}

impl StepScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tick owing `owed` steps.
    #[inline]
    pub fn begin_tick(&mut self, owed: u8, toward_headstock: bool) -> Result<(), ElsError> {
        if self.pending > 0 {
            self.pending = 0;
            return Err(ElsError::OverrunFault);
        }
        self.pending = owed;
        self.toward_headstock = toward_headstock;
        Ok(())
    }

    /// Claim one step for emission. Returns false when the tick is drained.
    #[inline]
    pub fn take(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    #[inline]
    pub fn pending(&self) -> u8 {
        self.pending
    }

    #[inline]
    pub fn toward_headstock(&self) -> bool {
        self.toward_headstock
    }

    /// Drop whatever is left of the current tick.
    #[inline]
    pub fn cancel(&mut self) {
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_owed_steps_then_stops() {
        let mut s = StepScheduler::new();
        s.begin_tick(3, false).unwrap();
        assert!(s.take());
        assert!(s.take());
        assert!(s.take());
        assert!(!s.take());
        s.begin_tick(1, true).unwrap();
        assert!(s.toward_headstock());
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn tick_with_leftover_is_overrun_and_discards() {
        let mut s = StepScheduler::new();
        s.begin_tick(2, false).unwrap();
        assert!(s.take());
        assert_eq!(s.begin_tick(2, false), Err(ElsError::OverrunFault));
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn zero_owed_is_not_pending() {
        let mut s = StepScheduler::new();
        s.begin_tick(0, false).unwrap();
        s.begin_tick(0, false).unwrap();
        assert!(!s.take());
    }
}
