//! Hardware seams for the electronic leadscrew.
//!
//! Everything on the interrupt path is infallible: pins and timer are
//! claimed before a controller owns a `StepOutput` or `PulseTimer`.
pub mod clock;

pub use clock::Clock;

/// Step and direction lines of the stepper driver.
pub trait StepOutput {
    /// Drive the DIR line. `toward_headstock` means the carriage moves toward
    /// the headstock, i.e. leadscrew position counts down.
    fn set_direction(&mut self, toward_headstock: bool);

    /// Emit one complete step pulse, holding PUL active for at least the
    /// driver's minimum pulse width before releasing it.
    fn pulse(&mut self);
}

/// Compare-match timer that paces step pulses.
///
/// Periods are in pulse-timer counts. While armed, the platform calls the
/// controller's pulse handler once per period.
pub trait PulseTimer {
    fn arm(&mut self, period: u16);
    fn disarm(&mut self);
    /// Currently armed period, `None` when stopped.
    fn armed_period(&self) -> Option<u16>;
}

impl<O: StepOutput + ?Sized> StepOutput for Box<O> {
    fn set_direction(&mut self, toward_headstock: bool) {
        (**self).set_direction(toward_headstock);
    }

    fn pulse(&mut self) {
        (**self).pulse();
    }
}

impl<T: PulseTimer + ?Sized> PulseTimer for Box<T> {
    fn arm(&mut self, period: u16) {
        (**self).arm(period);
    }

    fn disarm(&mut self) {
        (**self).disarm();
    }

    fn armed_period(&self) -> Option<u16> {
        (**self).armed_period()
    }
}
