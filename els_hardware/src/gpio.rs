//! Stepper driver PUL/DIR lines on Raspberry Pi GPIO.

use std::time::Duration;

use els_traits::StepOutput;
use rppal::gpio::{Gpio, OutputPin};

use crate::error::{HwError, Result};
use crate::util::{check_pulse_timing, spin_for};

/// Pin assignment and electrical polarity of the stepper driver inputs.
#[derive(Debug, Clone, Copy)]
pub struct StepperPins {
    pub pul: u8,
    pub dir: u8,
    /// PUL and DIR are asserted by pulling the line low.
    pub active_low: bool,
}

pub struct GpioStepper {
    pul: OutputPin,
    dir: OutputPin,
    active_low: bool,
    pulse_width: Duration,
}

impl GpioStepper {
    /// Claim the pins and park PUL released. `min_period` is the shortest
    /// step period the controller will ever arm.
    pub fn new(pins: StepperPins, pulse_width: Duration, min_period: Duration) -> Result<Self> {
        if pins.pul == pins.dir {
            return Err(HwError::PinConflict(pins.pul));
        }
        check_pulse_timing(pulse_width, min_period)?;
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let claim = |pin: u8| -> Result<OutputPin> {
            gpio.get(pin)
                .map(|p| p.into_output())
                .map_err(|e| HwError::Gpio(format!("open pin {pin}: {e}")))
        };
        let mut stepper = Self {
            pul: claim(pins.pul)?,
            dir: claim(pins.dir)?,
            active_low: pins.active_low,
            pulse_width,
        };
        stepper.write(false, true);
        tracing::info!(
            pul = pins.pul,
            dir = pins.dir,
            active_low = pins.active_low,
            pulse_width_ns = pulse_width.as_nanos() as u64,
            "stepper outputs claimed"
        );
        Ok(stepper)
    }

    /// Drive PUL (`pul = true`) or DIR with the logical level `asserted`.
    #[inline]
    fn write(&mut self, asserted: bool, pul: bool) {
        let high = asserted != self.active_low;
        let line = if pul { &mut self.pul } else { &mut self.dir };
        if high {
            line.set_high();
        } else {
            line.set_low();
        }
    }
}

impl StepOutput for GpioStepper {
    #[inline]
    fn set_direction(&mut self, toward_headstock: bool) {
        self.write(toward_headstock, false);
    }

    #[inline]
    fn pulse(&mut self) {
        self.write(true, true);
        spin_for(self.pulse_width);
        self.write(false, true);
    }
}

impl Drop for GpioStepper {
    fn drop(&mut self) {
        self.write(false, true);
    }
}
