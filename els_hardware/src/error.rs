use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pin {0} is assigned twice")]
    PinConflict(u8),
    #[error("pulse width {width_ns} ns does not fit in the minimum step period {period_ns} ns")]
    PulseTiming { width_ns: u64, period_ns: u64 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
