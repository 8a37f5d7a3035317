use thiserror::Error;

use crate::supervisor::Side;

/// Errors surfaced by the controller's command API and table builders.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ElsError {
    /// Step output fell behind the spindle. Sticky until acknowledged.
    #[error("overrun fault: step output fell behind the spindle")]
    OverrunFault,
    /// Motion toward an enabled limit was refused.
    #[error("{0} limit reached")]
    LimitReached(Side),
    #[error("invalid command: {0}")]
    InvalidCommand(&'static str),
    #[error("ratio overflow: {max_steps} steps per tick exceeds the ceiling of {ceiling}")]
    RatioOverflow { max_steps: u32, ceiling: u8 },
    #[error("invalid pitch: {0}")]
    InvalidPitch(&'static str),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
