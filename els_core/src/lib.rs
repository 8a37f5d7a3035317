#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Electronic leadscrew synchronization engine (hardware-agnostic).
//!
//! This crate locks stepper pulses to spindle rotation. All hardware
//! interactions go through `els_traits::StepOutput` and
//! `els_traits::PulseTimer`; interrupt sources call the controller's
//! handlers directly.
//!
//! ## Architecture
//!
//! - **Ratio tables**: integer steps owed per spindle tick for a feed (`ratio`)
//! - **Period table**: pulse period per steps-per-tick bucket (`period`)
//! - **Quadrature**: spindle and knob decoding, spindle rate (`quadrature`)
//! - **Scheduling**: per-tick step bookkeeping and overrun detection (`scheduler`)
//! - **Jog / knob**: ramped jogging and handwheel nudges (`jog`, `knob`)
//! - **Supervision**: travel limits and feed direction (`supervisor`)
//! - **Controller**: the shared state and command API (`controller`)
//!
//! ## Units
//!
//! Positions are stepper microsteps. Step periods are pulse-timer counts
//! (2 MHz stock) and spindle timestamps are spindle-timer counts (16 MHz
//! stock). Feed ratios stay exact rationals until the per-revolution total
//! is rounded once.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod fixed_point;
pub mod jog;
pub mod knob;
pub mod mocks;
pub mod period;
pub mod quadrature;
pub mod ratio;
pub mod runner;
pub mod scheduler;
pub mod status;
pub mod supervisor;
pub mod util;

pub use builder::{ElsBuilder, Missing, build_els};
pub use catalog::FeedCatalog;
pub use config::{InputCfg, JogCfg, KnobCfg, MachineCfg, TimingCfg};
pub use controller::Els;
pub use error::{BuildError, ElsError, Result};
pub use jog::JogPhase;
pub use period::PeriodTable;
pub use quadrature::{Phases, Rotation, STOPPED};
pub use ratio::{FeedMode, FeedSelection, Pitch, StepTable};
pub use runner::{SimReport, Simulation, refresh_loop};
pub use status::{MotionMode, Status, StatusMonitor, StatusSink};
pub use supervisor::{DirectionState, LimitState, Side};
