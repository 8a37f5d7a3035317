//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use els_core::{FeedMode, Side};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "els", version, about = "Electronic leadscrew controller")]
pub struct Cli {
    /// Path to config TOML; stock machine when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pitch catalog CSV (strict header `mode,pitch`)
    #[arg(long, value_name = "FILE")]
    pub pitches: Option<PathBuf>,

    /// Print results and logs as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    Inch,
    Metric,
    Diametral,
    Module,
}

impl From<ModeArg> for FeedMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Inch => FeedMode::Inch,
            ModeArg::Metric => FeedMode::Metric,
            ModeArg::Diametral => FeedMode::Diametral,
            ModeArg::Module => FeedMode::Module,
        }
    }
}

impl From<ModeArg> for els_config::FeedModeName {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Inch => els_config::FeedModeName::Inch,
            ModeArg::Metric => els_config::FeedModeName::Metric,
            ModeArg::Diametral => els_config::FeedModeName::Diametral,
            ModeArg::Module => els_config::FeedModeName::Module,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SideArg {
    /// Toward the headstock
    Left,
    /// Away from the headstock
    Right,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

/// Feed selection shared by the commands that take one.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FeedArgs {
    /// Feed mode; defaults to `[feeds] mode`
    #[arg(long = "mode", value_enum, value_name = "MODE")]
    pub mode: Option<ModeArg>,
    /// Pitch in the mode's unit (TPI, mm, DP or module), e.g. 11.5
    #[arg(long, value_name = "PITCH")]
    pub pitch: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow a simulated spindle for a number of revolutions
    Simulate {
        #[command(flatten)]
        feed: FeedArgs,
        /// Spindle speed
        #[arg(long, default_value_t = 300)]
        rpm: u32,
        /// Spindle revolutions to run
        #[arg(long, default_value_t = 1)]
        revs: u32,
        /// Turn the spindle in reverse
        #[arg(long, action = ArgAction::SetTrue)]
        reverse: bool,
        /// Feed direction selected on the switches before starting
        #[arg(long, value_enum, default_value = "left")]
        toward: SideArg,
        /// Print a status line every `[status] refresh_ms` of simulated time
        #[arg(long, action = ArgAction::SetTrue)]
        follow: bool,
    },
    /// Show the per-tick step table for a feed
    Table {
        #[command(flatten)]
        feed: FeedArgs,
        /// Print every tick's owed steps
        #[arg(long, action = ArgAction::SetTrue)]
        entries: bool,
    },
    /// List every catalog feed with its steps per revolution and safe speed
    Feeds {
        /// Only this mode
        #[arg(long = "mode", value_enum, value_name = "MODE")]
        mode: Option<ModeArg>,
    },
    /// Hold a jog button for a while, release it and let the ramp finish
    Jog {
        #[arg(long, value_enum)]
        side: SideArg,
        /// How long the button is held
        #[arg(long, value_name = "MS", default_value_t = 500)]
        hold_ms: u64,
    },
    /// Quick health check: table build, sync round trip, outputs
    SelfCheck,
}
