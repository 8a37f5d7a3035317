//! Feed selection and the per-tick step table.
//!
//! A feed is a mode plus an exact rational pitch. The table spreads the
//! integer steps owed per spindle revolution over the encoder ticks with a
//! Bresenham distribution, so every entry is the floor or the ceiling of
//! `total / SCPR` and one revolution always sums to `total`.

use core::fmt;
use core::str::FromStr;

use crate::config::{MachineCfg, TimingCfg};
use crate::error::ElsError;
use crate::fixed_point::{
    MM_PER_INCH_DEN, MM_PER_INCH_NUM, PI_DEN, PI_NUM, div_ceil, div_round_half_up, gcd,
    parse_decimal,
};
use crate::period::PeriodTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedMode {
    /// Threads per inch.
    Inch,
    /// Pitch in millimetres.
    Metric,
    /// Diametral pitch (worm lead is pi / DP inch).
    Diametral,
    /// Module in millimetres (worm lead is pi * m mm).
    Module,
}

impl FeedMode {
    pub const ALL: [FeedMode; 4] = [
        FeedMode::Inch,
        FeedMode::Metric,
        FeedMode::Diametral,
        FeedMode::Module,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            FeedMode::Inch => 0,
            FeedMode::Metric => 1,
            FeedMode::Diametral => 2,
            FeedMode::Module => 3,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            FeedMode::Inch => "tpi",
            FeedMode::Metric => "mm",
            FeedMode::Diametral => "dp",
            FeedMode::Module => "mod",
        }
    }
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeedMode::Inch => "inch",
            FeedMode::Metric => "metric",
            FeedMode::Diametral => "diametral",
            FeedMode::Module => "module",
        })
    }
}

impl FromStr for FeedMode {
    type Err = ElsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inch" | "tpi" => Ok(FeedMode::Inch),
            "metric" | "mm" => Ok(FeedMode::Metric),
            "diametral" | "dp" => Ok(FeedMode::Diametral),
            "module" | "mod" => Ok(FeedMode::Module),
            _ => Err(ElsError::InvalidCommand("unknown feed mode")),
        }
    }
}

/// Positive rational pitch value, always reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    num: u64,
    den: u64,
}

impl Pitch {
    pub fn new(num: u64, den: u64) -> Result<Self, ElsError> {
        if num == 0 || den == 0 {
            return Err(ElsError::InvalidPitch("pitch must be a positive ratio"));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn whole(n: u32) -> Result<Self, ElsError> {
        Self::new(u64::from(n), 1)
    }

    #[inline]
    pub fn numer(&self) -> u64 {
        self.num
    }

    #[inline]
    pub fn denom(&self) -> u64 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl FromStr for Pitch {
    type Err = ElsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = parse_decimal(s)
            .ok_or(ElsError::InvalidPitch("expected a positive decimal like 11.5"))?;
        Self::new(num, den)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}", self.as_f64())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedSelection {
    pub mode: FeedMode,
    pub pitch: Pitch,
}

impl FeedSelection {
    pub fn new(mode: FeedMode, pitch: Pitch) -> Self {
        Self { mode, pitch }
    }

    /// Lead per spindle revolution in inches, as a fraction.
    fn lead_inch(&self) -> Option<(u64, u64)> {
        let (n, d) = (self.pitch.num, self.pitch.den);
        match self.mode {
            FeedMode::Inch => Some((d, n)),
            FeedMode::Metric => Some((
                n.checked_mul(MM_PER_INCH_DEN)?,
                d.checked_mul(MM_PER_INCH_NUM)?,
            )),
            FeedMode::Diametral => Some((PI_NUM.checked_mul(d)?, PI_DEN.checked_mul(n)?)),
            FeedMode::Module => Some((
                PI_NUM.checked_mul(MM_PER_INCH_DEN)?.checked_mul(n)?,
                PI_DEN.checked_mul(MM_PER_INCH_NUM)?.checked_mul(d)?,
            )),
        }
    }

    /// Integer steps owed per spindle revolution, rounded half-up.
    pub fn steps_per_rev(&self, machine: &MachineCfg) -> Result<u32, ElsError> {
        const OUT_OF_RANGE: ElsError = ElsError::InvalidPitch("pitch out of range");
        let (num, den) = self.lead_inch().ok_or(OUT_OF_RANGE)?;
        let scaled = machine.steps_per_inch().checked_mul(num).ok_or(OUT_OF_RANGE)?;
        let total = div_round_half_up(scaled, den).ok_or(OUT_OF_RANGE)?;
        if total == 0 {
            return Err(ElsError::InvalidPitch("feed rounds to zero steps per revolution"));
        }
        u32::try_from(total).map_err(|_| OUT_OF_RANGE)
    }
}

impl Default for FeedSelection {
    /// 8 TPI: the leadscrew turns once per spindle revolution.
    fn default() -> Self {
        Self {
            mode: FeedMode::Inch,
            pitch: Pitch { num: 8, den: 1 },
        }
    }
}

impl fmt::Display for FeedSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.mode, self.pitch, self.mode.unit())
    }
}

/// Immutable per-tick step table for one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTable {
    selection: FeedSelection,
    owed: Vec<u8>,
    total: u32,
    max_steps: u8,
    period: u16,
    rpm_ceiling: u16,
}

impl StepTable {
    /// Build the table for `selection`. Nothing is shared until the caller
    /// publishes the result.
    pub fn build(
        selection: FeedSelection,
        machine: &MachineCfg,
        timing: &TimingCfg,
        periods: &PeriodTable,
    ) -> Result<Self, ElsError> {
        let total = selection.steps_per_rev(machine)?;
        let cpr = u64::from(machine.spindle_cpr);
        let max = div_ceil(u64::from(total), cpr);
        if max > u64::from(timing.max_steps_per_tick) {
            return Err(ElsError::RatioOverflow {
                max_steps: u32::try_from(max).unwrap_or(u32::MAX),
                ceiling: timing.max_steps_per_tick,
            });
        }
        let total64 = u64::from(total);
        let owed: Vec<u8> = (0..cpr)
            .map(|i| ((i + 1) * total64 / cpr - i * total64 / cpr) as u8)
            .collect();
        let max_steps = max as u8;
        Ok(Self {
            selection,
            owed,
            total,
            max_steps,
            period: periods.period_for(max_steps),
            rpm_ceiling: periods.rpm_ceiling(max_steps),
        })
    }

    /// Steps owed for the tick at `index`.
    #[inline]
    pub fn owed(&self, index: u16) -> u8 {
        self.owed.get(usize::from(index)).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> &[u8] {
        &self.owed
    }

    pub fn selection(&self) -> FeedSelection {
        self.selection
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn max_steps(&self) -> u8 {
        self.max_steps
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn rpm_ceiling(&self) -> u16 {
        self.rpm_ceiling
    }
}
