//! Step period per steps-per-tick bucket.
//!
//! Bucket `k` (zero based) serves feeds owing at most `k + 1` steps per tick.
//! Each bucket carries the spindle speed up to which that many pulses still
//! fit between ticks, and the pulse period used for the feed. The period is
//! chosen once per table build, never per tick.

use crate::config::{MachineCfg, TimingCfg};
use crate::error::BuildError;
use crate::util::tick_interval_counts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodTable {
    rpm: Vec<u16>,
    periods: Vec<u16>,
}

impl PeriodTable {
    /// Use an empirically tuned period list.
    pub fn tuned(
        rpm_table: Vec<u16>,
        period_list: Vec<u16>,
        timing: &TimingCfg,
    ) -> Result<Self, BuildError> {
        if rpm_table.is_empty() {
            return Err(BuildError::InvalidConfig("rpm table must not be empty"));
        }
        if rpm_table.len() != period_list.len() {
            return Err(BuildError::InvalidConfig(
                "period list must have one entry per rpm table entry",
            ));
        }
        if rpm_table.contains(&0) {
            return Err(BuildError::InvalidConfig("rpm table entries must be > 0"));
        }
        if period_list
            .iter()
            .any(|p| *p < timing.step_period_min || *p <= timing.pulse_width_min)
        {
            return Err(BuildError::InvalidConfig(
                "step periods must be >= step_period_min and > pulse_width_min",
            ));
        }
        Ok(Self {
            rpm: rpm_table,
            periods: period_list,
        })
    }

    /// Derive periods so that `k + 1` pulses occupy at most `headroom_pct`
    /// of the tick interval at the bucket's rpm ceiling.
    pub fn derived(
        rpm_table: Vec<u16>,
        headroom_pct: u8,
        machine: &MachineCfg,
        timing: &TimingCfg,
    ) -> Result<Self, BuildError> {
        if !(1..=100).contains(&headroom_pct) {
            return Err(BuildError::InvalidConfig("headroom_pct must be in [1, 100]"));
        }
        if rpm_table.is_empty() || rpm_table.contains(&0) {
            return Err(BuildError::InvalidConfig(
                "rpm table must be non-empty with entries > 0",
            ));
        }
        let floor = timing.step_period_min.max(timing.pulse_width_min + 1);
        let periods = rpm_table
            .iter()
            .enumerate()
            .map(|(k, rpm)| {
                let interval = u64::from(tick_interval_counts(
                    *rpm,
                    timing.pulse_timer_hz,
                    machine.spindle_cpr,
                ));
                let p = interval * u64::from(headroom_pct) / 100 / (k as u64 + 1);
                u16::try_from(p).unwrap_or(u16::MAX).max(floor)
            })
            .collect();
        Ok(Self {
            rpm: rpm_table,
            periods,
        })
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    #[inline]
    fn bucket(&self, max_steps: u8) -> usize {
        usize::from(max_steps.saturating_sub(1)).min(self.periods.len().saturating_sub(1))
    }

    /// Pulse period for a feed owing at most `max_steps` per tick.
    pub fn period_for(&self, max_steps: u8) -> u16 {
        self.periods[self.bucket(max_steps)]
    }

    /// Spindle speed above which `max_steps` pulses no longer fit a tick.
    pub fn rpm_ceiling(&self, max_steps: u8) -> u16 {
        self.rpm[self.bucket(max_steps)]
    }

    /// `(rpm_ceiling, period)` per bucket.
    pub fn entries(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.rpm.iter().copied().zip(self.periods.iter().copied())
    }
}

impl Default for PeriodTable {
    fn default() -> Self {
        Self {
            rpm: vec![1450, 780, 620, 420, 334, 244, 179, 131, 104, 70, 56, 30],
            periods: vec![60, 60, 60, 60, 60, 60, 60, 60, 83, 104, 155, 194],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 60, 1450)]
    #[case(8, 60, 131)]
    #[case(9, 83, 104)]
    #[case(11, 155, 56)]
    #[case(12, 194, 30)]
    #[case(40, 194, 30)]
    fn stock_buckets(#[case] max_steps: u8, #[case] period: u16, #[case] rpm: u16) {
        let t = PeriodTable::default();
        assert_eq!(t.period_for(max_steps), period);
        assert_eq!(t.rpm_ceiling(max_steps), rpm);
    }

    #[test]
    fn stock_list_passes_tuned_validation() {
        let d = PeriodTable::default();
        let (rpm, periods): (Vec<u16>, Vec<u16>) = d.entries().unzip();
        let t = PeriodTable::tuned(rpm, periods, &TimingCfg::default()).unwrap();
        assert_eq!(t, d);
    }

    #[test]
    fn tuned_rejects_period_below_floor() {
        let err = PeriodTable::tuned(vec![100], vec![59], &TimingCfg::default()).unwrap_err();
        assert!(format!("{err}").contains("step_period_min"));
    }

    #[test]
    fn tuned_rejects_length_mismatch() {
        assert!(PeriodTable::tuned(vec![100, 50], vec![60], &TimingCfg::default()).is_err());
    }

    #[test]
    fn derived_pulses_fit_inside_a_tick() {
        let machine = MachineCfg::default();
        let timing = TimingCfg::default();
        let t = PeriodTable::derived(PeriodTable::default().rpm.clone(), 80, &machine, &timing)
            .unwrap();
        for (k, (rpm, period)) in t.entries().enumerate() {
            assert!(period >= timing.step_period_min);
            let interval = tick_interval_counts(rpm, timing.pulse_timer_hz, machine.spindle_cpr);
            let needed = u32::from(period) * (k as u32 + 1);
            // the floor may exceed the budget at the very top speed bucket
            if period > timing.step_period_min {
                assert!(needed <= interval, "bucket {k}: {needed} > {interval}");
            }
        }
    }
}
