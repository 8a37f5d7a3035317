//! Per-mode pitch catalogs offered to the operator.

use crate::error::ElsError;
use crate::ratio::{FeedMode, FeedSelection, Pitch};

const INCH: &[&str] = &[
    "4", "4.5", "5", "6", "7", "8", "9", "10", "11", "11.5", "12", "13", "14", "16", "18", "19",
    "20", "24", "26", "27", "28", "32", "36", "40", "44", "48", "56", "60", "64", "72", "80",
    "100", "200", "250", "500", "1000",
];

const METRIC: &[&str] = &[
    "0.2", "0.25", "0.3", "0.35", "0.4", "0.45", "0.5", "0.6", "0.7", "0.75", "0.8", "1", "1.25",
    "1.5", "1.75", "2", "2.5", "3", "3.5", "4", "4.5", "5", "5.5", "6",
];

const DIAMETRAL: &[&str] = &[
    "10", "12", "14", "16", "18", "20", "22", "24", "26", "28", "30", "32", "36", "40", "44", "48",
    "56", "64", "72", "80", "96", "120",
];

const MODULE: &[&str] = &[
    "0.2", "0.25", "0.3", "0.4", "0.5", "0.6", "0.7", "0.75", "0.8", "1", "1.25", "1.5", "1.75",
    "2", "2.25", "2.5",
];

/// Pitch lists indexed by feed mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCatalog {
    lists: [Vec<Pitch>; 4],
}

fn parse_list(src: &[&str]) -> Vec<Pitch> {
    src.iter().filter_map(|s| s.parse().ok()).collect()
}

impl FeedCatalog {
    /// Stock lists: common threads and feeds that stay within the stock
    /// eleven steps per tick.
    pub fn builtin() -> Self {
        Self {
            lists: [
                parse_list(INCH),
                parse_list(METRIC),
                parse_list(DIAMETRAL),
                parse_list(MODULE),
            ],
        }
    }

    /// Replace the list for one mode.
    pub fn with_list(mut self, mode: FeedMode, pitches: Vec<Pitch>) -> Result<Self, ElsError> {
        if pitches.is_empty() {
            return Err(ElsError::InvalidPitch("pitch list must not be empty"));
        }
        self.lists[mode.index()] = pitches;
        Ok(self)
    }

    pub fn pitches(&self, mode: FeedMode) -> &[Pitch] {
        &self.lists[mode.index()]
    }

    pub fn get(&self, mode: FeedMode, index: usize) -> Option<FeedSelection> {
        self.pitches(mode)
            .get(index)
            .map(|p| FeedSelection::new(mode, *p))
    }

    pub fn position(&self, selection: &FeedSelection) -> Option<usize> {
        self.pitches(selection.mode)
            .iter()
            .position(|p| *p == selection.pitch)
    }

    /// All selections, mode by mode.
    pub fn iter(&self) -> impl Iterator<Item = FeedSelection> + '_ {
        FeedMode::ALL.into_iter().flat_map(move |m| {
            self.pitches(m)
                .iter()
                .map(move |p| FeedSelection::new(m, *p))
        })
    }
}

impl Default for FeedCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MachineCfg, TimingCfg};
    use crate::period::PeriodTable;
    use crate::ratio::StepTable;

    #[test]
    fn builtin_parses_every_entry() {
        let c = FeedCatalog::builtin();
        assert_eq!(c.pitches(FeedMode::Inch).len(), INCH.len());
        assert_eq!(c.pitches(FeedMode::Metric).len(), METRIC.len());
        assert_eq!(c.pitches(FeedMode::Diametral).len(), DIAMETRAL.len());
        assert_eq!(c.pitches(FeedMode::Module).len(), MODULE.len());
    }

    #[test]
    fn builtin_entries_fit_stock_ceiling() {
        let (m, t, p) = (
            MachineCfg::default(),
            TimingCfg::default(),
            PeriodTable::default(),
        );
        for sel in FeedCatalog::builtin().iter() {
            let table = StepTable::build(sel, &m, &t, &p);
            assert!(table.is_ok(), "{sel}: {table:?}");
        }
    }

    #[test]
    fn position_finds_default_thread() {
        let c = FeedCatalog::builtin();
        let eight = FeedSelection::new(FeedMode::Inch, Pitch::whole(8).unwrap());
        let idx = c.position(&eight).unwrap();
        assert_eq!(c.get(FeedMode::Inch, idx), Some(eight));
        assert_eq!(c.get(FeedMode::Inch, 999), None);
    }

    #[test]
    fn empty_override_rejected() {
        assert!(FeedCatalog::builtin().with_list(FeedMode::Metric, vec![]).is_err());
    }
}
