use els_core::{
    FeedCatalog, FeedMode, FeedSelection, MachineCfg, PeriodTable, Pitch, StepTable, TimingCfg,
};
use proptest::prelude::*;
use rstest::rstest;

fn build(sel: FeedSelection) -> Result<StepTable, els_core::ElsError> {
    StepTable::build(
        sel,
        &MachineCfg::default(),
        &TimingCfg::default(),
        &PeriodTable::default(),
    )
}

fn assert_well_formed(t: &StepTable) {
    let entries = t.entries();
    assert_eq!(entries.len(), 800);
    let sum: u32 = entries.iter().map(|&n| u32::from(n)).sum();
    assert_eq!(sum, t.total(), "revolution must sum to the total");
    let lo = t.total() / 800;
    let hi = t.total().div_ceil(800);
    for &n in entries {
        assert!(u32::from(n) == lo || u32::from(n) == hi);
        assert!(n <= t.max_steps());
    }
    assert!(t.max_steps() <= TimingCfg::default().max_steps_per_tick);
}

#[rstest]
#[case(FeedMode::Inch)]
#[case(FeedMode::Metric)]
#[case(FeedMode::Diametral)]
#[case(FeedMode::Module)]
fn every_catalog_entry_is_well_formed(#[case] mode: FeedMode) {
    let catalog = FeedCatalog::builtin();
    for pitch in catalog.pitches(mode) {
        let t = build(FeedSelection::new(mode, *pitch)).expect("catalog entry builds");
        assert_well_formed(&t);
    }
}

#[rstest]
fn table_reports_its_feed() {
    let sel = FeedSelection::new(FeedMode::Metric, "1.5".parse().unwrap());
    let t = build(sel).unwrap();
    assert_eq!(t.selection(), sel);
    assert_eq!(t.total(), sel.steps_per_rev(&MachineCfg::default()).unwrap());
}

#[rstest]
fn fine_feed_leaves_zero_ticks() {
    // 1000 TPI owes 26 steps per revolution
    let t = build(FeedSelection::new(FeedMode::Inch, Pitch::whole(1000).unwrap())).unwrap();
    assert_eq!(t.total(), 26);
    assert_eq!(t.max_steps(), 1);
    assert_eq!(t.entries().iter().filter(|&&n| n == 1).count(), 26);
    assert_eq!(t.owed(799), 1);
}

prop_compose! {
    fn any_feed()(mode in 0usize..4, num in 1u64..20_000, den_exp in 0u32..4) -> FeedSelection {
        let pitch = Pitch::new(num, 10u64.pow(den_exp)).unwrap();
        FeedSelection::new(FeedMode::ALL[mode], pitch)
    }
}

proptest! {
    #[test]
    fn built_tables_sum_exactly_and_respect_the_ceiling(sel in any_feed()) {
        match build(sel) {
            Ok(t) => {
                let sum: u32 = t.entries().iter().map(|&n| u32::from(n)).sum();
                prop_assert_eq!(sum, t.total());
                prop_assert!(t.entries().iter().all(|&n| n <= t.max_steps()));
                prop_assert!(t.max_steps() >= 1 && t.max_steps() <= 11);
                prop_assert_eq!(t.period(), PeriodTable::default().period_for(t.max_steps()));
            }
            Err(els_core::ElsError::RatioOverflow { max_steps, ceiling }) => {
                prop_assert!(max_steps > u32::from(ceiling));
            }
            Err(els_core::ElsError::InvalidPitch(_)) => {
                // rounds to zero steps per revolution
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }
}
