#![no_main]
use els_core::{FeedMode, FeedSelection, MachineCfg, PeriodTable, Pitch, StepTable, TimingCfg};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, &str)| {
    let (mode, text) = input;
    // The config-side check and the parser must agree.
    let parsed = text.parse::<Pitch>();
    if parsed.is_ok() {
        assert!(els_config::is_positive_decimal(text), "{text:?}");
    }
    let Ok(pitch) = parsed else {
        return;
    };
    let mode = FeedMode::ALL[usize::from(mode) % FeedMode::ALL.len()];
    let sel = FeedSelection::new(mode, pitch);
    if let Ok(table) = StepTable::build(
        sel,
        &MachineCfg::default(),
        &TimingCfg::default(),
        &PeriodTable::default(),
    ) {
        let sum: u32 = table.entries().iter().map(|&n| u32::from(n)).sum();
        assert_eq!(sum, table.total());
    }
});
