#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also convert into a period table and catalog.
    let Ok(cfg) = els_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let _ = els_core::conversions::period_table(&cfg);
    if let Ok(catalog) = els_core::conversions::feed_catalog(&cfg.feeds, &[]) {
        let _ = els_core::conversions::initial_feed(&cfg.feeds, &catalog);
    }
});
