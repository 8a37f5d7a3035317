//! `From` implementations bridging `els_config` types to `els_core` types,
//! plus the fallible conversions for tables and catalogs.

use crate::catalog::FeedCatalog;
use crate::config::{InputCfg, JogCfg, KnobCfg, MachineCfg, TimingCfg};
use crate::error::Result;
use crate::period::PeriodTable;
use crate::ratio::{FeedMode, FeedSelection, Pitch};
use eyre::WrapErr;

// ── MachineCfg ───────────────────────────────────────────────────────────────

impl From<&els_config::Machine> for MachineCfg {
    fn from(c: &els_config::Machine) -> Self {
        Self {
            spindle_cpr: c.spindle_cpr,
            leadscrew_tpi: c.leadscrew_tpi,
            microsteps: c.microsteps,
            step_ratio: c.step_ratio,
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&els_config::Timing> for TimingCfg {
    fn from(c: &els_config::Timing) -> Self {
        Self {
            step_period_min: c.step_period_min,
            pulse_width_min: c.pulse_width_min,
            spindle_timer_hz: c.spindle_timer_hz,
            pulse_timer_hz: c.pulse_timer_hz,
            stopped_counts: c.stopped_counts,
            max_steps_per_tick: c.max_steps_per_tick,
        }
    }
}

// ── JogCfg / KnobCfg / InputCfg ──────────────────────────────────────────────

impl From<&els_config::Jog> for JogCfg {
    fn from(c: &els_config::Jog) -> Self {
        Self {
            period_max: c.period_max,
            period_min: c.period_min,
            accel: c.accel,
        }
    }
}

impl From<&els_config::Knob> for KnobCfg {
    fn from(c: &els_config::Knob) -> Self {
        Self {
            counts_per_rev: c.counts_per_rev,
            pulses_per_count: c.pulses_per_count,
            period: c.period,
            max_queued: c.max_queued,
        }
    }
}

impl From<&els_config::Inputs> for InputCfg {
    fn from(c: &els_config::Inputs) -> Self {
        Self {
            debounce_counts: c.debounce_counts,
        }
    }
}

// ── FeedMode ─────────────────────────────────────────────────────────────────

impl From<els_config::FeedModeName> for FeedMode {
    fn from(m: els_config::FeedModeName) -> Self {
        match m {
            els_config::FeedModeName::Inch => FeedMode::Inch,
            els_config::FeedModeName::Metric => FeedMode::Metric,
            els_config::FeedModeName::Diametral => FeedMode::Diametral,
            els_config::FeedModeName::Module => FeedMode::Module,
        }
    }
}

// ── Tables and catalogs ──────────────────────────────────────────────────────

/// Period table from `[periods]`: the tuned list, or derived from the rpm
/// table when `derive = true`.
pub fn period_table(cfg: &els_config::Config) -> Result<PeriodTable> {
    let timing = TimingCfg::from(&cfg.timing);
    let table = if cfg.periods.derive {
        PeriodTable::derived(
            cfg.periods.rpm_table.clone(),
            cfg.periods.headroom_pct,
            &MachineCfg::from(&cfg.machine),
            &timing,
        )
    } else {
        PeriodTable::tuned(
            cfg.periods.rpm_table.clone(),
            cfg.periods.period_list.clone(),
            &timing,
        )
    };
    table.map_err(eyre::Report::new)
}

fn parse_pitches(mode: FeedMode, list: &[String]) -> Result<Vec<Pitch>> {
    list.iter()
        .map(|s| {
            s.parse::<Pitch>()
                .map_err(eyre::Report::new)
                .wrap_err_with(|| format!("{mode} pitch '{s}'"))
        })
        .collect()
}

/// Catalog from `[feeds]` lists and optional CSV rows. A mode listed in
/// neither keeps its built-in list; CSV rows replace TOML lists per mode.
pub fn feed_catalog(
    feeds: &els_config::Feeds,
    rows: &[els_config::PitchRow],
) -> Result<FeedCatalog> {
    let mut catalog = FeedCatalog::builtin();
    let toml_lists = [
        (FeedMode::Inch, feeds.inch.as_ref()),
        (FeedMode::Metric, feeds.metric.as_ref()),
        (FeedMode::Diametral, feeds.diametral.as_ref()),
        (FeedMode::Module, feeds.module.as_ref()),
    ];
    for (mode, list) in toml_lists {
        if let Some(list) = list {
            catalog = catalog
                .with_list(mode, parse_pitches(mode, list)?)
                .map_err(eyre::Report::new)?;
        }
    }
    for mode in FeedMode::ALL {
        let from_csv: Vec<String> = rows
            .iter()
            .filter(|r| FeedMode::from(r.mode) == mode)
            .map(|r| r.pitch.clone())
            .collect();
        if !from_csv.is_empty() {
            catalog = catalog
                .with_list(mode, parse_pitches(mode, &from_csv)?)
                .map_err(eyre::Report::new)?;
        }
    }
    Ok(catalog)
}

/// Feed active at power-up. Without an explicit pitch the first catalog
/// entry of the mode is used, except inch which defaults to 8 TPI.
pub fn initial_feed(feeds: &els_config::Feeds, catalog: &FeedCatalog) -> Result<FeedSelection> {
    let mode = FeedMode::from(feeds.mode);
    match &feeds.pitch {
        Some(p) => {
            let pitch = p
                .parse::<Pitch>()
                .map_err(eyre::Report::new)
                .wrap_err_with(|| format!("feeds.pitch '{p}'"))?;
            Ok(FeedSelection::new(mode, pitch))
        }
        None if mode == FeedMode::Inch => Ok(FeedSelection::default()),
        None => catalog
            .get(mode, 0)
            .ok_or_else(|| eyre::eyre!("no pitches listed for {mode}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_config_maps_to_stock_runtime() {
        let cfg = els_config::Config::default();
        assert_eq!(MachineCfg::from(&cfg.machine), MachineCfg::default());
        assert_eq!(TimingCfg::from(&cfg.timing), TimingCfg::default());
        assert_eq!(JogCfg::from(&cfg.jog), JogCfg::default());
        assert_eq!(KnobCfg::from(&cfg.knob), KnobCfg::default());
        assert_eq!(InputCfg::from(&cfg.inputs), InputCfg::default());
        assert_eq!(period_table(&cfg).unwrap(), PeriodTable::default());
    }

    #[test]
    fn csv_rows_replace_one_mode() {
        let rows = vec![
            els_config::PitchRow {
                mode: els_config::FeedModeName::Metric,
                pitch: "0.7".into(),
            },
            els_config::PitchRow {
                mode: els_config::FeedModeName::Metric,
                pitch: "1.5".into(),
            },
        ];
        let c = feed_catalog(&els_config::Feeds::default(), &rows).unwrap();
        assert_eq!(c.pitches(FeedMode::Metric).len(), 2);
        assert_eq!(c.pitches(FeedMode::Inch), FeedCatalog::builtin().pitches(FeedMode::Inch));
    }

    #[test]
    fn initial_feed_from_config() {
        let feeds = els_config::Feeds {
            mode: els_config::FeedModeName::Metric,
            pitch: Some("1.25".into()),
            ..Default::default()
        };
        let f = initial_feed(&feeds, &FeedCatalog::builtin()).unwrap();
        assert_eq!(f.mode, FeedMode::Metric);
        assert_eq!(f.pitch, "1.25".parse().unwrap());
    }

    #[test]
    fn bad_pitch_is_reported_with_its_source() {
        let feeds = els_config::Feeds {
            metric: Some(vec!["abc".into()]),
            ..Default::default()
        };
        let err = feed_catalog(&feeds, &[]).unwrap_err();
        assert!(format!("{err:#}").contains("metric pitch 'abc'"), "{err:#}");
    }
}
