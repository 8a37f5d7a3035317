//! Controller assembly from config and the scenarios behind each command.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use els_config::Config;
use els_core::conversions::{feed_catalog, initial_feed, period_table};
use els_core::{
    Els, ElsError, FeedCatalog, FeedMode, FeedSelection, InputCfg, JogCfg, KnobCfg, MachineCfg,
    Pitch, Rotation, Side, SimReport, Simulation, Status, StepTable, TimingCfg,
};
use els_hardware::{SimulatedStepper, SimulatedTimer, StepperProbe};
use eyre::{Result, WrapErr};

use crate::cli::FeedArgs;

pub type SimEls = Els<SimulatedStepper, SimulatedTimer>;

/// A controller wired to simulated outputs, plus the stepper's own count.
pub struct Rig {
    pub els: SimEls,
    pub stepper: StepperProbe,
}

/// Built-in catalogs overridden by `[feeds]` lists and the optional CSV.
pub fn load_catalog(cfg: &Config, pitches: Option<&Path>) -> Result<FeedCatalog> {
    let rows = match pitches {
        Some(path) => els_config::load_pitch_csv(path)?,
        None => Vec::new(),
    };
    feed_catalog(&cfg.feeds, &rows)
}

/// Feed named on the command line, falling back to `[feeds]`.
pub fn select_feed(cfg: &Config, catalog: &FeedCatalog, args: &FeedArgs) -> Result<FeedSelection> {
    let configured = FeedMode::from(cfg.feeds.mode);
    let mode = args.mode.map(FeedMode::from).unwrap_or(configured);
    if let Some(p) = &args.pitch {
        let pitch = p
            .parse::<Pitch>()
            .map_err(eyre::Report::new)
            .wrap_err_with(|| format!("--pitch '{p}'"))?;
        return Ok(FeedSelection::new(mode, pitch));
    }
    if mode == configured {
        return initial_feed(&cfg.feeds, catalog);
    }
    let feeds = els_config::Feeds {
        mode: args.mode.map_or(cfg.feeds.mode, Into::into),
        pitch: None,
        ..cfg.feeds.clone()
    };
    initial_feed(&feeds, catalog)
}

pub fn build_rig(cfg: &Config, catalog: FeedCatalog, feed: FeedSelection) -> Result<Rig> {
    let stepper = SimulatedStepper::new();
    let probe = stepper.probe();
    let els = Els::builder()
        .with_machine(MachineCfg::from(&cfg.machine))
        .with_timing(TimingCfg::from(&cfg.timing))
        .with_jog(JogCfg::from(&cfg.jog))
        .with_knob(KnobCfg::from(&cfg.knob))
        .with_inputs(InputCfg::from(&cfg.inputs))
        .with_periods(period_table(cfg)?)
        .with_catalog(catalog)
        .with_feed(feed)
        .with_output(stepper)
        .with_timer(SimulatedTimer::new())
        .build()?;
    Ok(Rig {
        els,
        stepper: probe,
    })
}

/// Step table for `feed` without building a controller.
pub fn table_for(cfg: &Config, feed: FeedSelection) -> Result<StepTable> {
    StepTable::build(
        feed,
        &MachineCfg::from(&cfg.machine),
        &TimingCfg::from(&cfg.timing),
        &period_table(cfg)?,
    )
    .map_err(eyre::Report::new)
    .wrap_err_with(|| format!("feed {feed}"))
}

fn ensure_outputs_agree(rig: &Rig, status: &Status) -> Result<()> {
    let stepper = rig.stepper.position();
    if stepper != i64::from(status.position) {
        eyre::bail!(
            "stepper counted {stepper} steps but the controller tracked {}",
            status.position
        );
    }
    Ok(())
}

pub struct SimulateParams {
    pub rpm: u32,
    pub revs: u32,
    pub reverse: bool,
    pub toward: Side,
    pub follow: Option<Duration>,
}

/// Turn the simulated spindle and report where the carriage ended up.
/// An overrun is returned as an error carrying the speed and feed.
pub fn run_simulate(
    rig: &Rig,
    params: &SimulateParams,
    shutdown: &Arc<AtomicBool>,
    mut on_status: impl FnMut(&Status),
) -> Result<SimReport> {
    let els = &rig.els;
    let cpr = u32::from(els.machine().spindle_cpr);
    let rotation = if params.reverse {
        Rotation::Reverse
    } else {
        Rotation::Forward
    };
    let mut sim = Simulation::new(els);
    if let Some(every) = params.follow {
        sim = sim.with_refresh(every, &mut on_status);
    }
    sim.press(params.toward)?;
    tracing::info!(
        rpm = params.rpm,
        revs = params.revs,
        feed = %els.table().selection(),
        "simulation start"
    );
    for _ in 0..params.revs {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!("interrupted; stopping the spindle");
            break;
        }
        sim.spin(rotation, params.rpm, cpr);
        if els.fault() {
            break;
        }
    }
    sim.settle(Duration::from_secs(1));
    let report = sim.report();
    if report.status.fault {
        return Err(eyre::Report::new(ElsError::OverrunFault).wrap_err(format!(
            "{} rpm at {} (safe up to {} rpm)",
            params.rpm, report.status.feed, report.status.rpm_ceiling
        )));
    }
    ensure_outputs_agree(rig, &report.status)?;
    tracing::info!(
        ticks = report.ticks,
        pulses = report.pulses,
        position = report.status.position,
        "simulation done"
    );
    Ok(report)
}

/// Hold a jog button for `hold`, release it and wait for the ramp down.
pub fn run_jog(rig: &Rig, side: Side, hold: Duration) -> Result<SimReport> {
    let els = &rig.els;
    let mut sim = Simulation::new(els);
    // jogging is a manual move, not a threading pass
    els.disengage()?;
    els.start_jog(side)?;
    sim.poll();
    sim.dwell(hold);
    els.stop_jog();
    if !sim.settle(Duration::from_secs(10)) {
        eyre::bail!("jog did not come to rest");
    }
    let report = sim.report();
    ensure_outputs_agree(rig, &report.status)?;
    Ok(report)
}

/// Outcome of a self-check, one line per check.
pub fn self_check(cfg: &Config, catalog: &FeedCatalog) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    let mut usable = 0usize;
    let mut overflow = 0usize;
    for sel in catalog.iter() {
        match table_for(cfg, sel) {
            Ok(_) => usable += 1,
            Err(e)
                if matches!(
                    e.downcast_ref::<ElsError>(),
                    Some(ElsError::RatioOverflow { .. })
                ) =>
            {
                overflow += 1;
            }
            Err(e) => return Err(e),
        }
    }
    lines.push(format!("catalog: {usable} feeds usable, {overflow} over the step ceiling"));

    let feed = initial_feed(&cfg.feeds, catalog)?;
    let rig = build_rig(cfg, catalog.clone(), feed)?;
    let cpr = u32::from(rig.els.machine().spindle_cpr);
    let expected = rig.els.table().total();
    let mut sim = Simulation::new(&rig.els);
    sim.press(Side::Right)?;
    sim.spin(Rotation::Forward, 60, cpr);
    sim.settle(Duration::from_secs(1));
    let out = sim.report();
    if out.status.fault || i64::from(out.status.position) != i64::from(expected) {
        eyre::bail!(
            "sync check: one revolution moved {} steps, expected {expected}",
            out.status.position
        );
    }
    sim.spin(Rotation::Reverse, 60, cpr);
    sim.settle(Duration::from_secs(1));
    let back = sim.report();
    if back.status.fault || back.status.position != 0 {
        eyre::bail!(
            "sync check: reversing did not retrace, ended at {}",
            back.status.position
        );
    }
    ensure_outputs_agree(&rig, &back.status)?;
    lines.push(format!("sync: {feed} round trip of {expected} steps ok"));

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        use els_core::util::counts_to_ns;
        use els_hardware::gpio::{GpioStepper, StepperPins};
        let hz = cfg.timing.pulse_timer_hz;
        let stepper = GpioStepper::new(
            StepperPins {
                pul: cfg.pins.pul,
                dir: cfg.pins.dir,
                active_low: cfg.pins.active_low,
            },
            Duration::from_nanos(counts_to_ns(u64::from(cfg.timing.pulse_width_min), hz)),
            Duration::from_nanos(counts_to_ns(u64::from(cfg.timing.step_period_min), hz)),
        )
        .wrap_err("open stepper pins")?;
        drop(stepper);
        lines.push(format!("outputs: PUL {} DIR {} ok", cfg.pins.pul, cfg.pins.dir));
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    lines.push("outputs: simulated".to_string());

    Ok(lines)
}
