use els_core::mocks::{ManualTimer, RecordingOutput};
use els_core::{Els, ElsError, JogCfg, JogPhase, MotionMode, Phases, Rotation, Side};
use rstest::rstest;

type TestEls = Els<RecordingOutput, ManualTimer>;

fn new_els() -> (TestEls, RecordingOutput) {
    let out = RecordingOutput::new();
    let els = Els::builder()
        .with_output(out.clone())
        .with_timer(ManualTimer::new())
        .build()
        .expect("els build");
    (els, out)
}

/// Fire the pulse timer until it disarms, recording the armed periods.
fn run_out(els: &TestEls) -> Vec<u16> {
    let mut periods = vec![];
    while let Some(p) = els.armed_period() {
        periods.push(p);
        els.pulse_timer();
    }
    periods
}

#[rstest]
fn ramp_up_cruise_and_ramp_down() {
    let (els, out) = new_els();
    let cfg = JogCfg::default();
    els.start_jog(Side::Right).unwrap();
    assert_eq!(els.armed_period(), Some(cfg.period_max));

    let mut periods = vec![];
    while els.jog_phase() == JogPhase::Accelerating {
        els.pulse_timer();
        periods.push(els.armed_period().unwrap());
    }
    assert_eq!(els.jog_phase(), JogPhase::Cruising);
    assert_eq!(periods.last(), Some(&cfg.period_min));
    assert!(periods.windows(2).all(|w| w[1] < w[0]));
    assert_eq!(periods[0], cfg.period_max - cfg.accel);
    let accel_pulses = periods.len() as i32;
    assert_eq!(els.position(), accel_pulses);

    for _ in 0..10 {
        els.pulse_timer();
    }
    assert_eq!(els.armed_period(), Some(cfg.period_min));
    assert_eq!(els.position(), accel_pulses + 10);

    els.stop_jog();
    assert_eq!(els.jog_phase(), JogPhase::Decelerating);
    let down = run_out(&els);
    assert!(down.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(els.jog_phase(), JogPhase::Idle);
    assert_eq!(els.mode(), MotionMode::Disengaged);
    assert_eq!(i64::from(els.position()), out.net());
    assert!(els.position() > accel_pulses + 10);
}

#[rstest]
fn left_jog_moves_toward_the_headstock() {
    let (els, _) = new_els();
    els.start_jog(Side::Left).unwrap();
    for _ in 0..5 {
        els.pulse_timer();
    }
    assert_eq!(els.position(), -5);
}

#[rstest]
fn reversal_needs_a_stop_first() {
    let (els, _) = new_els();
    els.start_jog(Side::Right).unwrap();
    els.pulse_timer();
    assert!(matches!(
        els.start_jog(Side::Left),
        Err(ElsError::InvalidCommand(_))
    ));
    els.stop_jog();
    assert!(matches!(
        els.start_jog(Side::Left),
        Err(ElsError::InvalidCommand(_))
    ));
    run_out(&els);
    assert_eq!(els.jog_phase(), JogPhase::Idle);
    els.start_jog(Side::Left).unwrap();
    assert_eq!(els.mode(), MotionMode::Jog);
}

#[rstest]
fn press_while_slowing_ramps_back_up() {
    let (els, _) = new_els();
    els.start_jog(Side::Right).unwrap();
    for _ in 0..3 {
        els.pulse_timer();
    }
    els.stop_jog();
    els.pulse_timer();
    assert_eq!(els.jog_phase(), JogPhase::Decelerating);
    let slowing = els.armed_period().unwrap();
    els.start_jog(Side::Right).unwrap();
    assert_eq!(els.jog_phase(), JogPhase::Accelerating);
    els.pulse_timer();
    assert!(els.armed_period().unwrap() < slowing);
}

#[rstest]
fn stop_jog_when_idle_does_nothing() {
    let (els, _) = new_els();
    els.stop_jog();
    assert_eq!(els.jog_phase(), JogPhase::Idle);
    assert_eq!(els.mode(), MotionMode::Synced);
}

#[rstest]
fn jog_halts_at_a_limit() {
    let (els, out) = new_els();
    els.set_limit(Side::Right).unwrap();
    els.disengage().unwrap();
    els.knob_edge(Phases::default().advance(Rotation::Reverse));
    run_out(&els);
    assert_eq!(els.position(), -26);

    els.start_jog(Side::Right).unwrap();
    run_out(&els);
    assert_eq!(els.position(), 0);
    assert_eq!(out.net(), 0);
    assert_eq!(els.limit_reached(), Some(Side::Right));
    assert_eq!(els.jog_phase(), JogPhase::Idle);
    assert_eq!(els.mode(), MotionMode::Disengaged);
}

#[rstest]
fn limit_latched_under_a_moving_jog_stops_it() {
    let (els, _) = new_els();
    els.start_jog(Side::Right).unwrap();
    for _ in 0..20 {
        els.pulse_timer();
    }
    assert_eq!(els.set_limit(Side::Right), Ok(20));
    els.pulse_timer();
    assert_eq!(els.position(), 20);
    assert_eq!(els.armed_period(), None);
    assert_eq!(els.mode(), MotionMode::Disengaged);
}

#[rstest]
fn jog_cancels_pending_sync_steps() {
    let (els, _) = new_els();
    els.spindle_edge(Phases::default().advance(Rotation::Forward), 100);
    assert_eq!(els.status().steps_per_rev, 3200);
    els.start_jog(Side::Right).unwrap();
    els.pulse_timer();
    // the jog pulse, not the four owed by the tick
    assert_eq!(els.position(), 1);
}
