use els_core::mocks::{ManualTimer, RecordingOutput};
use els_core::{Els, ElsError, Phases, Rotation, Side, Simulation};
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

#[rstest]
fn tick_with_pulses_outstanding_latches_fault() {
    let (els, out) = new_els();
    let mut p = Phases::default();
    p = p.advance(Rotation::Forward);
    els.spindle_edge(p, 1_000);
    // only one of four owed pulses gets out before the next tick
    els.pulse_timer();
    assert_eq!(out.pulses(), 1);
    p = p.advance(Rotation::Forward);
    els.spindle_edge(p, 2_000);
    assert!(els.fault());
    assert_eq!(els.armed_period(), None);
    assert_eq!(els.status().overruns, 1);
}

#[rstest]
fn fault_stays_latched_and_blocks_motion_for_thousands_of_ticks() {
    let (els, out) = new_els();
    let mut p = Phases::default();
    let mut now = 0u32;
    for _ in 0..2 {
        p = p.advance(Rotation::Forward);
        now += 20_000;
        els.spindle_edge(p, now);
    }
    assert!(els.fault());
    let frozen = els.position();
    let pulses = out.pulses();

    for _ in 0..1_500 {
        p = p.advance(Rotation::Forward);
        now += 20_000;
        els.spindle_edge(p, now);
        els.pulse_timer();
        assert!(els.fault());
    }
    assert_eq!(els.position(), frozen);
    assert_eq!(out.pulses(), pulses);
    // the encoder keeps counting so the spindle angle stays known
    assert_eq!(els.spindle_tick(), 1_502 % 800);

    assert_eq!(els.start_jog(Side::Right), Err(ElsError::OverrunFault));
    assert_eq!(els.engage(), Err(ElsError::OverrunFault));
    assert_eq!(els.direction_switch(Side::Left, now), Err(ElsError::OverrunFault));
}

#[rstest]
fn acknowledge_clears_and_motion_resumes() {
    let (els, out) = new_els();
    let mut p = Phases::default();
    for now in [1_000, 2_000] {
        p = p.advance(Rotation::Forward);
        els.spindle_edge(p, now);
    }
    assert!(els.fault());
    els.acknowledge_fault().unwrap();
    assert!(!els.fault());
    let before = out.pulses();
    p = p.advance(Rotation::Forward);
    els.spindle_edge(p, 30_000);
    while els.armed_period().is_some() {
        els.pulse_timer();
    }
    assert_eq!(out.pulses(), before + 4);
}

#[rstest]
fn acknowledge_without_fault_is_rejected() {
    let (els, _out) = new_els();
    assert!(matches!(
        els.acknowledge_fault(),
        Err(ElsError::InvalidCommand(_))
    ));
}

#[rstest]
fn spindle_too_fast_for_the_feed_overruns_in_simulation() {
    let (els, _out) = new_els();
    let mut sim = Simulation::new(&els);
    // four pulses of 30 us need 120 us; at 1000 rpm a tick lasts 75 us
    sim.spin(Rotation::Forward, 1000, 50);
    let report = sim.report();
    assert!(report.status.fault);
    assert_eq!(report.status.overruns, 1);
    assert!(report.status.over_speed);
    assert!(report.pulses < 50 * 4);
}

#[rstest]
fn nominal_speed_never_overruns() {
    let (els, _out) = new_els();
    let mut sim = Simulation::new(&els);
    sim.spin(Rotation::Forward, 400, 4_000);
    let report = sim.report();
    assert!(!report.status.fault);
    assert_eq!(report.status.overruns, 0);
}
