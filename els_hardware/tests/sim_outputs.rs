use els_hardware::{SimulatedStepper, SimulatedTimer};
use els_traits::{PulseTimer, StepOutput};

#[test]
fn boxed_stepper_still_reports_through_its_probe() {
    let stepper = SimulatedStepper::new();
    let probe = stepper.probe();
    let mut boxed: Box<dyn StepOutput + Send> = Box::new(stepper);
    boxed.set_direction(true);
    for _ in 0..10 {
        boxed.pulse();
    }
    assert_eq!(probe.position(), -10);
    assert_eq!(probe.pulses(), 10);
}

#[test]
fn probe_outlives_the_stepper() {
    let probe = {
        let mut s = SimulatedStepper::new();
        s.pulse();
        s.probe()
    };
    assert_eq!(probe.position(), 1);
}

#[test]
fn boxed_timer_forwards() {
    let mut t: Box<dyn PulseTimer + Send> = Box::new(SimulatedTimer::new());
    t.arm(60);
    assert_eq!(t.armed_period(), Some(60));
    t.disarm();
    assert_eq!(t.armed_period(), None);
}
