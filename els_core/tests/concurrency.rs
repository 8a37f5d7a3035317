//! Handlers called from separate threads, the way interrupts preempt the
//! background loop on the target.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use els_core::mocks::{ManualTimer, RecordingOutput};
use els_core::{Els, MotionMode, Phases, Rotation, Side};

#[test]
fn pulses_from_another_thread_track_the_spindle() {
    let out = RecordingOutput::new();
    let els = Els::builder()
        .with_output(out.clone())
        .with_timer(ManualTimer::new())
        .build()
        .expect("els build");
    els.direction_switch(Side::Right, 0).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                els.pulse_timer();
            }
        });
        s.spawn(|| {
            let mut now = 0u32;
            while !done.load(Ordering::Acquire) {
                now = now.wrapping_add(1_000);
                let status = els.service(now);
                assert_eq!(status.mode, MotionMode::Synced);
                thread::yield_now();
            }
        });
        let mut p = Phases::default();
        for i in 0..1600u32 {
            // wait for the previous tick's steps so the fault never trips
            while els.armed_period().is_some() {
                thread::yield_now();
            }
            p = p.advance(Rotation::Forward);
            els.spindle_edge(p, i * 20_000);
        }
        while els.armed_period().is_some() {
            thread::yield_now();
        }
        done.store(true, Ordering::Release);
    });

    assert!(!els.fault());
    assert_eq!(els.position(), 6400);
    assert_eq!(out.net(), 6400);
    assert_eq!(out.pulses(), 6400);
}

#[test]
fn commands_interleave_with_handlers() {
    let els = Els::builder()
        .with_output(RecordingOutput::new())
        .with_timer(ManualTimer::new())
        .build()
        .expect("els build");
    els.disengage().unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            let mut p = Phases::default();
            while !done.load(Ordering::Acquire) {
                p = p.advance(Rotation::Forward);
                els.knob_edge(p);
                els.pulse_timer();
            }
        });
        for _ in 0..200 {
            els.select_pitch(3).unwrap();
            els.select_pitch(5).unwrap();
            let _ = els.status();
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(els.table().total(), 3200);
    assert_eq!(els.mode(), MotionMode::Disengaged);
}
