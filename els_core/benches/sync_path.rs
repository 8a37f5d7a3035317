use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use els_core::mocks::{ManualTimer, RecordingOutput};
use els_core::{
    Els, FeedCatalog, MachineCfg, PeriodTable, Phases, Rotation, Side, StepTable, TimingCfg,
};

fn configure(c: &mut Criterion, name: &str) -> criterion::BenchmarkGroup<'_, criterion::measurement::WallTime> {
    let mut g = c.benchmark_group(name);
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p els_core --bench sync_path
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(10));
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
    g
}

pub fn bench_table_build(c: &mut Criterion) {
    let mut g = configure(c, "step_table");
    let machine = MachineCfg::default();
    let timing = TimingCfg::default();
    let periods = PeriodTable::default();
    let catalog = FeedCatalog::builtin();
    g.bench_function("whole_catalog", |b| {
        b.iter(|| {
            for sel in catalog.iter() {
                let t = StepTable::build(black_box(sel), &machine, &timing, &periods);
                black_box(t.is_ok());
            }
        })
    });
    g.finish();
}

pub fn bench_spindle_tick(c: &mut Criterion) {
    let mut g = configure(c, "spindle_tick");
    g.bench_function("edge_and_drain_800", |b| {
        b.iter_batched(
            || {
                let els = Els::builder()
                    .with_output(RecordingOutput::new())
                    .with_timer(ManualTimer::new())
                    .build()
                    .expect("els build");
                els.direction_switch(Side::Right, 0).expect("switch");
                els
            },
            |els| {
                let mut p = Phases::default();
                for i in 0..800u32 {
                    p = p.advance(Rotation::Forward);
                    els.spindle_edge(black_box(p), i * 20_000);
                    while els.armed_period().is_some() {
                        els.pulse_timer();
                    }
                }
                black_box(els.position());
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(sync_path, bench_table_build, bench_spindle_tick);
criterion_main!(sync_path);
