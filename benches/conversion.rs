//! Benchmarks for the analog-to-physical conversion chain
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pressurelink_rs::acquisition::Calibration;

fn bench_conversion(c: &mut Criterion) {
    let calib = Calibration::default();

    c.bench_function("convert_in_table", |b| {
        b.iter(|| calib.convert(black_box(10_000.0)))
    });

    c.bench_function("convert_saturated", |b| {
        b.iter(|| calib.convert(black_box(30_000.0)))
    });

    c.bench_function("convert_sweep", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for raw in (0..20_000).step_by(250) {
                let (_, mmhg) = calib.convert(black_box(raw as f64));
                acc += mmhg;
            }
            acc
        })
    });
}

criterion_group!(benches, bench_conversion);
criterion_main!(benches);
