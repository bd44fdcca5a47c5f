//! Per-vector compute: serial path vs threaded worker pool.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scatrs::data::{Atom, Averaging, SharedAccumulator};
use scatrs::runtime::{
    AllVectorsDevice, LocalCommunicator, ScatterDevice, ScatteringParams, ThreadLimits,
};
use scatrs::{Sample, ScatteringVector};
use std::sync::Arc;

fn random_sample(atoms: usize, frames: usize, seed: u64) -> Arc<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let atom_list = (0..atoms)
        .map(|i| Atom::new(format!("A{}", i), rng.gen_range(0.5..8.0)))
        .collect();
    let positions = (0..frames)
        .map(|_| {
            (0..atoms)
                .map(|_| {
                    Vector3::new(
                        rng.gen_range(-20.0..20.0),
                        rng.gen_range(-20.0..20.0),
                        rng.gen_range(-20.0..20.0),
                    )
                })
                .collect()
        })
        .collect();
    Arc::new(Sample::new(atom_list, positions).unwrap())
}

fn staged_device(sample: Arc<Sample>, on: bool) -> AllVectorsDevice {
    let params = ScatteringParams {
        averaging: Averaging::Sphere { resolution: 32 },
        ..ScatteringParams::default()
    };
    let threads = ThreadLimits {
        on,
        ..ThreadLimits::default()
    };
    let mut device =
        AllVectorsDevice::new(sample, Arc::new(LocalCommunicator), params, threads).unwrap();
    device.stage_data().unwrap();
    device
}

fn bench_vector_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("Vector Compute");
    let q = ScatteringVector::new(0.4, 0.1, 0.2);

    for frames in [256, 1024].iter() {
        let sample = random_sample(200, *frames, 7);

        group.bench_with_input(BenchmarkId::new("serial", frames), frames, |b, &frames| {
            let mut device = staged_device(sample.clone(), false);
            let accumulator = SharedAccumulator::new(frames);
            b.iter(|| {
                accumulator.reset();
                device.compute_serial(&q, &accumulator).unwrap();
                black_box(accumulator.snapshot())
            });
        });

        group.bench_with_input(BenchmarkId::new("threaded", frames), frames, |b, &frames| {
            let mut device = staged_device(sample.clone(), true);
            let accumulator = Arc::new(SharedAccumulator::new(frames));
            device.start_workers(accumulator.clone()).unwrap();
            b.iter(|| {
                accumulator.reset();
                device.compute_threaded(&q, &accumulator).unwrap();
                black_box(accumulator.snapshot())
            });
            device.stop_workers().unwrap();
        });
    }

    group.finish();
}

criterion_group!(benches, bench_vector_compute);
criterion_main!(benches);
