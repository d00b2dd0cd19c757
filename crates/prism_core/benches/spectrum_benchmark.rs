//! Spectrum plugin benchmarks
//!
//! Measures the real-time processing path and the monitor's read path.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use prism_core::{Spectrum, SpectrumConfig};

fn benchmark_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrum_process");

    // Typical buffer sizes used in real-time audio
    for buffer_size in [64, 128, 256, 512, 1024].iter() {
        let (mut spectrum, _monitor) = Spectrum::new(&SpectrumConfig::default()).unwrap();

        let left: Vec<f32> = (0..*buffer_size).map(|i| (i as f32 * 0.001).sin()).collect();
        let right: Vec<f32> = (0..*buffer_size).map(|i| (i as f32 * 0.002).sin()).collect();
        let mut left_out = vec![0.0; *buffer_size];
        let mut right_out = vec![0.0; *buffer_size];

        group.throughput(Throughput::Elements(*buffer_size as u64 * 2));
        group.bench_function(format!("process_{}_frames", buffer_size), |b| {
            b.iter(|| {
                spectrum.process_planar(
                    black_box(&left),
                    black_box(&right),
                    &mut left_out,
                    &mut right_out,
                    48000,
                );
            })
        });
    }

    group.finish();
}

fn benchmark_monitor(c: &mut Criterion) {
    let (mut spectrum, monitor) = Spectrum::new(&SpectrumConfig::default()).unwrap();
    let block = vec![0.1_f32; 512];
    let mut left_out = vec![0.0; 512];
    let mut right_out = vec![0.0; 512];
    for _ in 0..64 {
        spectrum.process_planar(&block, &block, &mut left_out, &mut right_out, 48000);
    }

    c.bench_function("monitor_get_statistics", |b| {
        b.iter(|| {
            black_box(monitor.get_statistics());
        })
    });
}

criterion_group!(benches, benchmark_process, benchmark_monitor);
criterion_main!(benches);
