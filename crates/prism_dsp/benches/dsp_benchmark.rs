//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p prism_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use prism_dsp::{num_bands, AudioStatistics, SpectrumAnalyzer, SpectrumHandoff, ANALYSIS_SIZE};

fn benchmark_analyzer(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyzer");

    // Common buffer sizes in audio applications
    let buffer_sizes = [64, 128, 256, 512, 1024, 2048];

    for size in buffer_sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("push_planar_{}_frames", size), |b| {
            let mut analyzer = SpectrumAnalyzer::new(ANALYSIS_SIZE).unwrap();
            let left: Vec<f32> = (0..size).map(|i| (i as f32 * 0.001).sin()).collect();
            let right: Vec<f32> = (0..size).map(|i| (i as f32 * 0.002).sin()).collect();

            b.iter(|| {
                black_box(analyzer.push_planar(black_box(&left), black_box(&right)));
            });
        });
    }

    group.finish();

    c.bench_function("analyzer_compute_8192", |b| {
        let mut analyzer = SpectrumAnalyzer::new(ANALYSIS_SIZE).unwrap();
        let block: Vec<f32> = (0..ANALYSIS_SIZE).map(|i| (i as f32 * 0.01).sin()).collect();
        analyzer.push_mono(&block);

        b.iter(|| {
            black_box(analyzer.compute());
        });
    });
}

fn benchmark_handoff(c: &mut Criterion) {
    let bands = num_bands(ANALYSIS_SIZE);
    let spectrum: Vec<f32> = (0..bands).map(|i| i as f32).collect();

    c.bench_function("handoff_publish", |b| {
        let handoff = SpectrumHandoff::new(bands);

        b.iter(|| {
            handoff.publish(black_box(48000), black_box(&spectrum));
        });
    });

    c.bench_function("handoff_publish_consume", |b| {
        let handoff = SpectrumHandoff::new(bands);
        let mut out = vec![0.0; bands];

        b.iter(|| {
            handoff.publish(48000, &spectrum);
            black_box(handoff.consume_into(black_box(&mut out)));
        });
    });
}

fn benchmark_statistics(c: &mut Criterion) {
    c.bench_function("statistics_add_sample", |b| {
        let mut stats = AudioStatistics::new(8192, 50).unwrap();
        let mut level = -120.0_f32;

        b.iter(|| {
            stats.add_sample(black_box(level));
            level = if level >= 0.0 { -120.0 } else { level + 0.5 };
        });
    });

    c.bench_function("statistics_kurtosis_8192", |b| {
        let mut stats = AudioStatistics::new(8192, 50).unwrap();
        for i in 0..8192 {
            stats.add_sample(-((i % 120) as f32));
        }

        b.iter(|| {
            black_box(stats.get_kurtosis());
        });
    });
}

criterion_group!(
    benches,
    benchmark_analyzer,
    benchmark_handoff,
    benchmark_statistics
);

criterion_main!(benches);
