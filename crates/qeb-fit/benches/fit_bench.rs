//! Fitting throughput for synthetic histograms
//!
//! Run with: cargo bench -p qeb-fit --bench fit_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qeb_core::NullSink;
use qeb_fit::test_data::{SyntheticHistograms, REFERENCE_PARAMS};
use qeb_fit::{analyze_many, A2Converter, ErrorBarConverter, HistogramAnalysis};

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("HistogramAnalysis");
    let config = HistogramAnalysis::builder().sink(NullSink);

    for num_bins in [20, 40, 100, 400] {
        let histogram =
            SyntheticHistograms::noisy(REFERENCE_PARAMS, 0.02, 0.32, num_bins, 0.005, 42).unwrap();
        group.bench_with_input(BenchmarkId::new("a2", num_bins), &histogram, |b, h| {
            b.iter(|| config.analyze(black_box(h)).unwrap())
        });

        let direct = config.clone().model_name("direct");
        group.bench_with_input(BenchmarkId::new("direct", num_bins), &histogram, |b, h| {
            b.iter(|| direct.analyze(black_box(h)).unwrap())
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let histograms: Vec<_> = (0..32)
        .map(|seed| {
            SyntheticHistograms::noisy(REFERENCE_PARAMS, 0.02, 0.32, 40, 0.005, seed).unwrap()
        })
        .collect();
    let config = HistogramAnalysis::builder().sink(NullSink);

    c.bench_function("analyze_many/32", |b| {
        b.iter(|| analyze_many(black_box(&histograms), &config))
    });
}

fn bench_converter(c: &mut Criterion) {
    c.bench_function("A2Converter/round_trip", |b| {
        b.iter(|| {
            let q = A2Converter.error_bars_x(black_box(&REFERENCE_PARAMS), &NullSink).unwrap();
            A2Converter.fit_params_from_error_bars_x(&q)
        })
    });
}

criterion_group!(benches, bench_analysis, bench_batch, bench_converter);
criterion_main!(benches);
