//! Benchmarks for DEM conditioning and stream extraction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swathflow_algorithms::conditioning::{
    condition_dem, detect_flat_regions, ConditionParams, FlatRegionParams, NoDataPolicy,
};
use swathflow_algorithms::pipeline::{extract_streams, StreamExtractionParams};
use swathflow_core::{GeoTransform, Raster};

/// Bowl draining to the centre, with a flat terrace ring and a NaN border
fn create_terraced_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::filled(size, size, f64::NAN);
    dem.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    let center = size as f64 / 2.0;
    for row in 4..size - 4 {
        for col in 4..size - 4 {
            let dist = (col as f64 - center).hypot(row as f64 - center);
            let noise = ((row * 7 + col * 13) % 17) as f64 * 0.01;
            let z = if (dist - center * 0.5).abs() < 3.0 {
                center * 0.5
            } else {
                dist + noise
            };
            dem.set(row, col, z).unwrap();
        }
    }
    dem
}

fn bench_flat_regions(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditioning/flat_regions");
    for size in [128, 256, 512] {
        let dem = create_terraced_dem(size);
        let params = FlatRegionParams {
            min_flat_area: 5_000.0,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| detect_flat_regions(black_box(&dem), &params).unwrap())
        });
    }
    group.finish();
}

fn bench_predicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditioning/predicate");
    for size in [256, 512] {
        let dem = create_terraced_dem(size);
        let params = ConditionParams {
            policy: NoDataPolicy::Predicate("z <= 10 or z > 200".into()),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| condition_dem(black_box(dem.clone()), &params).unwrap())
        });
    }
    group.finish();
}

fn bench_stream_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditioning/extract_streams");
    group.sample_size(10);
    for size in [128, 256] {
        let dem = create_terraced_dem(size);
        let params = StreamExtractionParams {
            threshold_area: 10_000.0,
            nodata: NoDataPolicy::Auto,
            min_flat_area: 5_000.0,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| extract_streams(black_box(dem.clone()), &params).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_flat_regions,
    bench_predicate,
    bench_stream_pipeline,
);
criterion_main!(benches);
