//! Benchmarks for the raster processing kernels.
//!
//! Run with: cargo bench --package grid-processor --bench processing_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dem_common::{Crs, GridSpec};
use grid_processor::{
    aggregate, align, clip, difference, AlignmentConfig, ClipMode, PolygonLayer, ResamplingMethod,
};
use serde_json::json;
use test_utils::{create_surface_raster, feature_collection, polygon_feature, rect_ring};

fn utm_grid(size: usize, pixel: f64) -> GridSpec {
    GridSpec::new(size, size, 350_000.0, 5_900_000.0, pixel, pixel, Crs::Epsg(32719))
}

/// Gently tilted surface with some relief.
fn terrain(x: f64, y: f64) -> f64 {
    1500.0 + (x - 350_000.0) * 0.05 - (5_900_000.0 - y) * 0.02 + ((x + y) / 250.0).sin() * 12.0
}

/// Four square glaciers in a 2x2 arrangement covering the grid.
fn glacier_layer(grid: &GridSpec) -> PolygonLayer {
    let b = grid.bbox();
    let (cx, cy) = b.center();
    let quads = [
        (b.min_x, cy, cx, b.max_y),
        (cx, cy, b.max_x, b.max_y),
        (b.min_x, b.min_y, cx, cy),
        (cx, b.min_y, b.max_x, cy),
    ];
    let features = quads
        .iter()
        .enumerate()
        .map(|(i, &(x0, y0, x1, y1))| polygon_feature("id", json!(i), &rect_ring(x0, y0, x1, y1)))
        .collect();
    PolygonLayer::from_geojson_str(&feature_collection(features, Some("EPSG:32719"))).unwrap()
}

// =============================================================================
// ALIGNMENT BENCHMARKS
// =============================================================================

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");

    for size in [256usize, 1024] {
        let reference = utm_grid(size, 30.0);
        let source = create_surface_raster(utm_grid(size * 3 / 2, 20.0), terrain);
        group.throughput(Throughput::Elements((size * size) as u64));

        for method in [ResamplingMethod::Nearest, ResamplingMethod::Bilinear, ResamplingMethod::Cubic] {
            let config = AlignmentConfig::new(reference).with_resampling(method);
            group.bench_with_input(
                BenchmarkId::new(method.as_str(), size),
                &config,
                |b, config| b.iter(|| align(black_box(&source), config).unwrap()),
            );
        }
    }

    group.finish();
}

// =============================================================================
// CLIP / DIFFERENCE / ZONAL BENCHMARKS
// =============================================================================

fn bench_change_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("change_detection");

    for size in [256usize, 1024] {
        let grid = utm_grid(size, 30.0);
        let baseline = create_surface_raster(grid, terrain);
        let subject = create_surface_raster(grid, |x, y| terrain(x, y) - 3.5);
        let layer = glacier_layer(&grid);
        let mask = layer.mask();
        let diff = difference(&subject, &baseline, -9999.0).unwrap();

        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("clip", size), &subject, |b, raster| {
            b.iter(|| clip(black_box(raster), &mask, ClipMode::Inside).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("difference", size), &subject, |b, raster| {
            b.iter(|| difference(black_box(raster), &baseline, -9999.0).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("aggregate", size), &diff, |b, raster| {
            b.iter(|| aggregate(black_box(raster), &layer, "id").unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_align, bench_change_detection);
criterion_main!(benches);
