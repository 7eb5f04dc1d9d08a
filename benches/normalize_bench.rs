//! Benchmarks for grayscale normalization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use compute_view::image::{normalize_to_grayscale, GrayscaleImage};

fn bench_normalize_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalize");

    for (width, height, name) in [(64, 64, "64x64"), (512, 512, "512x512"), (2048, 1024, "2048x1024")] {
        let values: Vec<f32> = (0..width * height).map(|i| 1.0 + i as f32).collect();
        group.bench_with_input(BenchmarkId::new("normalize", name), &values, |b, values| {
            b.iter(|| black_box(normalize_to_grayscale(black_box(values))));
        });
    }

    group.finish();
}

fn bench_image_from_values(c: &mut Criterion) {
    let values: Vec<f32> = (0..512 * 512).map(|i| (i as f32 * 0.01).sin()).collect();

    c.bench_function("grayscale_image_512", |b| {
        b.iter(|| black_box(GrayscaleImage::from_values(&values, 512, 512)));
    });
}

criterion_group!(benches, bench_normalize_sizes, bench_image_from_values);
criterion_main!(benches);
