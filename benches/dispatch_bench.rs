//! Benchmarks for GPU element-wise addition.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use compute_view::gpu::{AcceleratorContext, ElementwiseAdd, Program, ADD_KERNEL, DEFAULT_PROGRAM};

fn bench_add(c: &mut Criterion) {
    let ctx = match AcceleratorContext::new_blocking() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping GPU benchmarks: {}", e);
            return;
        }
    };
    let queue = ctx.new_command_queue();
    let program = match Program::compile(&ctx, "default", DEFAULT_PROGRAM) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Skipping GPU benchmarks: {}", e);
            return;
        }
    };
    let add = match ElementwiseAdd::new(&ctx, &program, ADD_KERNEL) {
        Ok(add) => add,
        Err(e) => {
            eprintln!("Skipping GPU benchmarks: {}", e);
            return;
        }
    };

    let mut group = c.benchmark_group("Elementwise Add");
    group.sample_size(20);

    for len in [1024usize, 262_144, 1 << 20] {
        let a = vec![1.0f32; len];
        let b: Vec<f32> = (0..len).map(|i| i as f32).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |bench, _| {
            bench.iter(|| black_box(add.run(&ctx, &queue, &a, &b)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add);
criterion_main!(benches);
