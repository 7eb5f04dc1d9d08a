//! Integration tests for program compilation and compute dispatch.

use compute_view::gpu::compute::{dispatch, ComputePipelineState, DispatchError};
use compute_view::gpu::{
    AcceleratorContext, DeviceBuffer, ElementwiseAdd, Program, ProgramError, ADD_KERNEL,
    DEFAULT_PROGRAM,
};

async fn create_gpu_context() -> Option<AcceleratorContext> {
    AcceleratorContext::new().await.ok()
}

/// Values whose pairwise sums are exact in f32.
fn operands(len: usize, seed: usize) -> (Vec<f32>, Vec<f32>) {
    let a = (0..len)
        .map(|i| ((i * 7919 + seed) % 1000) as f32 * 0.25 - 100.0)
        .collect();
    let b = (0..len)
        .map(|i| ((i * 104_729 + seed * 3) % 997) as f32 * 0.5)
        .collect();
    (a, b)
}

fn expected_sum(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

fn build_add(ctx: &AcceleratorContext) -> ElementwiseAdd {
    let program = Program::compile(ctx, "default", DEFAULT_PROGRAM).unwrap();
    ElementwiseAdd::new(ctx, &program, ADD_KERNEL).unwrap()
}

#[tokio::test]
async fn test_add_reference_scenario() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);

        let result = add
            .run(&ctx, &queue, &[1.0, 1.0, 1.0, 1.0], &[0.0, 1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(result.values, vec![1.0, 2.0, 3.0, 4.0]);
    }
}

#[tokio::test]
async fn test_add_group_boundaries() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);
        let tpg = add.state().max_total_threads_per_threadgroup() as usize;

        for len in [1, tpg - 1, tpg, tpg + 1, 3 * tpg + 17] {
            let (a, b) = operands(len, len);
            let result = add.run(&ctx, &queue, &a, &b).unwrap();
            assert_eq!(result.values, expected_sum(&a, &b), "len {}", len);
            assert_eq!(result.plan.group_count as usize, len.div_ceil(tpg));
        }
    }
}

#[tokio::test]
async fn test_add_with_smaller_groups() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);

        // Partial groups: lanes past the requested width must stay idle.
        let (a, b) = operands(1000, 5);
        for tpg in [1, 7, 32, 100] {
            let result = add.run_with_group_size(&ctx, &queue, &a, &b, tpg).unwrap();
            assert_eq!(result.values, expected_sum(&a, &b), "tpg {}", tpg);
            assert_eq!(result.plan.threads_per_group, tpg);
        }
    }
}

#[tokio::test]
async fn test_add_uses_pipeline_maximum() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);

        let (a, b) = operands(1024, 1);
        let result = add.run(&ctx, &queue, &a, &b).unwrap();
        assert_eq!(
            result.plan.threads_per_group,
            add.state().max_total_threads_per_threadgroup()
        );
        assert_eq!(
            add.state().max_total_threads_per_threadgroup(),
            ctx.max_threads_per_group()
        );
    }
}

#[tokio::test]
async fn test_constant_operands() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);

        let result = add.run(&ctx, &queue, &[5.0; 3], &[5.0; 3]).unwrap();
        assert_eq!(result.values, vec![10.0; 3]);
    }
}

#[tokio::test]
async fn test_thread_group_limits() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);
        let max = add.state().max_total_threads_per_threadgroup();

        let err = add
            .run_with_group_size(&ctx, &queue, &[1.0], &[1.0], 0)
            .unwrap_err();
        assert!(matches!(err, DispatchError::ThreadGroupSize { requested: 0, .. }));

        let err = add
            .run_with_group_size(&ctx, &queue, &[1.0], &[1.0], max + 1)
            .unwrap_err();
        assert!(matches!(err, DispatchError::ThreadGroupSize { .. }));
    }
}

#[tokio::test]
async fn test_dispatch_argument_checks() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);
        let state = add.state();

        let a = DeviceBuffer::from_slice(&ctx, "a", &[1.0; 8]);
        let b = DeviceBuffer::from_slice(&ctx, "b", &[2.0; 8]);
        let short = DeviceBuffer::new(&ctx, "short", 4);

        let err = dispatch(&queue, state, &[&a, &b], 8, 8).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ArgumentCount {
                expected: 3,
                got: 2
            }
        ));

        let err = dispatch(&queue, state, &[&a, &b, &short], 8, 8).unwrap_err();
        assert!(matches!(err, DispatchError::BufferTooSmall { binding: 2, .. }));
    }
}

#[tokio::test]
async fn test_empty_grid_records_nothing() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);

        let result = add.run(&ctx, &queue, &[], &[]).unwrap();
        assert!(result.values.is_empty());
        assert_eq!(result.plan.group_count, 0);
    }
}

#[tokio::test]
async fn test_dispatch_then_wait_then_read() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);

        let (a, b) = operands(300, 9);
        let buf_a = DeviceBuffer::from_slice(&ctx, "a", &a);
        let buf_b = DeviceBuffer::from_slice(&ctx, "b", &b);
        let out = DeviceBuffer::new(&ctx, "out", 300);

        let (submission, plan) = dispatch(&queue, add.state(), &[&buf_a, &buf_b, &out], 300, 64).unwrap();
        submission.wait_until_completed().unwrap();

        assert_eq!(plan.group_count, 5);
        assert_eq!(out.read(&queue).unwrap(), expected_sum(&a, &b));
    }
}

#[tokio::test]
async fn test_fixed_group_kernel_without_params() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let source = r#"
@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;

@compute @workgroup_size(16)
fn double(@builtin(global_invocation_id) id: vec3<u32>) {
    output[id.x] = input[id.x] * 2.0;
}
"#;
        let program = Program::compile(&ctx, "double", source).unwrap();
        let kernel = program.kernel("double").unwrap();
        let state = ComputePipelineState::build(&ctx, &kernel).unwrap();
        assert_eq!(state.max_total_threads_per_threadgroup(), 16);

        let input: Vec<f32> = (0..32).map(|i| i as f32).collect();
        let buf_in = DeviceBuffer::from_slice(&ctx, "in", &input);
        let buf_out = DeviceBuffer::new(&ctx, "out", 32);

        let err = dispatch(&queue, &state, &[&buf_in, &buf_out], 32, 8).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::FixedThreadGroup {
                requested: 8,
                fixed: 16
            }
        ));

        let (submission, _) = dispatch(&queue, &state, &[&buf_in, &buf_out], 32, 16).unwrap();
        submission.wait_until_completed().unwrap();
        let doubled: Vec<f32> = input.iter().map(|v| v * 2.0).collect();
        assert_eq!(buf_out.read(&queue).unwrap(), doubled);
    }
}

#[tokio::test]
async fn test_compile_and_lookup_failures() {
    if let Some(ctx) = create_gpu_context().await {
        assert!(matches!(
            Program::compile(&ctx, "broken", "fn main( {"),
            Err(ProgramError::Compile(_))
        ));

        let program = Program::compile(&ctx, "default", DEFAULT_PROGRAM).unwrap();
        assert!(matches!(
            program.kernel("subtract_arrays"),
            Err(ProgramError::SymbolNotFound { .. })
        ));
    }
}

#[tokio::test]
async fn test_allocations_released() {
    if let Some(ctx) = create_gpu_context().await {
        let queue = ctx.new_command_queue();
        let add = build_add(&ctx);

        let (a, b) = operands(4096, 2);
        add.run(&ctx, &queue, &a, &b).unwrap();
        assert_eq!(ctx.current_allocated_size(), 0);
    }
}
